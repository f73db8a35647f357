// storefront/src/lib.rs

//! Chat storefront backend: checkout conversation, payment dispatch and
//! provider webhook reconciliation.

pub mod checkout;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod web;
pub mod workflow;

pub use errors::{AppError, ProviderError, Result};
pub use state::AppState;
