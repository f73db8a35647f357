// storefront/src/checkout/mod.rs

//! Buyer-facing checkout conversation: turns a product selection into a fully
//! specified pending order and hands it to payment dispatch.

pub mod conversation;
pub mod replies;
pub mod session;
pub mod validation;

pub use conversation::{handle_turn, process_turn, BuyerInput};
pub use replies::{PaymentOption, Reply};
pub use session::{spawn_session_janitor, CheckoutSession, CheckoutStep, SessionRegistry};
