// storefront/src/models/mod.rs

//! Data structures shared by the store, the checkout conversation and the pipelines.

pub mod order;
pub mod payment_method;
pub mod product;

pub use order::{CustomerDetails, Order, OrderStatus};
pub use payment_method::{PaymentKind, PaymentMethod, ProviderId};
pub use product::Product;
