// storefront/src/services/mod.rs

pub mod liqpay;
pub mod messaging;
pub mod monobank;
pub mod notifier;
pub mod payment_provider;
pub mod webhook_auth;
