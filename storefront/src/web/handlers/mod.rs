// storefront/src/web/handlers/mod.rs

pub mod chat_handlers;
pub mod webhook_handlers;
