// storefront/src/web/mod.rs

pub mod handlers;
pub mod root_span;
pub mod routes;

pub use root_span::RedactedRootSpan;
pub use routes::configure_app_routes;
