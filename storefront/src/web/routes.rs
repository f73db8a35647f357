// storefront/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{chat_handlers, webhook_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .service(
      web::scope("/api/v1")
        .route("/health", web::get().to(health_check_handler))
        .route("/chat/{user_id}", web::post().to(chat_handlers::chat_turn_handler)),
    )
    // Provider callback URLs are registered with the providers, so they stay unversioned.
    .service(
      web::scope("/webhook")
        .route("/liqpay", web::post().to(webhook_handlers::liqpay_webhook_handler))
        .route("/monobank", web::post().to(webhook_handlers::monobank_webhook_handler)),
    );
}
