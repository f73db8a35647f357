// storefront/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::pipelines::{handle_notification, NotificationPayload};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LiqPayForm {
  pub data: String,
  pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct MonobankQuery {
  pub token: Option<String>,
}

#[instrument(name = "handler::liqpay_webhook", skip_all)]
pub async fn liqpay_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  form: web::Form<LiqPayForm>,
) -> Result<HttpResponse, AppError> {
  let LiqPayForm { data, signature } = form.into_inner();
  info!(payload_len = data.len(), "LiqPay callback received.");
  let peer = req.peer_addr().map(|addr| addr.ip());
  handle_notification(app_state.get_ref(), NotificationPayload::LiqPay { data, signature }, peer).await?;
  Ok(HttpResponse::Ok().body("OK"))
}

#[instrument(name = "handler::monobank_webhook", skip_all)]
pub async fn monobank_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  query: web::Query<MonobankQuery>,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  info!(payload_len = body.len(), "Monobank callback received.");
  let peer = req.peer_addr().map(|addr| addr.ip());
  let payload = NotificationPayload::Monobank {
    token: query.into_inner().token,
    body: body.to_vec(),
  };
  handle_notification(app_state.get_ref(), payload, peer).await?;
  Ok(HttpResponse::Ok().body("OK"))
}
