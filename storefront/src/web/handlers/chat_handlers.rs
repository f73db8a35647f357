// storefront/src/web/handlers/chat_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::checkout::{handle_turn, BuyerInput};
use crate::errors::AppError;
use crate::state::AppState;

/// One buyer turn relayed by the chat gateway. Always answers 200 with the
/// replies to show; failures are already folded into neutral replies.
#[instrument(name = "handler::chat_turn", skip(app_state, input), fields(user_id = %path.as_ref()))]
pub async fn chat_turn_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
  input: web::Json<BuyerInput>,
) -> Result<HttpResponse, AppError> {
  let user_id = path.into_inner();
  let replies = handle_turn(app_state.get_ref(), user_id, input.into_inner()).await;
  info!(replies = replies.len(), "Chat turn handled.");
  Ok(HttpResponse::Ok().json(json!({ "replies": replies })))
}
