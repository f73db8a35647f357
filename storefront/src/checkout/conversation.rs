// storefront/src/checkout/conversation.rs

use crate::checkout::replies::{self, Reply};
use crate::checkout::session::{CheckoutSession, CheckoutStep};
use crate::checkout::validation::{is_valid_phone, non_blank};
use crate::errors::{AppError, Result};
use crate::models::{CustomerDetails, OrderStatus, PaymentMethod};
use crate::pipelines::common_steps::storage_failure_report;
use crate::pipelines::{dispatch, DispatchOutcome};
use crate::state::AppState;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// One buyer action as relayed by the chat gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuyerInput {
  /// "Buy" button under a product.
  Buy { product_id: i64 },
  /// Payment method button under the options message.
  ChoosePayment { order_id: Uuid, method: PaymentMethod },
  /// Free text typed by the buyer.
  Text { text: String },
  /// Top-level command such as `/start` or a main menu button.
  Command { name: String },
}

/// Handles one buyer turn. Errors are turned into neutral replies here, so the
/// buyer never sees internal detail.
pub async fn handle_turn(state: &AppState, user_id: i64, input: BuyerInput) -> Vec<Reply> {
  match process_turn(state, user_id, input).await {
    Ok(replies) => replies,
    Err(AppError::NotFound(what)) => {
      info!(user_id, %what, "Buyer referenced something that is not available.");
      vec![replies::not_available(), replies::main_menu()]
    }
    Err(e) => {
      error!(user_id, error = %e, "Checkout turn failed.");
      vec![replies::try_again()]
    }
  }
}

#[instrument(name = "checkout::turn", skip(state, input))]
pub async fn process_turn(state: &AppState, user_id: i64, input: BuyerInput) -> Result<Vec<Reply>> {
  // One turn per buyer at a time: a session is read, advanced and written back
  // (or consumed by dispatch) without another turn interleaving.
  let _turn = state.sessions.begin_turn(user_id).await;
  match input {
    BuyerInput::Buy { product_id } => start_checkout(state, user_id, product_id).await,
    BuyerInput::ChoosePayment { order_id, method } => choose_payment(state, user_id, order_id, method).await,
    BuyerInput::Text { text } => handle_text(state, user_id, &text).await,
    BuyerInput::Command { name } => {
      if let Some(abandoned) = state.sessions.remove(user_id) {
        info!(order_id = %abandoned.order_id, step = abandoned.step.label(), command = %name, "Checkout abandoned.");
      }
      Ok(vec![replies::main_menu()])
    }
  }
}

async fn start_checkout(state: &AppState, user_id: i64, product_id: i64) -> Result<Vec<Reply>> {
  let product = state
    .catalog
    .get_product(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;

  let Some(price) = product.price_minor.filter(|p| *p > 0) else {
    return Ok(vec![replies::price_on_request(&product)]);
  };

  let order_id = state.orders.create_order(user_id, product.id, price).await?;
  if let Some(previous) = state
    .sessions
    .put(user_id, CheckoutSession::new(order_id, CheckoutStep::AwaitPaymentMethod))
  {
    info!(previous_order_id = %previous.order_id, "Previous checkout discarded.");
  }
  info!(%order_id, product_id, amount_minor = price, "Order created, awaiting payment method.");
  Ok(vec![replies::payment_options(order_id, &product)])
}

async fn choose_payment(state: &AppState, user_id: i64, order_id: Uuid, method: PaymentMethod) -> Result<Vec<Reply>> {
  // Also covers buttons pressed after a restart or eviction: the order itself is the authority.
  let order = state.orders.get_order(order_id).await?;
  let usable = order
    .as_ref()
    .is_some_and(|o| o.user_id == user_id && o.status == OrderStatus::Pending);
  if !usable {
    warn!(%order_id, "Payment choice for an order that is missing, foreign or no longer pending.");
    return Err(AppError::NotFound(format!("Order {} is not available for payment", order_id)));
  }

  state.orders.set_payment_method(order_id, method).await?;
  let replaced = state
    .sessions
    .put(user_id, CheckoutSession::new(order_id, CheckoutStep::AwaitPhone { method }));
  if let Some(previous) = replaced.filter(|s| s.order_id != order_id) {
    info!(previous_order_id = %previous.order_id, "Previous checkout discarded.");
  }
  info!(%order_id, method = %method, "Payment method chosen.");
  Ok(vec![replies::ask_phone(method)])
}

async fn handle_text(state: &AppState, user_id: i64, text: &str) -> Result<Vec<Reply>> {
  let Some(mut session) = state.sessions.get(user_id) else {
    return Ok(vec![replies::no_active_checkout()]);
  };
  let order_id = session.order_id;

  let (next, reply) = match session.step.clone() {
    CheckoutStep::AwaitPaymentMethod => (CheckoutStep::AwaitPaymentMethod, replies::repeat_payment_options(order_id)),
    CheckoutStep::AwaitPhone { method } => {
      let phone = text.trim();
      if is_valid_phone(phone) {
        (
          CheckoutStep::AwaitName {
            method,
            phone: phone.to_string(),
          },
          replies::ask_name(),
        )
      } else {
        (CheckoutStep::AwaitPhone { method }, replies::invalid_phone())
      }
    }
    CheckoutStep::AwaitName { method, phone } => match non_blank(text) {
      Some(name) => (CheckoutStep::AwaitCity { method, phone, name }, replies::ask_city()),
      None => (CheckoutStep::AwaitName { method, phone }, replies::empty_answer()),
    },
    CheckoutStep::AwaitCity { method, phone, name } => match non_blank(text) {
      Some(city) => (
        CheckoutStep::AwaitDeliveryPoint {
          method,
          phone,
          name,
          city,
        },
        replies::ask_delivery_point(),
      ),
      None => (CheckoutStep::AwaitCity { method, phone, name }, replies::empty_answer()),
    },
    CheckoutStep::AwaitDeliveryPoint {
      method,
      phone,
      name,
      city,
    } => {
      let Some(delivery_point) = non_blank(text) else {
        state.sessions.put(user_id, session);
        return Ok(vec![replies::empty_answer()]);
      };
      let details = CustomerDetails {
        name,
        phone,
        city,
        delivery_point,
      };
      return complete_checkout(state, user_id, session, method, details).await;
    }
  };

  session.step = next;
  state.sessions.put(user_id, session);
  Ok(vec![reply])
}

async fn complete_checkout(
  state: &AppState,
  user_id: i64,
  session: CheckoutSession,
  method: PaymentMethod,
  details: CustomerDetails,
) -> Result<Vec<Reply>> {
  let order_id = session.order_id;

  if let Err(e) = state.orders.set_customer_details(order_id, &details).await {
    error!(%order_id, error = %e, "Failed to store customer details.");
    state
      .notifier
      .notify_operators(storage_failure_report(user_id, order_id, &e.to_string()));
    // Stay at the delivery point step so the buyer can resend it.
    state.sessions.put(user_id, session);
    return Ok(vec![replies::try_again()]);
  }

  state.sessions.remove(user_id);
  info!(%order_id, method = %method, "Customer details stored, dispatching.");

  let outcome_reply = match dispatch(state, order_id, method).await {
    Ok(DispatchOutcome::PaymentUrl { url, .. }) => replies::payment_link(url),
    Ok(DispatchOutcome::Offline) => replies::offline_order_received(),
    Err(AppError::Provider(e)) => {
      warn!(%order_id, error = %e, "Payment could not be created.");
      replies::payment_not_created()
    }
    Err(e) => {
      error!(%order_id, error = %e, "Dispatch failed.");
      replies::try_again()
    }
  };
  Ok(vec![outcome_reply, replies::main_menu()])
}
