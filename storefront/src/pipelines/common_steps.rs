// storefront/src/pipelines/common_steps.rs

//! Pieces shared by the dispatch and reconcile pipelines (and the checkout
//! conversation): product lookup with fallback and the notification texts.

use crate::models::{CustomerDetails, Order, ProviderId};
use crate::services::liqpay::format_amount;
use crate::services::messaging::escape_html;
use crate::state::AppState;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Product name for notifications; falls back to `ID: <id>` when the catalog
/// lookup fails or the product is gone.
#[instrument(name = "common_step::resolve_product_name", skip(state))]
pub async fn resolve_product_name(state: &AppState, product_id: i64) -> String {
  match state.catalog.get_product(product_id).await {
    Ok(Some(product)) => product.name,
    Ok(None) => {
      warn!("Product referenced by order no longer exists.");
      format!("ID: {}", product_id)
    }
    Err(e) => {
      warn!(error = %e, "Catalog lookup failed; using product id.");
      format!("ID: {}", product_id)
    }
  }
}

/// How operators see the buyer: their chat display name when the messaging
/// channel can resolve it, always followed by the numeric id.
pub async fn resolve_buyer_label(state: &AppState, user_id: i64) -> String {
  match state.messaging.describe_user(user_id).await {
    Some(name) => format!("{} (ID {})", name, user_id),
    None => format!("ID {}", user_id),
  }
}

pub fn format_uah(amount_minor: i64) -> String {
  format!("{} UAH", format_amount(amount_minor))
}

fn customer_block(customer: Option<&CustomerDetails>) -> String {
  match customer {
    Some(c) => format!(
      "<b>Name:</b> {}\n<b>Phone:</b> {}\n<b>City:</b> {}\n<b>Delivery point:</b> {}",
      escape_html(&c.name),
      escape_html(&c.phone),
      escape_html(&c.city),
      escape_html(&c.delivery_point)
    ),
    None => "<i>Customer details not provided.</i>".to_string(),
  }
}

fn method_line(order: &Order) -> &'static str {
  order.payment_method.map(|m| m.label()).unwrap_or("not chosen")
}

/// Sent to operators once per dispatch attempt.
pub fn dispatch_report(order: &Order, product_name: &str, buyer: &str, outcome_line: &str) -> String {
  format!(
    "🛒 <b>New order</b>\n\n<b>Product:</b> {}\n<b>Amount:</b> {}\n<b>Payment method:</b> {}\n<b>Buyer:</b> {}\n<b>Order ID:</b> {}\n<b>Status:</b> {}\n──────────\n{}",
    escape_html(product_name),
    format_uah(order.amount_minor),
    method_line(order),
    escape_html(buyer),
    order.id,
    escape_html(outcome_line),
    customer_block(order.customer.as_ref())
  )
}

pub fn paid_summary(order: &Order, product_name: &str, buyer: &str, provider: ProviderId) -> String {
  format!(
    "✅ <b>Payment received</b>\n\n<b>Product:</b> {}\n<b>Amount:</b> {}\n<b>Payment method:</b> {} ({})\n<b>Buyer:</b> {}\n<b>Order ID:</b> {}\n──────────\n{}",
    escape_html(product_name),
    format_uah(order.amount_minor),
    method_line(order),
    provider,
    escape_html(buyer),
    order.id,
    customer_block(order.customer.as_ref())
  )
}

pub fn failure_notice(
  order: &Order,
  product_name: &str,
  buyer: &str,
  provider: ProviderId,
  provider_status: &str,
) -> String {
  format!(
    "⚠️ <b>Unsuccessful payment attempt</b>\n\n<b>Product:</b> {}\n<b>Provider:</b> {}\n<b>Status:</b> {}\n<b>Buyer:</b> {}\n<b>Order ID:</b> {}",
    escape_html(product_name),
    provider,
    escape_html(provider_status),
    escape_html(buyer),
    order.id
  )
}

pub fn buyer_paid_notice(product_name: &str) -> String {
  format!(
    "✅ Payment for «{}» was successful! A manager will contact you shortly.",
    escape_html(product_name)
  )
}

/// Operator-facing report of a checkout storage failure; carries the error verbatim.
pub fn storage_failure_report(user_id: i64, order_id: Uuid, error: &str) -> String {
  format!(
    "❗ <b>Failed to save customer details</b>\n\n<b>Buyer:</b> ID {}\n<b>Order ID:</b> {}\n<b>Error:</b> {}",
    user_id,
    order_id,
    escape_html(error)
  )
}
