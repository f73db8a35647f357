// storefront/src/models/order.rs

use crate::models::payment_method::PaymentMethod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order lifecycle. Stored as lowercase text in the `orders.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Processing,
  Paid,
  Failed,
  Canceled,
}

impl OrderStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Processing => "processing",
      OrderStatus::Paid => "paid",
      OrderStatus::Failed => "failed",
      OrderStatus::Canceled => "canceled",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "pending" => Some(OrderStatus::Pending),
      "processing" => Some(OrderStatus::Processing),
      "paid" => Some(OrderStatus::Paid),
      "failed" => Some(OrderStatus::Failed),
      "canceled" => Some(OrderStatus::Canceled),
      _ => None,
    }
  }

  /// Statuses an order may be in for a move to `self` to be applied.
  ///
  /// `paid` never appears here, so a paid order is never touched again. A later
  /// provider success still rescues an order already marked failed or canceled.
  pub fn allowed_predecessors(self) -> &'static [OrderStatus] {
    match self {
      OrderStatus::Pending => &[],
      OrderStatus::Processing => &[OrderStatus::Pending],
      OrderStatus::Paid => &[
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Failed,
        OrderStatus::Canceled,
      ],
      OrderStatus::Failed | OrderStatus::Canceled => &[OrderStatus::Pending, OrderStatus::Processing],
    }
  }

  pub fn can_transition_from(self, current: OrderStatus) -> bool {
    self.allowed_predecessors().contains(&current)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Contact bundle collected by the checkout conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
  pub name: String,
  pub phone: String,
  pub city: String,
  pub delivery_point: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
  pub id: Uuid,
  pub user_id: i64,
  pub product_id: i64,
  /// Kopiykas. Fixed at creation.
  pub amount_minor: i64,
  pub payment_method: Option<PaymentMethod>,
  pub invoice_id: Option<String>,
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
  pub customer: Option<CustomerDetails>,
}
