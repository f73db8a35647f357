// storefront/src/models/payment_method.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment aggregators the storefront can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
  Monobank,
  LiqPay,
}

impl ProviderId {
  pub fn as_str(self) -> &'static str {
    match self {
      ProviderId::Monobank => "monobank",
      ProviderId::LiqPay => "liqpay",
    }
  }
}

impl fmt::Display for ProviderId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Single payment vs. "purchase in parts".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
  Single,
  Installments,
}

/// What the buyer picked on the payment keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
  #[serde(rename = "monocard")]
  MonoCard,
  #[serde(rename = "monoparts")]
  MonoParts,
  #[serde(rename = "liqpay")]
  LiqPay,
  #[serde(rename = "cod")]
  CashOnDelivery,
  #[serde(rename = "cash")]
  Cash,
  #[serde(rename = "cashless")]
  Cashless,
}

impl PaymentMethod {
  pub const ALL: [PaymentMethod; 6] = [
    PaymentMethod::MonoCard,
    PaymentMethod::MonoParts,
    PaymentMethod::LiqPay,
    PaymentMethod::CashOnDelivery,
    PaymentMethod::Cash,
    PaymentMethod::Cashless,
  ];

  pub fn code(self) -> &'static str {
    match self {
      PaymentMethod::MonoCard => "monocard",
      PaymentMethod::MonoParts => "monoparts",
      PaymentMethod::LiqPay => "liqpay",
      PaymentMethod::CashOnDelivery => "cod",
      PaymentMethod::Cash => "cash",
      PaymentMethod::Cashless => "cashless",
    }
  }

  pub fn from_code(code: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|m| m.code() == code)
  }

  pub fn label(self) -> &'static str {
    match self {
      PaymentMethod::MonoCard => "Card payment (monobank)",
      PaymentMethod::MonoParts => "Purchase in parts (monobank)",
      PaymentMethod::LiqPay => "Card payment (LiqPay)",
      PaymentMethod::CashOnDelivery => "Cash on delivery (Nova Poshta)",
      PaymentMethod::Cash => "Cash at pickup",
      PaymentMethod::Cashless => "Bank transfer",
    }
  }

  /// Provider and payment kind for online methods; `None` for offline ones.
  pub fn online_route(self) -> Option<(ProviderId, PaymentKind)> {
    match self {
      PaymentMethod::MonoCard => Some((ProviderId::Monobank, PaymentKind::Single)),
      PaymentMethod::MonoParts => Some((ProviderId::Monobank, PaymentKind::Installments)),
      PaymentMethod::LiqPay => Some((ProviderId::LiqPay, PaymentKind::Single)),
      PaymentMethod::CashOnDelivery | PaymentMethod::Cash | PaymentMethod::Cashless => None,
    }
  }

  pub fn is_online(self) -> bool {
    self.online_route().is_some()
  }
}

impl fmt::Display for PaymentMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}
