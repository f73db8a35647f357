// storefront/src/checkout/replies.rs

//! Everything the buyer sees. Texts never carry internal error details.

use crate::models::{PaymentMethod, Product};
use crate::services::messaging::escape_html;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentOption {
  pub code: &'static str,
  pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
  Text {
    text: String,
  },
  PaymentOptions {
    order_id: Uuid,
    text: String,
    options: Vec<PaymentOption>,
  },
  PaymentLink {
    text: String,
    url: String,
  },
  MainMenu {
    text: String,
  },
}

impl Reply {
  pub fn text(text: impl Into<String>) -> Self {
    Reply::Text { text: text.into() }
  }

  pub fn body(&self) -> &str {
    match self {
      Reply::Text { text }
      | Reply::PaymentOptions { text, .. }
      | Reply::PaymentLink { text, .. }
      | Reply::MainMenu { text } => text,
    }
  }
}

fn all_options() -> Vec<PaymentOption> {
  PaymentMethod::ALL
    .iter()
    .map(|m| PaymentOption {
      code: m.code(),
      label: m.label(),
    })
    .collect()
}

pub fn payment_options(order_id: Uuid, product: &Product) -> Reply {
  Reply::PaymentOptions {
    order_id,
    text: format!(
      "<b>{}</b>\nPrice: {}\n\nChoose a payment method:",
      escape_html(&product.name),
      escape_html(&product.display_price)
    ),
    options: all_options(),
  }
}

pub fn repeat_payment_options(order_id: Uuid) -> Reply {
  Reply::PaymentOptions {
    order_id,
    text: "Please choose a payment method using the buttons below.".to_string(),
    options: all_options(),
  }
}

pub fn price_on_request(product: &Product) -> Reply {
  Reply::text(format!(
    "The price of «{}» is available on request. Please contact the manager to order it.",
    escape_html(&product.name)
  ))
}

pub fn ask_phone(method: PaymentMethod) -> Reply {
  Reply::text(format!(
    "You chose: {}.\nPlease send your phone number in the format +380XXXXXXXXX or 0XXXXXXXXX.",
    method.label()
  ))
}

pub fn invalid_phone() -> Reply {
  Reply::text("That does not look like a valid phone number. Use the format +380XXXXXXXXX or 0XXXXXXXXX.")
}

pub fn ask_name() -> Reply {
  Reply::text("Please enter the recipient's full name.")
}

pub fn ask_city() -> Reply {
  Reply::text("Which city should we deliver to?")
}

pub fn ask_delivery_point() -> Reply {
  Reply::text("Please enter the Nova Poshta branch number or address.")
}

pub fn empty_answer() -> Reply {
  Reply::text("The answer cannot be empty, please try again.")
}

pub fn payment_link(url: String) -> Reply {
  Reply::PaymentLink {
    text: "Your order is ready. Follow the link to pay:".to_string(),
    url,
  }
}

pub fn offline_order_received() -> Reply {
  Reply::text("Thank you! Your order has been received. A manager will contact you shortly to confirm it.")
}

pub fn payment_not_created() -> Reply {
  Reply::text("Unfortunately the payment could not be created. Please try again a little later or choose another payment method.")
}

pub fn try_again() -> Reply {
  Reply::text("Something went wrong. Please try again.")
}

pub fn no_active_checkout() -> Reply {
  Reply::text("Choose a product from the catalog to place an order.")
}

pub fn not_available() -> Reply {
  Reply::text("This is no longer available. Please try again from the catalog.")
}

pub fn main_menu() -> Reply {
  Reply::MainMenu {
    text: "Main menu".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn serializes_with_kind_tag() {
    let json = serde_json::to_value(payment_link("https://pay.example/abc".into())).unwrap();
    assert_eq!(json["kind"], "payment_link");
    assert_eq!(json["url"], "https://pay.example/abc");

    let json = serde_json::to_value(repeat_payment_options(Uuid::nil())).unwrap();
    assert_eq!(json["kind"], "payment_options");
    assert_eq!(json["options"].as_array().map(Vec::len), Some(6));
    assert_eq!(json["options"][0]["code"], "monocard");
  }

  #[test]
  fn product_names_are_escaped() {
    let product = Product {
      id: 1,
      name: "<Kettle>".into(),
      description: None,
      display_price: "On request".into(),
      price_minor: None,
      media_ref: None,
    };
    assert!(price_on_request(&product).body().contains("&lt;Kettle&gt;"));
  }
}
