// storefront/src/services/liqpay.rs

//! LiqPay checkout links. Nothing is sent to LiqPay up front: the link itself
//! carries the signed payment parameters.

use crate::errors::ProviderError;
use crate::models::{PaymentKind, ProviderId};
use crate::services::payment_provider::{Invoice, InvoiceRequest, PaymentProvider};
use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use reqwest::Url;
use ring::digest;
use serde::Serialize;
use tracing::{info, instrument};

const CHECKOUT_URL: &str = "https://www.liqpay.ua/api/3/checkout";
const DESCRIPTION_LIMIT: usize = 255;

/// `base64(sha1(private_key + data + private_key))`, used both for outgoing
/// links and for verifying callbacks.
pub fn sign(private_key: &str, data: &str) -> String {
  let mut ctx = digest::Context::new(&digest::SHA1_FOR_LEGACY_USE_ONLY);
  ctx.update(private_key.as_bytes());
  ctx.update(data.as_bytes());
  ctx.update(private_key.as_bytes());
  STANDARD.encode(ctx.finish().as_ref())
}

/// Formats kopiykas as a decimal hryvnia amount, e.g. `150000` -> `"1500.00"`.
pub fn format_amount(amount_minor: i64) -> String {
  format!("{}.{:02}", amount_minor / 100, amount_minor % 100)
}

#[derive(Debug, Serialize)]
struct CheckoutParams<'a> {
  action: &'static str,
  amount: String,
  currency: &'static str,
  description: &'a str,
  order_id: String,
  version: &'static str,
  public_key: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  result_url: Option<&'a str>,
  server_url: &'a str,
}

pub struct LiqPayClient {
  public_key: String,
  private_key: String,
  server_url: String,
  result_url: Option<String>,
}

impl LiqPayClient {
  pub fn new(public_key: String, private_key: String, server_url: String, result_url: Option<String>) -> Self {
    Self {
      public_key,
      private_key,
      server_url,
      result_url,
    }
  }

  /// Returns the `(data, signature)` pair for a checkout link.
  fn encode_params(&self, request: &InvoiceRequest) -> Result<(String, String), ProviderError> {
    let params = CheckoutParams {
      action: "pay",
      amount: format_amount(request.amount_minor),
      currency: "UAH",
      description: &request.description,
      order_id: request.order_id.to_string(),
      version: "3",
      public_key: &self.public_key,
      result_url: self.result_url.as_deref(),
      server_url: &self.server_url,
    };
    let json = serde_json::to_vec(&params).map_err(|e| ProviderError::InvalidRequest(e.to_string()))?;
    let data = STANDARD.encode(json);
    let signature = sign(&self.private_key, &data);
    Ok((data, signature))
  }
}

#[async_trait]
impl PaymentProvider for LiqPayClient {
  fn id(&self) -> ProviderId {
    ProviderId::LiqPay
  }

  fn description_limit(&self) -> usize {
    DESCRIPTION_LIMIT
  }

  #[instrument(name = "liqpay::create_invoice", skip(self, request), fields(order_id = %request.order_id))]
  async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, ProviderError> {
    if request.kind == PaymentKind::Installments {
      return Err(ProviderError::Unsupported("LiqPay installments".to_string()));
    }
    let (data, signature) = self.encode_params(request)?;
    let url = Url::parse_with_params(CHECKOUT_URL, &[("data", &data), ("signature", &signature)])
      .map_err(|e| ProviderError::InvalidRequest(format!("checkout URL: {}", e)))?;
    info!("LiqPay checkout link generated.");
    Ok(Invoice {
      url: url.into(),
      invoice_id: request.order_id.to_string(),
    })
  }
}

/// Decodes a callback `data` blob. Some proxies relay it in the URL-safe alphabet.
pub fn decode_data(data: &str) -> Option<Vec<u8>> {
  STANDARD.decode(data).or_else(|_| URL_SAFE.decode(data)).ok()
}
