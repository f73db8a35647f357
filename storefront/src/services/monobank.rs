// storefront/src/services/monobank.rs

//! Monobank acquiring: `POST /api/merchant/invoice/create`.

use crate::errors::ProviderError;
use crate::models::{PaymentKind, ProviderId};
use crate::services::payment_provider::{Invoice, InvoiceRequest, PaymentProvider};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument};

/// ISO 4217 numeric code for UAH.
const CCY_UAH: u16 = 980;
/// Basket line names longer than this are rejected by the API.
const BASKET_NAME_LIMIT: usize = 127;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInvoiceResponse {
  page_url: Option<String>,
  invoice_id: Option<String>,
  err_text: Option<String>,
}

pub struct MonobankClient {
  http: reqwest::Client,
  api_base: String,
  token: String,
  webhook_url: Option<String>,
  redirect_url: Option<String>,
}

impl MonobankClient {
  pub fn new(
    http: reqwest::Client,
    api_base: String,
    token: String,
    webhook_url: Option<String>,
    redirect_url: Option<String>,
  ) -> Self {
    Self {
      http,
      api_base,
      token: token.trim().to_string(),
      webhook_url,
      redirect_url,
    }
  }

  fn payment_type(kind: PaymentKind) -> &'static str {
    match kind {
      PaymentKind::Single => "debit",
      PaymentKind::Installments => "ib",
    }
  }

  fn invoice_body(&self, request: &InvoiceRequest) -> Value {
    let reference = request.order_id.to_string();
    let mut merchant_info = json!({
      "reference": reference,
      "destination": request.description,
      "basketOrder": [{
        "name": request.description.chars().take(BASKET_NAME_LIMIT).collect::<String>(),
        "qty": 1,
        "sum": request.amount_minor,
        "code": reference,
      }],
    });
    if request.kind == PaymentKind::Installments {
      merchant_info["paymentDetails"] = Value::String(request.description.clone());
    }

    let mut body = json!({
      "amount": request.amount_minor,
      "ccy": CCY_UAH,
      "merchantPaymInfo": merchant_info,
      "paymentType": Self::payment_type(request.kind),
    });
    if let Some(url) = &self.redirect_url {
      body["redirectUrl"] = Value::String(url.clone());
    }
    if let Some(url) = &self.webhook_url {
      body["webHookUrl"] = Value::String(url.clone());
    }
    body
  }
}

#[async_trait]
impl PaymentProvider for MonobankClient {
  fn id(&self) -> ProviderId {
    ProviderId::Monobank
  }

  fn description_limit(&self) -> usize {
    BASKET_NAME_LIMIT
  }

  #[instrument(name = "monobank::create_invoice", skip(self, request), fields(order_id = %request.order_id, kind = ?request.kind))]
  async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, ProviderError> {
    let response = self
      .http
      .post(format!("{}/api/merchant/invoice/create", self.api_base))
      .header("X-Token", &self.token)
      .json(&self.invoice_body(request))
      .send()
      .await?;

    let status = response.status();
    let raw = response.text().await?;
    let parsed: Option<CreateInvoiceResponse> = serde_json::from_str(&raw).ok();

    if !status.is_success() {
      let message = parsed.and_then(|r| r.err_text).unwrap_or(raw);
      error!(http_status = status.as_u16(), %message, "Monobank rejected invoice creation.");
      return Err(ProviderError::Rejected {
        status: status.as_u16(),
        message,
      });
    }

    let parsed = parsed.ok_or_else(|| ProviderError::MalformedResponse(format!("not JSON: {}", raw)))?;
    match (parsed.page_url, parsed.invoice_id) {
      (Some(url), Some(invoice_id)) => {
        info!(%invoice_id, "Monobank invoice created.");
        Ok(Invoice { url, invoice_id })
      }
      (_, _) => Err(ProviderError::MalformedResponse(
        parsed
          .err_text
          .unwrap_or_else(|| "response lacks pageUrl/invoiceId".to_string()),
      )),
    }
  }
}
