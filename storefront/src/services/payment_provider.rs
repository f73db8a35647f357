// storefront/src/services/payment_provider.rs

//! Provider-agnostic invoice creation. Each aggregator is a peer implementation
//! of [`PaymentProvider`], looked up by [`ProviderId`] at dispatch time.

use crate::config::AppConfig;
use crate::errors::ProviderError;
use crate::models::{PaymentKind, ProviderId};
use crate::services::liqpay::LiqPayClient;
use crate::services::monobank::MonobankClient;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct InvoiceRequest {
  pub order_id: Uuid,
  pub amount_minor: i64,
  pub description: String,
  pub kind: PaymentKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
  /// Hosted payment page the buyer is sent to.
  pub url: String,
  /// Provider-side reference stored on the order.
  pub invoice_id: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
  fn id(&self) -> ProviderId;

  /// Maximum description length in characters.
  fn description_limit(&self) -> usize;

  async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, ProviderError>;
}

/// Truncates on a char boundary.
pub fn truncate_chars(text: &str, limit: usize) -> String {
  text.chars().take(limit).collect()
}

#[derive(Clone, Default)]
pub struct PaymentProviders {
  providers: HashMap<ProviderId, Arc<dyn PaymentProvider>>,
}

impl PaymentProviders {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers every provider whose credentials are present in `config`.
  pub fn from_config(config: &AppConfig, http: reqwest::Client) -> Self {
    let mut providers = Self::new();
    if let Some(token) = &config.monobank_api_token {
      providers.register(Arc::new(MonobankClient::new(
        http,
        config.monobank_api_base.clone(),
        token.clone(),
        config.monobank_webhook_url(),
        config.buyer_return_url(),
      )));
    }
    if let (Some(public_key), Some(private_key)) = (&config.liqpay_public_key, &config.liqpay_private_key) {
      providers.register(Arc::new(LiqPayClient::new(
        public_key.clone(),
        private_key.clone(),
        config.liqpay_webhook_url(),
        config.buyer_return_url(),
      )));
    }
    info!(providers = ?providers.providers.keys().collect::<Vec<_>>(), "Payment providers configured.");
    providers
  }

  pub fn register(&mut self, provider: Arc<dyn PaymentProvider>) {
    self.providers.insert(provider.id(), provider);
  }

  pub fn get(&self, id: ProviderId) -> Result<Arc<dyn PaymentProvider>, ProviderError> {
    self
      .providers
      .get(&id)
      .cloned()
      .ok_or(ProviderError::NotConfigured(id.as_str()))
  }
}
