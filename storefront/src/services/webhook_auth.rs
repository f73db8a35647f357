// storefront/src/services/webhook_auth.rs

//! Authentication of inbound provider callbacks. Failures are reported on the
//! `security` target and never reach the order store.

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::liqpay;
use std::net::IpAddr;
use tracing::warn;

/// Byte-wise comparison whose running time depends only on the lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
  if a.len() != b.len() {
    return false;
  }
  let mut diff = 0u8;
  for (x, y) in a.iter().zip(b.iter()) {
    diff |= x ^ y;
  }
  diff == 0
}

#[derive(Debug, Clone, Default)]
pub struct WebhookVerifier {
  liqpay_private_key: Option<String>,
  monobank_token: Option<String>,
  monobank_allowed_ips: Vec<IpAddr>,
}

impl WebhookVerifier {
  pub fn new(
    liqpay_private_key: Option<String>,
    monobank_token: Option<String>,
    monobank_allowed_ips: Vec<IpAddr>,
  ) -> Self {
    Self {
      liqpay_private_key,
      monobank_token,
      monobank_allowed_ips,
    }
  }

  pub fn from_config(config: &AppConfig) -> Self {
    Self::new(
      config.liqpay_private_key.clone(),
      config.monobank_webhook_token.clone(),
      config.monobank_allowed_ips.clone(),
    )
  }

  pub fn verify_liqpay(&self, data: &str, signature: &str) -> Result<(), AppError> {
    let Some(private_key) = &self.liqpay_private_key else {
      warn!(target: "security", "LiqPay callback received but no private key is configured.");
      return Err(AppError::Security("LiqPay is not configured".to_string()));
    };
    let expected = liqpay::sign(private_key, data);
    if constant_time_eq(expected.as_bytes(), signature.trim().as_bytes()) {
      Ok(())
    } else {
      warn!(target: "security", "LiqPay callback signature mismatch.");
      Err(AppError::Security("LiqPay signature mismatch".to_string()))
    }
  }

  pub fn verify_monobank(&self, token: Option<&str>, peer: Option<IpAddr>) -> Result<(), AppError> {
    let Some(expected) = &self.monobank_token else {
      warn!(target: "security", "Monobank callback received but no webhook token is configured.");
      return Err(AppError::Security("Monobank webhook token is not configured".to_string()));
    };
    let presented = token.unwrap_or_default();
    if !constant_time_eq(expected.as_bytes(), presented.as_bytes()) {
      warn!(target: "security", ?peer, "Monobank callback token mismatch.");
      return Err(AppError::Security("Monobank webhook token mismatch".to_string()));
    }
    if !self.monobank_allowed_ips.is_empty() && !peer.is_some_and(|ip| self.monobank_allowed_ips.contains(&ip)) {
      warn!(target: "security", ?peer, "Monobank callback from an address outside the allow-list.");
      return Err(AppError::Security("Monobank callback source not allowed".to_string()));
    }
    Ok(())
  }
}
