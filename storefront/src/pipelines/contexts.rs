// storefront/src/pipelines/contexts.rs

//! Data carried through each pipeline run, wrapped in `ContextData`.

use crate::errors::ProviderError;
use crate::models::{Order, OrderStatus, PaymentMethod, ProviderId};
use crate::services::payment_provider::Invoice;
use crate::state::AppState;
use std::net::IpAddr;
use uuid::Uuid;

// --- Payment dispatch ---

pub struct DispatchCtxData {
  pub app_state: AppState,
  pub order_id: Uuid,
  pub method: PaymentMethod,
  pub order: Option<Order>,
  pub product_name: Option<String>,
  pub invoice: Option<Invoice>,
  pub provider_error: Option<ProviderError>,
}

impl DispatchCtxData {
  pub fn new(app_state: AppState, order_id: Uuid, method: PaymentMethod) -> Self {
    Self {
      app_state,
      order_id,
      method,
      order: None,
      product_name: None,
      invoice: None,
      provider_error: None,
    }
  }
}

/// What the buyer is told after dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
  PaymentUrl { url: String, invoice_id: String },
  Offline,
}

// --- Webhook reconciliation ---

/// Raw callback as received over HTTP, before authentication.
#[derive(Debug, Clone)]
pub enum NotificationPayload {
  LiqPay { data: String, signature: String },
  Monobank { token: Option<String>, body: Vec<u8> },
}

impl NotificationPayload {
  pub fn provider(&self) -> ProviderId {
    match self {
      NotificationPayload::LiqPay { .. } => ProviderId::LiqPay,
      NotificationPayload::Monobank { .. } => ProviderId::Monobank,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationFields {
  pub order_id: Uuid,
  /// Provider status, lowercased.
  pub status: String,
  pub payment_ref: Option<String>,
}

/// How a provider status maps onto the order lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
  Succeeded,
  Failed { target: OrderStatus },
  InProgress,
  Unrecognized,
}

pub struct ReconcileCtxData {
  pub app_state: AppState,
  pub payload: NotificationPayload,
  pub peer: Option<IpAddr>,
  pub fields: Option<NotificationFields>,
  pub classification: Option<ProviderStatus>,
  pub transitioned: bool,
  pub acknowledged: bool,
}

impl ReconcileCtxData {
  pub fn new(app_state: AppState, payload: NotificationPayload, peer: Option<IpAddr>) -> Self {
    Self {
      app_state,
      payload,
      peer,
      fields: None,
      classification: None,
      transitioned: false,
      acknowledged: false,
    }
  }
}
