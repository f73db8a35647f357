// storefront/src/pipelines/reconcile_pipeline.rs

//! Applies provider callbacks to orders.
//!
//! Steps: `authenticate_notification` → `extract_notification_fields` →
//! `classify_provider_status` → `apply_status_transition`. Only authentication
//! failures reach the HTTP layer as errors; everything after it is acknowledged.

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus, ProviderId};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{NotificationFields, NotificationPayload, ProviderStatus, ReconcileCtxData};
use crate::services::liqpay;
use crate::state::AppState;
use crate::workflow::{ContextData, Pipeline, PipelineControl, WorkflowError};
use serde::Deserialize;
use std::net::IpAddr;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

pub const PIPELINE_NAME: &str = "reconcile";

pub fn build_reconcile_pipeline() -> std::result::Result<Pipeline<ReconcileCtxData, AppError>, WorkflowError> {
  let mut p = Pipeline::<ReconcileCtxData, AppError>::new(
    PIPELINE_NAME,
    &[
      ("authenticate_notification", false, None),
      ("extract_notification_fields", false, None),
      ("classify_provider_status", false, None),
      ("apply_status_transition", false, None),
    ],
  );

  p.on_root("authenticate_notification", authenticate_notification)?;
  p.on_root("extract_notification_fields", extract_notification_fields)?;
  p.on_root("classify_provider_status", classify_provider_status)?;
  p.on_root("apply_status_transition", apply_status_transition)?;
  p.after_root("apply_status_transition", acknowledge)?;

  Ok(p)
}

fn missing(field: &'static str) -> AppError {
  AppError::Workflow(WorkflowError::MissingContext {
    pipeline: PIPELINE_NAME,
    field,
  })
}

async fn authenticate_notification(ctx: ContextData<ReconcileCtxData>) -> Result<PipelineControl> {
  let guard = ctx.read();
  let verifier = &guard.app_state.verifier;
  match &guard.payload {
    NotificationPayload::LiqPay { data, signature } => verifier.verify_liqpay(data, signature)?,
    NotificationPayload::Monobank { token, .. } => verifier.verify_monobank(token.as_deref(), guard.peer)?,
  }
  debug!(provider = %guard.payload.provider(), "Callback authenticated.");
  Ok(PipelineControl::Continue)
}

#[derive(Debug, Deserialize)]
struct LiqPayCallback {
  order_id: Option<String>,
  status: Option<String>,
  payment_id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonobankCallback {
  reference: Option<String>,
  status: Option<String>,
  invoice_id: Option<String>,
}

/// Pulls `(order id, status, provider reference)` out of an authenticated payload.
pub fn parse_fields(payload: &NotificationPayload) -> std::result::Result<NotificationFields, String> {
  let (order_ref, status, payment_ref) = match payload {
    NotificationPayload::LiqPay { data, .. } => {
      let raw = liqpay::decode_data(data).ok_or("data is not base64")?;
      let cb: LiqPayCallback = serde_json::from_slice(&raw).map_err(|e| format!("data is not JSON: {}", e))?;
      let payment_ref = cb.payment_id.map(|v| match v {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
      });
      (cb.order_id, cb.status, payment_ref)
    }
    NotificationPayload::Monobank { body, .. } => {
      let cb: MonobankCallback = serde_json::from_slice(body).map_err(|e| format!("body is not JSON: {}", e))?;
      (cb.reference, cb.status, cb.invoice_id)
    }
  };

  let order_ref = order_ref.filter(|s| !s.is_empty()).ok_or("missing order reference")?;
  let status = status.filter(|s| !s.is_empty()).ok_or("missing status")?;
  let order_id = Uuid::parse_str(order_ref.trim()).map_err(|_| format!("order reference '{}' is not a UUID", order_ref))?;

  Ok(NotificationFields {
    order_id,
    status: status.trim().to_lowercase(),
    payment_ref,
  })
}

async fn extract_notification_fields(ctx: ContextData<ReconcileCtxData>) -> Result<PipelineControl> {
  let parsed = {
    let guard = ctx.read();
    parse_fields(&guard.payload)
  };
  match parsed {
    Ok(fields) => {
      info!(order_id = %fields.order_id, status = %fields.status, payment_ref = ?fields.payment_ref, "Callback fields extracted.");
      ctx.write().fields = Some(fields);
      Ok(PipelineControl::Continue)
    }
    Err(reason) => {
      error!(%reason, "Malformed payment callback ignored.");
      ctx.write().acknowledged = true;
      Ok(PipelineControl::Stop)
    }
  }
}

/// Maps a lowercased provider status onto the order lifecycle.
pub fn classify(provider: ProviderId, status: &str) -> ProviderStatus {
  match status {
    "success" => ProviderStatus::Succeeded,
    "sandbox" if provider == ProviderId::LiqPay => ProviderStatus::Succeeded,
    "failure" | "error" => ProviderStatus::Failed {
      target: OrderStatus::Failed,
    },
    "expired" | "reversed" | "canceled" => ProviderStatus::Failed {
      target: OrderStatus::Canceled,
    },
    "created" | "processing" | "hold" | "prepared" | "invoice_wait" | "3ds_verify" | "cash_wait" | "otp_verify"
    | "sender_verify" | "receiver_verify" => ProviderStatus::InProgress,
    s if provider == ProviderId::LiqPay && s.starts_with("wait_") => ProviderStatus::InProgress,
    _ => ProviderStatus::Unrecognized,
  }
}

async fn classify_provider_status(ctx: ContextData<ReconcileCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  let provider = guard.payload.provider();
  let status = guard.fields.as_ref().ok_or_else(|| missing("fields"))?.status.clone();
  let class = classify(provider, &status);
  if class == ProviderStatus::Unrecognized {
    warn!(%provider, %status, "Unrecognized provider status; no state change.");
  }
  guard.classification = Some(class);
  Ok(PipelineControl::Continue)
}

async fn apply_status_transition(ctx: ContextData<ReconcileCtxData>) -> Result<PipelineControl> {
  let (state, provider, fields, class) = {
    let guard = ctx.read();
    (
      guard.app_state.clone(),
      guard.payload.provider(),
      guard.fields.clone().ok_or_else(|| missing("fields"))?,
      guard.classification.clone().ok_or_else(|| missing("classification"))?,
    )
  };
  let order_id = fields.order_id;

  let changed = match &class {
    ProviderStatus::Succeeded => match state.orders.transition_status(order_id, OrderStatus::Paid).await? {
      Some(order) => {
        notify_paid(&state, &order, provider).await;
        true
      }
      None => {
        info!(%order_id, "Success callback changed nothing (duplicate, already paid or unknown order).");
        false
      }
    },
    ProviderStatus::Failed { target } => match state.orders.transition_status(order_id, *target).await? {
      Some(order) => {
        notify_failed(&state, &order, provider, &fields.status).await;
        true
      }
      None => {
        info!(%order_id, target = %target, "Failure callback changed nothing.");
        false
      }
    },
    ProviderStatus::InProgress => {
      let changed = state
        .orders
        .transition_status(order_id, OrderStatus::Processing)
        .await?
        .is_some();
      debug!(%order_id, changed, "Intermediate status recorded.");
      changed
    }
    ProviderStatus::Unrecognized => false,
  };

  ctx.write().transitioned = changed;
  Ok(PipelineControl::Continue)
}

// Both notices are built from the row the transition returned; the lookups
// below fall back instead of failing.
async fn notify_paid(state: &AppState, order: &Order, provider: ProviderId) {
  let product_name = common_steps::resolve_product_name(state, order.product_id).await;
  let buyer = common_steps::resolve_buyer_label(state, order.user_id).await;

  info!(order_id = %order.id, %provider, "Order paid.");
  state
    .notifier
    .notify_buyer(order.user_id, common_steps::buyer_paid_notice(&product_name));
  state
    .notifier
    .notify_operators(common_steps::paid_summary(order, &product_name, &buyer, provider));
}

async fn notify_failed(state: &AppState, order: &Order, provider: ProviderId, provider_status: &str) {
  let product_name = common_steps::resolve_product_name(state, order.product_id).await;
  let buyer = common_steps::resolve_buyer_label(state, order.user_id).await;

  warn!(order_id = %order.id, %provider, %provider_status, "Payment attempt failed.");
  state.notifier.notify_operators(common_steps::failure_notice(
    order,
    &product_name,
    &buyer,
    provider,
    provider_status,
  ));
}

async fn acknowledge(ctx: ContextData<ReconcileCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  guard.acknowledged = true;
  debug!(transitioned = guard.transitioned, "Callback processed.");
  Ok(PipelineControl::Continue)
}

/// Runs the reconcile pipeline for one callback. Returns `Err` only for
/// authentication failures; anything later is logged and acknowledged.
#[instrument(name = "reconcile", skip(state, payload), fields(provider = %payload.provider()))]
pub async fn handle_notification(state: &AppState, payload: NotificationPayload, peer: Option<IpAddr>) -> Result<()> {
  let ctx = ContextData::new(ReconcileCtxData::new(state.clone(), payload, peer));
  match state.workflows.reconcile.run(ctx).await {
    Ok(_) => Ok(()),
    Err(e @ AppError::Security(_)) => Err(e),
    Err(e) => {
      error!(error = %e, "Callback processing failed after authentication; acknowledging anyway.");
      Ok(())
    }
  }
}
