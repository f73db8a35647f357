// storefront/src/pipelines/dispatch_pipeline.rs

//! Submits a pending order to the provider behind the chosen payment method.
//!
//! Steps: `load_order` → `resolve_product` → `create_provider_invoice` (online
//! methods only) → `attach_invoice_reference` (only with an invoice) →
//! `notify_operators`. A provider failure is recorded in the context rather than
//! aborting the run, so operators hear about every attempt.

use crate::errors::{AppError, Result};
use crate::models::{PaymentKind, PaymentMethod, ProviderId};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{DispatchCtxData, DispatchOutcome};
use crate::services::payment_provider::{truncate_chars, InvoiceRequest};
use crate::state::AppState;
use crate::workflow::{ContextData, Pipeline, PipelineControl, SkipCondition, WorkflowError};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

pub const PIPELINE_NAME: &str = "dispatch";

pub fn build_dispatch_pipeline() -> std::result::Result<Pipeline<DispatchCtxData, AppError>, WorkflowError> {
  let offline: SkipCondition<DispatchCtxData> = Arc::new(|ctx: ContextData<DispatchCtxData>| !ctx.read().method.is_online());
  let no_invoice: SkipCondition<DispatchCtxData> = Arc::new(|ctx: ContextData<DispatchCtxData>| ctx.read().invoice.is_none());

  let mut p = Pipeline::<DispatchCtxData, AppError>::new(
    PIPELINE_NAME,
    &[
      ("load_order", false, None),
      ("resolve_product", false, None),
      ("create_provider_invoice", false, Some(offline)),
      ("attach_invoice_reference", false, Some(no_invoice)),
      ("notify_operators", false, None),
    ],
  );

  p.on_root("load_order", load_order)?;
  p.on_root("resolve_product", resolve_product)?;
  p.on_root("create_provider_invoice", create_provider_invoice)?;
  p.on_root("attach_invoice_reference", attach_invoice_reference)?;
  p.on_root("notify_operators", notify_operators)?;

  Ok(p)
}

fn missing(field: &'static str) -> AppError {
  AppError::Workflow(WorkflowError::MissingContext {
    pipeline: PIPELINE_NAME,
    field,
  })
}

async fn load_order(ctx: ContextData<DispatchCtxData>) -> Result<PipelineControl> {
  let (state, order_id) = {
    let guard = ctx.read();
    (guard.app_state.clone(), guard.order_id)
  };
  let order = state
    .orders
    .get_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
  ctx.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

async fn resolve_product(ctx: ContextData<DispatchCtxData>) -> Result<PipelineControl> {
  let (state, product_id) = {
    let guard = ctx.read();
    let order = guard.order.as_ref().ok_or_else(|| missing("order"))?;
    (guard.app_state.clone(), order.product_id)
  };
  let name = common_steps::resolve_product_name(&state, product_id).await;
  ctx.write().product_name = Some(name);
  Ok(PipelineControl::Continue)
}

fn invoice_description(kind: PaymentKind, product_name: &str) -> String {
  match kind {
    PaymentKind::Single => format!("Payment for: {}", product_name),
    PaymentKind::Installments => format!("Purchase in parts: {}", product_name),
  }
}

async fn create_provider_invoice(ctx: ContextData<DispatchCtxData>) -> Result<PipelineControl> {
  let (state, method, order_id, amount_minor, product_name) = {
    let guard = ctx.read();
    let order = guard.order.as_ref().ok_or_else(|| missing("order"))?;
    let product_name = guard.product_name.clone().ok_or_else(|| missing("product_name"))?;
    (guard.app_state.clone(), guard.method, order.id, order.amount_minor, product_name)
  };
  let Some((provider_id, kind)) = method.online_route() else {
    return Ok(PipelineControl::Continue);
  };

  let result = match state.providers.get(provider_id) {
    Ok(provider) => {
      let request = InvoiceRequest {
        order_id,
        amount_minor,
        description: truncate_chars(
          &invoice_description(kind, &product_name),
          provider.description_limit(),
        ),
        kind,
      };
      provider.create_invoice(&request).await
    }
    Err(e) => Err(e),
  };

  match result {
    Ok(invoice) => {
      info!(provider = %provider_id, invoice_id = %invoice.invoice_id, "Invoice created.");
      ctx.write().invoice = Some(invoice);
    }
    Err(e) => {
      error!(provider = %provider_id, error = %e, "Invoice creation failed; order stays pending.");
      ctx.write().provider_error = Some(e);
    }
  }
  Ok(PipelineControl::Continue)
}

async fn attach_invoice_reference(ctx: ContextData<DispatchCtxData>) -> Result<PipelineControl> {
  let (state, order_id, invoice_id) = {
    let guard = ctx.read();
    let invoice = guard.invoice.as_ref().ok_or_else(|| missing("invoice"))?;
    (guard.app_state.clone(), guard.order_id, invoice.invoice_id.clone())
  };
  if let Err(e) = state.orders.attach_invoice(order_id, &invoice_id).await {
    // The link is still usable: the webhook reconciles by order id.
    error!(error = %e, %invoice_id, "Failed to store invoice reference.");
  }
  Ok(PipelineControl::Continue)
}

fn outcome_line(ctx: &DispatchCtxData, provider: Option<ProviderId>) -> String {
  match (&ctx.invoice, &ctx.provider_error, provider) {
    (Some(invoice), _, Some(p)) => format!("payment link issued via {} (invoice {})", p, invoice.invoice_id),
    (_, Some(e), _) => format!("payment creation FAILED: {}", e),
    _ => "offline payment, awaiting manager confirmation".to_string(),
  }
}

async fn notify_operators(ctx: ContextData<DispatchCtxData>) -> Result<PipelineControl> {
  let (state, user_id) = {
    let guard = ctx.read();
    let order = guard.order.as_ref().ok_or_else(|| missing("order"))?;
    (guard.app_state.clone(), order.user_id)
  };
  let buyer = common_steps::resolve_buyer_label(&state, user_id).await;
  let text = {
    let guard = ctx.read();
    let order = guard.order.as_ref().ok_or_else(|| missing("order"))?;
    let product_name = guard.product_name.as_deref().unwrap_or_default();
    let provider = guard.method.online_route().map(|(p, _)| p);
    common_steps::dispatch_report(order, product_name, &buyer, &outcome_line(&guard, provider))
  };
  if !state.notifier.notify_operators(text) {
    warn!("Operator dispatch report was not queued.");
  }
  Ok(PipelineControl::Continue)
}

/// Runs the dispatch pipeline for a pending order.
#[instrument(name = "dispatch", skip(state), fields(provider))]
pub async fn dispatch(state: &AppState, order_id: Uuid, method: PaymentMethod) -> Result<DispatchOutcome> {
  if let Some((provider, _)) = method.online_route() {
    tracing::Span::current().record("provider", provider.as_str());
  }
  let ctx = ContextData::new(DispatchCtxData::new(state.clone(), order_id, method));
  state.workflows.dispatch.run(ctx.clone()).await?;

  let mut guard = ctx.write();
  if let Some(e) = guard.provider_error.take() {
    return Err(AppError::Provider(e));
  }
  match guard.invoice.take() {
    Some(invoice) => Ok(DispatchOutcome::PaymentUrl {
      url: invoice.url,
      invoice_id: invoice.invoice_id,
    }),
    None if method.is_online() => Err(AppError::Internal("online dispatch finished without an invoice".to_string())),
    None => Ok(DispatchOutcome::Offline),
  }
}
