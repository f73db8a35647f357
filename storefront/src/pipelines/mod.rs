// storefront/src/pipelines/mod.rs

//! Pipelines behind payment dispatch and webhook reconciliation.

use crate::errors::AppError;
use crate::workflow::{Pipeline, WorkflowError};

pub mod common_steps;
pub mod contexts;
pub mod dispatch_pipeline;
pub mod reconcile_pipeline;

use contexts::{DispatchCtxData, ReconcileCtxData};

pub use contexts::{DispatchOutcome, NotificationPayload};
pub use dispatch_pipeline::dispatch;
pub use reconcile_pipeline::handle_notification;

/// Every pipeline the application runs, built once at startup.
pub struct Workflows {
  pub dispatch: Pipeline<DispatchCtxData, AppError>,
  pub reconcile: Pipeline<ReconcileCtxData, AppError>,
}

pub fn build_workflows() -> Result<Workflows, WorkflowError> {
  tracing::info!("Building application pipelines...");
  let workflows = Workflows {
    dispatch: dispatch_pipeline::build_dispatch_pipeline()?,
    reconcile: reconcile_pipeline::build_reconcile_pipeline()?,
  };
  tracing::info!(
    dispatch_steps = workflows.dispatch.step_names().len(),
    reconcile_steps = workflows.reconcile.step_names().len(),
    "Application pipelines built."
  );
  Ok(workflows)
}
