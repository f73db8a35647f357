// storefront/src/workflow/error.rs

use thiserror::Error;

/// Errors raised by the pipeline machinery itself, as opposed to its handlers.
#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("Step not found in pipeline '{pipeline}': {step_name}")]
  StepNotFound { pipeline: &'static str, step_name: String },

  #[error("Handler missing for non-optional step '{step_name}' in pipeline '{pipeline}'")]
  HandlerMissing { pipeline: &'static str, step_name: String },

  #[error("Context for pipeline '{pipeline}' is missing '{field}'")]
  MissingContext { pipeline: &'static str, field: &'static str },
}
