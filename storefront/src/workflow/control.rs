// storefront/src/workflow/control.rs

/// Signal returned by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  /// Run the remaining handlers of this step and the following steps.
  Continue,
  /// Halt the pipeline; nothing after this handler runs.
  Stop,
}

/// Outcome of a pipeline run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  Completed,
  Stopped,
}
