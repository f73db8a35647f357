// storefront/src/workflow/mod.rs

//! Named-step pipelines over shared, lockable context data.
//!
//! Payment dispatch and webhook reconciliation are both written as a
//! `Pipeline<TData, AppError>`: an ordered list of named steps, each with `on`
//! and `after` handlers that read and write a `ContextData<TData>` and return a
//! `PipelineControl` telling the runner whether to keep going.

pub mod context_data;
pub mod control;
pub mod error;
pub mod pipeline;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use error::WorkflowError;
pub use pipeline::{Handler, Pipeline, SkipCondition, StepDef};
