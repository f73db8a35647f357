// storefront/src/workflow/pipeline.rs

//! `Pipeline<TData, Err>`: definition, handler registration and execution.

use crate::workflow::context_data::ContextData;
use crate::workflow::control::{PipelineControl, PipelineResult};
use crate::workflow::error::WorkflowError;
use futures_util::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{event, info_span, Instrument, Level};

/// Evaluated before a step runs; `true` skips the step.
pub type SkipCondition<TData> = Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

/// A boxed async step handler operating on a clone of the pipeline context.
pub type Handler<TData, Err> =
  Box<dyn Fn(ContextData<TData>) -> BoxFuture<'static, Result<PipelineControl, Err>> + Send + Sync>;

pub struct StepDef<TData: 'static + Send + Sync> {
  pub name: String,
  pub optional: bool,
  pub skip_if: Option<SkipCondition<TData>>,
}

impl<TData: 'static + Send + Sync> std::fmt::Debug for StepDef<TData> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}

#[derive(Clone, Copy)]
enum Phase {
  On,
  After,
}

impl Phase {
  fn label(self) -> &'static str {
    match self {
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<WorkflowError> + Send + Sync + 'static,
{
  name: &'static str,
  steps: Vec<StepDef<TData>>,
  on: HashMap<String, Vec<Handler<TData, Err>>>,
  after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<WorkflowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(step_name, optional, skip_if)` triples, run in order.
  pub fn new(name: &'static str, step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(step_name, optional, skip_if)| StepDef {
        name: (*step_name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      name,
      steps,
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  fn ensure_step_exists(&self, step_name: &str) -> Result<(), WorkflowError> {
    if self.steps.iter().any(|s| s.name == step_name) {
      Ok(())
    } else {
      Err(WorkflowError::StepNotFound {
        pipeline: self.name,
        step_name: step_name.to_string(),
      })
    }
  }

  fn box_handler<F, UserErr>(
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> Handler<TData, Err>
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    Box::new(move |ctx_data| {
      let user_fut = handler_fn(ctx_data);
      async move { user_fut.await.map_err(Into::into) }.boxed()
    })
  }

  /// Registers the main handler of a step.
  pub fn on_root<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> Result<(), WorkflowError>
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name)?;
    self
      .on
      .entry(step_name.to_string())
      .or_default()
      .push(Self::box_handler(handler_fn));
    Ok(())
  }

  /// Registers a handler that runs after every `on` handler of the step returned `Continue`.
  pub fn after_root<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> Result<(), WorkflowError>
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name)?;
    self
      .after
      .entry(step_name.to_string())
      .or_default()
      .push(Self::box_handler(handler_fn));
    Ok(())
  }

  async fn run_phase(
    &self,
    phase: Phase,
    step_name: &str,
    ctx_data: &ContextData<TData>,
  ) -> Result<PipelineControl, Err> {
    let handlers = match phase {
      Phase::On => self.on.get(step_name),
      Phase::After => self.after.get(step_name),
    };
    let Some(handlers) = handlers else {
      return Ok(PipelineControl::Continue);
    };

    for (handler_index, handler_fn) in handlers.iter().enumerate() {
      let span = info_span!("handler", phase = phase.label(), handler_index);
      match handler_fn(ctx_data.clone()).instrument(span).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => {
          event!(Level::INFO, step = step_name, phase = phase.label(), "Pipeline stopped by handler.");
          return Ok(PipelineControl::Stop);
        }
        Err(e) => {
          event!(Level::ERROR, step = step_name, phase = phase.label(), error = %e, "Handler failed.");
          return Err(e);
        }
      }
    }
    Ok(PipelineControl::Continue)
  }

  async fn run_step(&self, step: &StepDef<TData>, ctx_data: &ContextData<TData>) -> Result<PipelineControl, Err> {
    if let Some(skip_if) = &step.skip_if {
      if skip_if(ctx_data.clone()) {
        event!(Level::DEBUG, "Step skipped by its skip condition.");
        return Ok(PipelineControl::Continue);
      }
    }

    let has_handlers = self.on.get(&step.name).is_some_and(|v| !v.is_empty())
      || self.after.get(&step.name).is_some_and(|v| !v.is_empty());
    if !has_handlers {
      if step.optional {
        event!(Level::DEBUG, "Optional step has no handlers, skipping.");
        return Ok(PipelineControl::Continue);
      }
      return Err(Err::from(WorkflowError::HandlerMissing {
        pipeline: self.name,
        step_name: step.name.clone(),
      }));
    }

    if self.run_phase(Phase::On, &step.name, ctx_data).await? == PipelineControl::Stop {
      return Ok(PipelineControl::Stop);
    }
    self.run_phase(Phase::After, &step.name, ctx_data).await
  }

  /// Runs every step in order against `ctx_data`.
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, pipeline = self.name, num_steps = self.steps.len(), "Pipeline execution starting.");

    for (step_index, step) in self.steps.iter().enumerate() {
      let span = info_span!(
        "pipeline_step",
        pipeline = self.name,
        step_name = step.name.as_str(),
        step_index,
        optional = step.optional
      );
      if self.run_step(step, &ctx_data).instrument(span).await? == PipelineControl::Stop {
        return Ok(PipelineResult::Stopped);
      }
    }

    event!(Level::DEBUG, pipeline = self.name, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }
}
