// cartflow/src/pipeline/execution.rs

//! `Pipeline::run()` and its transactional wrapper `Pipeline::run_atomic()`.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use crate::store::{StoreError, UnitOfWork};
use tracing::{event, instrument, span, Instrument, Level};

#[derive(Debug, Clone, Copy)]
enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  fn as_str(self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes the steps in order against `ctx_data`.
  ///
  /// The first handler error aborts the run and is returned as is. A
  /// non-optional step with no handlers at all yields `FlowError::HandlerMissing`.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(pipeline = self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_cond_fn) = &step_def.skip_if {
        let skip = {
          let guard = ctx_data.read();
          skip_cond_fn(&guard)
        };
        if skip {
          event!(Level::DEBUG, step_name, "Step skipped by its skip condition.");
          continue;
        }
      }

      let has_handlers = [&self.before, &self.on, &self.after]
        .iter()
        .any(|phase| phase.get(step_name).is_some_and(|v| !v.is_empty()));

      if !has_handlers {
        if step_def.optional {
          event!(Level::DEBUG, step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, step_name, "Non-optional step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          pipeline: self.name,
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = span!(
        Level::INFO,
        "pipeline_step",
        step_name,
        step_index = step_idx,
        optional = step_def.optional
      );

      for phase in [Phase::Before, Phase::On, Phase::After] {
        let control = self
          .run_phase(phase, step_name, &ctx_data)
          .instrument(step_span.clone())
          .await?;
        if control == PipelineControl::Stop {
          event!(Level::INFO, step_name, phase = phase.as_str(), "Pipeline stopped by a handler.");
          return Ok(PipelineResult::Stopped);
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_phase(
    &self,
    phase: Phase,
    step_name: &str,
    ctx_data: &ContextData<TData>,
  ) -> Result<PipelineControl, Err> {
    let handlers = match phase {
      Phase::Before => self.before.get(step_name),
      Phase::On => self.on.get(step_name),
      Phase::After => self.after.get(step_name),
    };
    let Some(handlers) = handlers else {
      return Ok(PipelineControl::Continue);
    };

    for (handler_idx, handler_fn) in handlers.iter().enumerate() {
      let handler_span = span!(Level::DEBUG, "handler", phase = phase.as_str(), handler_index = handler_idx);
      match handler_fn(ctx_data.clone()).instrument(handler_span).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => return Ok(PipelineControl::Stop),
        Err(e) => {
          event!(Level::WARN, error = %e, phase = phase.as_str(), "Handler failed.");
          return Err(e);
        }
      }
    }
    Ok(PipelineControl::Continue)
  }

  /// Runs the pipeline and settles `uow` from the outcome: commit on
  /// `Completed`, roll back on `Stopped` or on any error.
  ///
  /// Handlers never commit on their own; this is the single place where a
  /// multi-step write becomes durable.
  pub async fn run_atomic(&self, ctx_data: ContextData<TData>, uow: &dyn UnitOfWork) -> Result<PipelineResult, Err>
  where
    Err: From<StoreError>,
  {
    match self.run(ctx_data).await {
      Ok(PipelineResult::Completed) => {
        uow.commit().await?;
        event!(Level::DEBUG, pipeline = self.name, "Unit of work committed.");
        Ok(PipelineResult::Completed)
      }
      Ok(PipelineResult::Stopped) => {
        uow.rollback().await?;
        event!(Level::INFO, pipeline = self.name, "Pipeline stopped, unit of work rolled back.");
        Ok(PipelineResult::Stopped)
      }
      Err(e) => {
        if let Err(rollback_err) = uow.rollback().await {
          event!(Level::ERROR, pipeline = self.name, error = %rollback_err, "Rollback failed after handler error.");
        }
        Err(e)
      }
    }
  }
}
