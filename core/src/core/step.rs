// cartflow/src/core/step.rs

//! A single named step of a pipeline.

use std::sync::Arc;

/// Predicate evaluated against the current context data before a step runs.
/// When it returns `true` the step is skipped.
pub type SkipCondition<TData> = Arc<dyn Fn(&TData) -> bool + Send + Sync + 'static>;

/// Name, optionality and skip condition of one step.
///
/// A non-optional step without handlers is a wiring mistake and fails the run
/// with `FlowError::HandlerMissing`. An optional step without handlers is
/// silently passed over.
#[derive(Clone)]
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
