// cartflow/src/core/context.rs

//! The handler type stored for each step phase.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by a handler.
pub type HandlerFuture<Err> = Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>;

/// A step handler.
///
/// It receives its own clone of the shared `ContextData<TData>`, reads what it
/// needs under a short lock, performs its I/O through the unit of work held in
/// the context, writes results back, and tells the runner whether to continue.
pub type Handler<TData, Err> = Box<dyn Fn(ContextData<TData>) -> HandlerFuture<Err> + Send + Sync>;
