// src/lib.rs

//! Cartflow: catalog, cart and order operations for a small shop.
//!
//! Multi-step writes (adding to a cart, removing from it, changing a quantity,
//! assembling an order) are pipelines of named steps with before/on/after
//! handlers, run against one unit of work that commits only when the whole
//! pipeline completes. The same [`Shop`] serves the HTTP handlers and the
//! queue [`rpc::Dispatcher`].

pub mod core;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod rpc;
pub mod shop;
pub mod store;

// --- Re-exports for the Public API ---

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};
pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, ShopError, ShopResult};
pub use crate::shop::{Shop, ShopSettings};
pub use crate::store::{MemoryStore, Store, StoreError, StoreResult, UnitOfWork};
