// cartflow/src/error.rs

use crate::store::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Wiring mistakes in a pipeline definition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
  #[error("step '{step_name}' not found in pipeline '{pipeline}'")]
  StepNotFound { pipeline: &'static str, step_name: String },

  #[error("handler missing for non-optional step '{step_name}' in pipeline '{pipeline}'")]
  HandlerMissing { pipeline: &'static str, step_name: String },

  /// A step read context state that an earlier step should have filled in.
  #[error("step '{step_name}' ran before '{field}' was set")]
  MissingState { step_name: &'static str, field: &'static str },
}

/// Everything a shop operation can fail with. Both transports surface these
/// verbatim to the caller; nothing is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShopError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("cart of user '{username}' is empty")]
  EmptyCart { username: String },

  #[error("cart item {0} is not in the user's cart")]
  ItemNotInCart(Uuid),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("store unavailable: {0}")]
  StoreUnavailable(String),

  #[error("workflow error: {0}")]
  Workflow(#[from] FlowError),

  #[error("workflow '{0}' was halted before completing")]
  Halted(&'static str),
}

impl From<StoreError> for ShopError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::NotFound { .. } => ShopError::NotFound(err.to_string()),
      StoreError::Conflict(message) => ShopError::Conflict(message),
      StoreError::Unavailable(message) => ShopError::StoreUnavailable(message),
      StoreError::Closed => ShopError::StoreUnavailable(err.to_string()),
    }
  }
}

impl ShopError {
  pub fn not_found(entity: &str, key: impl std::fmt::Display) -> Self {
    ShopError::NotFound(format!("{entity} not found: {key}"))
  }

  /// Stable machine-readable label, used in RPC replies and logs.
  pub fn kind(&self) -> &'static str {
    match self {
      ShopError::NotFound(_) => "not_found",
      ShopError::Conflict(_) => "conflict",
      ShopError::EmptyCart { .. } => "empty_cart",
      ShopError::ItemNotInCart(_) => "item_not_in_cart",
      ShopError::Validation(_) => "validation",
      ShopError::StoreUnavailable(_) => "store_unavailable",
      ShopError::Workflow(_) => "workflow",
      ShopError::Halted(_) => "halted",
    }
  }
}

pub type ShopResult<T, E = ShopError> = std::result::Result<T, E>;
