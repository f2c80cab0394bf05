// cartflow/src/shop/mod.rs

//! Shop operations shared by every transport.
//!
//! Single-row operations (catalog, users, lookups) open a unit of work, do
//! their work and settle it with [`settle`]. Multi-step cart and order writes
//! run as pipelines through `Pipeline::run_atomic`.

pub mod cart;
pub mod catalog;
pub mod contexts;
pub mod orders;
pub mod users;

use crate::core::control::PipelineResult;
use crate::core::context_data::ContextData;
use crate::error::{ShopError, ShopResult};
use crate::models::{CartEntry, CartItem};
use crate::pipeline::Pipeline;
use crate::store::{Store, UnitOfWork};
use contexts::{AddToCartCtxData, CreateOrderCtxData, RemoveFromCartCtxData, UpdateQuantityCtxData};
use std::sync::Arc;
use tracing::warn;

/// Behaviour switches for the shop operations.
#[derive(Debug, Clone, Default)]
pub struct ShopSettings {
  /// Lets `add_to_cart` register a product that is not in the catalog yet,
  /// as an explicit step of the same unit of work. Off by default: unknown
  /// products fail with `NotFound`.
  pub auto_register_products: bool,
}

/// Pipelines built once and shared by all calls.
pub(crate) struct Workflows {
  pub(crate) add_to_cart: Pipeline<AddToCartCtxData, ShopError>,
  pub(crate) remove_from_cart: Pipeline<RemoveFromCartCtxData, ShopError>,
  pub(crate) update_quantity: Pipeline<UpdateQuantityCtxData, ShopError>,
  pub(crate) create_order: Pipeline<CreateOrderCtxData, ShopError>,
}

impl Workflows {
  fn build() -> Self {
    Self {
      add_to_cart: cart::add_to_cart_pipeline(),
      remove_from_cart: cart::remove_from_cart_pipeline(),
      update_quantity: cart::update_quantity_pipeline(),
      create_order: orders::create_order_pipeline(),
    }
  }
}

/// Entry point for every operation. Holds the store handle explicitly; there
/// is no process-wide connection.
pub struct Shop {
  store: Arc<dyn Store>,
  settings: ShopSettings,
  workflows: Workflows,
}

impl Shop {
  pub fn new(store: Arc<dyn Store>, settings: ShopSettings) -> Self {
    tracing::info!(
      auto_register_products = settings.auto_register_products,
      "Shop workflows built."
    );
    Self {
      store,
      settings,
      workflows: Workflows::build(),
    }
  }

  pub fn settings(&self) -> &ShopSettings {
    &self.settings
  }

  pub(crate) async fn begin(&self) -> ShopResult<Arc<dyn UnitOfWork>> {
    Ok(self.store.begin().await?)
  }
}

/// Commits on success and rolls back on failure.
pub(crate) async fn settle<T>(uow: &dyn UnitOfWork, result: ShopResult<T>) -> ShopResult<T> {
  match result {
    Ok(value) => {
      uow.commit().await?;
      Ok(value)
    }
    Err(e) => {
      if let Err(rollback_err) = uow.rollback().await {
        warn!(error = %rollback_err, "Rollback failed after operation error.");
      }
      Err(e)
    }
  }
}

/// Runs `pipeline` atomically; a stopped run is reported as `Halted`.
pub(crate) async fn run_workflow<TData>(
  pipeline: &Pipeline<TData, ShopError>,
  ctx_data: ContextData<TData>,
  uow: &dyn UnitOfWork,
) -> ShopResult<()>
where
  TData: 'static + Send + Sync,
{
  match pipeline.run_atomic(ctx_data, uow).await? {
    PipelineResult::Completed => Ok(()),
    PipelineResult::Stopped => Err(ShopError::Halted(pipeline.name())),
  }
}

/// Joins cart items with their products.
pub(crate) async fn cart_entries(uow: &dyn UnitOfWork, items: Vec<CartItem>) -> ShopResult<Vec<CartEntry>> {
  let mut entries = Vec::with_capacity(items.len());
  for item in items {
    let product = uow
      .product_by_id(item.product_id)
      .await?
      .ok_or_else(|| ShopError::not_found("product", item.product_id))?;
    entries.push(CartEntry { item, product });
  }
  Ok(entries)
}

pub(crate) fn validate_name(field: &str, value: &str) -> ShopResult<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(ShopError::Validation(format!("{field} must not be empty")));
  }
  Ok(trimmed.to_string())
}

/// Usernames are stored trimmed, so every lookup trims the same way.
pub(crate) fn normalize_username(username: &str) -> ShopResult<String> {
  validate_name("username", username)
}

pub(crate) fn validate_quantity(quantity: i32) -> ShopResult<()> {
  if quantity <= 0 {
    return Err(ShopError::Validation(format!(
      "quantity must be a positive number, got {quantity}"
    )));
  }
  Ok(())
}
