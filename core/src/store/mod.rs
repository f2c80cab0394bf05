// cartflow/src/store/mod.rs

//! Persistence port.
//!
//! Every operation opens a [`UnitOfWork`] through [`Store::begin`], performs
//! its reads and writes through it, and settles it with `commit` or
//! `rollback`. Dropping an unsettled unit of work discards its writes.

pub mod memory;

use crate::models::{CartItem, NewCartItem, Order, Product, User};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
  #[error("{entity} not found: {key}")]
  NotFound { entity: &'static str, key: String },

  /// A unique or referential constraint would be violated.
  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  Unavailable(String),

  #[error("unit of work is already committed or rolled back")]
  Closed,
}

impl StoreError {
  pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
    StoreError::NotFound {
      entity,
      key: key.to_string(),
    }
  }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
  async fn begin(&self) -> StoreResult<Arc<dyn UnitOfWork>>;
}

/// One transaction against the store. Methods take `&self` so the handle can
/// be shared by the steps of a pipeline through an `Arc`.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
  async fn product_by_id(&self, id: Uuid) -> StoreResult<Option<Product>>;
  async fn product_by_name(&self, name: &str) -> StoreResult<Option<Product>>;
  async fn list_products(&self) -> StoreResult<Vec<Product>>;
  async fn insert_product(&self, name: &str) -> StoreResult<Product>;
  /// Replaces the mutable fields (`name`) and refreshes `updated_at`.
  async fn update_product(&self, product: &Product) -> StoreResult<Product>;
  async fn delete_product(&self, id: Uuid) -> StoreResult<()>;

  async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
  /// Like `user_by_username`, but concurrent units of work locking the same
  /// user wait until this one is settled. Cart and order writes start here.
  async fn lock_user(&self, username: &str) -> StoreResult<Option<User>>;
  async fn list_users(&self) -> StoreResult<Vec<User>>;
  async fn insert_user(&self, username: &str) -> StoreResult<User>;
  /// Replaces the mutable fields (`username`) and refreshes `updated_at`.
  async fn update_user(&self, user: &User) -> StoreResult<User>;
  /// Also removes the user's cart items and orders.
  async fn delete_user(&self, id: Uuid) -> StoreResult<()>;

  async fn cart_item_by_id(&self, id: Uuid) -> StoreResult<Option<CartItem>>;
  /// Like `cart_item_by_id`, but holds the row until this unit of work is
  /// settled, so the returned copy stays current.
  async fn lock_cart_item(&self, id: Uuid) -> StoreResult<Option<CartItem>>;
  /// Items of the user not yet assigned to an order, oldest first.
  async fn active_cart_items(&self, user_id: Uuid) -> StoreResult<Vec<CartItem>>;
  async fn insert_cart_item(&self, new_item: NewCartItem) -> StoreResult<CartItem>;
  /// Replaces `quantity` and `order_id` and refreshes `updated_at`. Only
  /// active rows are writable: a row already assigned to an order fails with
  /// `Conflict`, whatever the caller's copy says.
  async fn update_cart_item(&self, item: &CartItem) -> StoreResult<CartItem>;
  /// Deletes an active row; an ordered row fails with `Conflict`.
  async fn delete_cart_item(&self, id: Uuid) -> StoreResult<()>;

  async fn insert_order(&self, user_id: Uuid) -> StoreResult<Order>;
  async fn order_by_id(&self, id: Uuid) -> StoreResult<Option<Order>>;
  async fn orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>>;
  async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<CartItem>>;

  async fn commit(&self) -> StoreResult<()>;
  async fn rollback(&self) -> StoreResult<()>;
}
