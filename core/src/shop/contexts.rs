// cartflow/src/shop/contexts.rs

//! Context data for the cart and order pipelines.
//! Handlers receive these wrapped in `ContextData`; each carries the unit of
//! work the whole run shares.

use crate::error::{FlowError, ShopError};
use crate::models::{CartEntry, CartItem, OrderDetails, Product, User};
use crate::store::UnitOfWork;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub uow: Arc<dyn UnitOfWork>,
  pub username: String,
  pub product_name: String,
  pub quantity: i32,
  pub register_missing_product: bool,
  pub user: Option<User>,
  pub product: Option<Product>,
  pub cart_item: Option<CartItem>,
}

#[derive(Clone)]
pub struct RemoveFromCartCtxData {
  pub uow: Arc<dyn UnitOfWork>,
  pub username: String,
  pub cart_item_id: Uuid,
  pub user: Option<User>,
  pub removed_item: Option<CartItem>,
  pub remaining_cart: Vec<CartEntry>,
}

#[derive(Clone)]
pub struct UpdateQuantityCtxData {
  pub uow: Arc<dyn UnitOfWork>,
  pub cart_item_id: Uuid,
  pub quantity: i32,
  /// When set, the item must belong to this user.
  pub owner: Option<String>,
  pub owner_id: Option<Uuid>,
  pub cart_item: Option<CartItem>,
}

#[derive(Clone)]
pub struct CreateOrderCtxData {
  pub uow: Arc<dyn UnitOfWork>,
  pub username: String,
  pub requested_item_ids: Vec<Uuid>,
  pub user: Option<User>,
  pub active_cart: Vec<CartItem>,
  pub selected_items: Vec<CartItem>,
  pub order: Option<OrderDetails>,
}

/// Unwraps a value an earlier step stored in the context.
pub(crate) fn required<T: Clone>(value: &Option<T>, step_name: &'static str, field: &'static str) -> Result<T, ShopError> {
  value
    .clone()
    .ok_or(ShopError::Workflow(FlowError::MissingState { step_name, field }))
}
