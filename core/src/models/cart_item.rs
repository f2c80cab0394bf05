// cartflow/src/models/cart_item.rs

use super::product::Product;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A quantity of one product for one user.
///
/// While `order_id` is `None` the item sits in the user's active cart. Order
/// assembly sets it, after which the item is frozen history of that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CartItem {
  pub id: Uuid,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub order_id: Option<Uuid>,
  pub added_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl CartItem {
  pub fn is_active(&self) -> bool {
    self.order_id.is_none()
  }
}

/// Insert payload; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
}

/// A cart item joined with its product, as shown in a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
  #[serde(flatten)]
  pub item: CartItem,
  pub product: Product,
}
