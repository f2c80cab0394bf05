// cartflow/src/models/user.rs

use super::cart_item::CartEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
  pub id: Uuid,
  pub username: String, // unique
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A user together with the active (not yet ordered) contents of its cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
  #[serde(flatten)]
  pub user: User,
  pub cart: Vec<CartEntry>,
}
