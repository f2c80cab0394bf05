// cartflow/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
  pub id: Uuid,
  pub name: String, // unique
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
