// cart_service/src/db/pg_store.rs

//! Postgres implementation of the shop's store. One unit of work is one
//! database transaction; dropping it without commit rolls back.

use async_trait::async_trait;
use cartflow::models::{CartItem, NewCartItem, Order, Product, User};
use cartflow::{Store, StoreError, StoreResult, UnitOfWork};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str = "id, name, created_at, updated_at";
const USER_COLUMNS: &str = "id, username, created_at, updated_at";
const CART_ITEM_COLUMNS: &str = "id, user_id, product_id, quantity, order_id, added_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, created_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl Store for PgStore {
  async fn begin(&self) -> StoreResult<Arc<dyn UnitOfWork>> {
    let tx = self.pool.begin().await.map_err(map_sqlx)?;
    Ok(Arc::new(PgUnitOfWork {
      tx: Mutex::new(Some(tx)),
    }))
  }
}

/// Maps driver failures onto the store taxonomy. Unique and foreign-key
/// violations are conflicts; everything else means the store is unavailable.
pub(crate) fn map_sqlx(err: sqlx::Error) -> StoreError {
  match &err {
    sqlx::Error::Database(db_err) if db_err.is_unique_violation() || db_err.is_foreign_key_violation() => {
      debug!(constraint = db_err.constraint().unwrap_or("-"), "Constraint violation.");
      StoreError::Conflict(db_err.message().to_string())
    }
    _ => {
      error!(error = %err, "Database operation failed.");
      StoreError::Unavailable(err.to_string())
    }
  }
}

struct PgUnitOfWork {
  // `None` once committed or rolled back.
  tx: Mutex<Option<Transaction<'static, Postgres>>>,
}

/// Explains why a write guarded by `order_id IS NULL` touched no row.
async fn missing_or_frozen(conn: &mut PgConnection, id: Uuid) -> StoreError {
  let order_id = sqlx::query_scalar::<_, Option<Uuid>>("SELECT order_id FROM cart_items WHERE id = $1")
    .bind(id)
    .fetch_optional(conn)
    .await;
  match order_id {
    Ok(Some(Some(order_id))) => StoreError::Conflict(format!("cart item {id} already belongs to order {order_id}")),
    Ok(_) => StoreError::not_found("cart item", id),
    Err(e) => map_sqlx(e),
  }
}

fn expect_one(rows_affected: u64, entity: &'static str, key: Uuid) -> StoreResult<()> {
  if rows_affected == 0 {
    return Err(StoreError::not_found(entity, key));
  }
  Ok(())
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
  async fn product_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
      .bind(id)
      .fetch_optional(&mut **tx)
      .await
      .map_err(map_sqlx)
  }

  async fn product_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE name = $1"))
      .bind(name)
      .fetch_optional(&mut **tx)
      .await
      .map_err(map_sqlx)
  }

  async fn list_products(&self) -> StoreResult<Vec<Product>> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name ASC"))
      .fetch_all(&mut **tx)
      .await
      .map_err(map_sqlx)
  }

  async fn insert_product(&self, name: &str) -> StoreResult<Product> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!(
      "INSERT INTO products (id, name) VALUES ($1, $2) RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(&mut **tx)
    .await
    .map_err(map_sqlx)
  }

  async fn update_product(&self, product: &Product) -> StoreResult<Product> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!(
      "UPDATE products SET name = $2, updated_at = now() WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(product.id)
    .bind(&product.name)
    .fetch_optional(&mut **tx)
    .await
    .map_err(map_sqlx)?
    .ok_or_else(|| StoreError::not_found("product", product.id))
  }

  async fn delete_product(&self, id: Uuid) -> StoreResult<()> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(id)
      .execute(&mut **tx)
      .await
      .map_err(map_sqlx)?;
    expect_one(result.rows_affected(), "product", id)
  }

  async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
      .bind(username)
      .fetch_optional(&mut **tx)
      .await
      .map_err(map_sqlx)
  }

  async fn lock_user(&self, username: &str) -> StoreResult<Option<User>> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1 FOR UPDATE"))
      .bind(username)
      .fetch_optional(&mut **tx)
      .await
      .map_err(map_sqlx)
  }

  async fn list_users(&self) -> StoreResult<Vec<User>> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username ASC"))
      .fetch_all(&mut **tx)
      .await
      .map_err(map_sqlx)
  }

  async fn insert_user(&self, username: &str) -> StoreResult<User> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!(
      "INSERT INTO users (id, username) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(username)
    .fetch_one(&mut **tx)
    .await
    .map_err(map_sqlx)
  }

  async fn update_user(&self, user: &User) -> StoreResult<User> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!(
      "UPDATE users SET username = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(user.id)
    .bind(&user.username)
    .fetch_optional(&mut **tx)
    .await
    .map_err(map_sqlx)?
    .ok_or_else(|| StoreError::not_found("user", user.id))
  }

  async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
    // Cart items and orders go with the user (ON DELETE CASCADE).
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
      .bind(id)
      .execute(&mut **tx)
      .await
      .map_err(map_sqlx)?;
    expect_one(result.rows_affected(), "user", id)
  }

  async fn cart_item_by_id(&self, id: Uuid) -> StoreResult<Option<CartItem>> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!("SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE id = $1"))
      .bind(id)
      .fetch_optional(&mut **tx)
      .await
      .map_err(map_sqlx)
  }

  async fn lock_cart_item(&self, id: Uuid) -> StoreResult<Option<CartItem>> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!("SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE id = $1 FOR UPDATE"))
      .bind(id)
      .fetch_optional(&mut **tx)
      .await
      .map_err(map_sqlx)
  }

  async fn active_cart_items(&self, user_id: Uuid) -> StoreResult<Vec<CartItem>> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!(
      "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE user_id = $1 AND order_id IS NULL ORDER BY added_at, id"
    ))
    .bind(user_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(map_sqlx)
  }

  async fn insert_cart_item(&self, new_item: NewCartItem) -> StoreResult<CartItem> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!(
      "INSERT INTO cart_items (id, user_id, product_id, quantity) VALUES ($1, $2, $3, $4) RETURNING {CART_ITEM_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(new_item.user_id)
    .bind(new_item.product_id)
    .bind(new_item.quantity)
    .fetch_one(&mut **tx)
    .await
    .map_err(map_sqlx)
  }

  async fn update_cart_item(&self, item: &CartItem) -> StoreResult<CartItem> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    let updated: Option<CartItem> = sqlx::query_as(&format!(
      "UPDATE cart_items SET quantity = $2, order_id = $3, updated_at = now() \
       WHERE id = $1 AND order_id IS NULL RETURNING {CART_ITEM_COLUMNS}"
    ))
    .bind(item.id)
    .bind(item.quantity)
    .bind(item.order_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(map_sqlx)?;
    match updated {
      Some(row) => Ok(row),
      None => Err(missing_or_frozen(&mut **tx, item.id).await),
    }
  }

  async fn delete_cart_item(&self, id: Uuid) -> StoreResult<()> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND order_id IS NULL")
      .bind(id)
      .execute(&mut **tx)
      .await
      .map_err(map_sqlx)?;
    if result.rows_affected() == 0 {
      return Err(missing_or_frozen(&mut **tx, id).await);
    }
    Ok(())
  }

  async fn insert_order(&self, user_id: Uuid) -> StoreResult<Order> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!(
      "INSERT INTO orders (id, user_id) VALUES ($1, $2) RETURNING {ORDER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(map_sqlx)
  }

  async fn order_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
      .bind(id)
      .fetch_optional(&mut **tx)
      .await
      .map_err(map_sqlx)
  }

  async fn orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!(
      "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at, id"
    ))
    .bind(user_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(map_sqlx)
  }

  async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<CartItem>> {
    let mut guard = self.tx.lock().await;
    let tx = guard.as_mut().ok_or(StoreError::Closed)?;
    sqlx::query_as(&format!(
      "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE order_id = $1 ORDER BY added_at, id"
    ))
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(map_sqlx)
  }

  async fn commit(&self) -> StoreResult<()> {
    let tx = self.tx.lock().await.take().ok_or(StoreError::Closed)?;
    tx.commit().await.map_err(map_sqlx)
  }

  async fn rollback(&self) -> StoreResult<()> {
    let tx = self.tx.lock().await.take().ok_or(StoreError::Closed)?;
    tx.rollback().await.map_err(map_sqlx)
  }
}
