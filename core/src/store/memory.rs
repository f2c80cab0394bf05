// cartflow/src/store/memory.rs

//! In-process store used by tests and local runs.
//!
//! A unit of work takes the owned table lock for its whole lifetime, so units
//! of work are fully serialized. It mutates a private copy of the tables that
//! replaces the shared ones on commit.

use super::{Store, StoreError, StoreResult, UnitOfWork};
use crate::models::{CartItem, NewCartItem, Order, Product, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Tables {
  products: BTreeMap<Uuid, Product>,
  users: BTreeMap<Uuid, User>,
  cart_items: BTreeMap<Uuid, CartItem>,
  orders: BTreeMap<Uuid, Order>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  tables: Arc<AsyncMutex<Tables>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn begin(&self) -> StoreResult<Arc<dyn UnitOfWork>> {
    let guard = Arc::clone(&self.tables).lock_owned().await;
    let work = guard.clone();
    Ok(Arc::new(MemoryUnitOfWork {
      guard: parking_lot::Mutex::new(Some(guard)),
      work: parking_lot::Mutex::new(work),
    }))
  }
}

struct MemoryUnitOfWork {
  // `None` once committed or rolled back.
  guard: parking_lot::Mutex<Option<OwnedMutexGuard<Tables>>>,
  work: parking_lot::Mutex<Tables>,
}

impl MemoryUnitOfWork {
  fn with_tables<R>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<R>) -> StoreResult<R> {
    if self.guard.lock().is_none() {
      return Err(StoreError::Closed);
    }
    let mut work = self.work.lock();
    f(&mut work)
  }
}

impl Tables {
  fn product_name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
    self.products.values().any(|p| p.name == name && Some(p.id) != except)
  }

  fn username_taken(&self, username: &str, except: Option<Uuid>) -> bool {
    self.users.values().any(|u| u.username == username && Some(u.id) != except)
  }

  fn sorted_items(&self, filter: impl Fn(&CartItem) -> bool) -> Vec<CartItem> {
    let mut items: Vec<CartItem> = self.cart_items.values().filter(|i| filter(i)).cloned().collect();
    items.sort_by(|a, b| a.added_at.cmp(&b.added_at).then(a.id.cmp(&b.id)));
    items
  }
}

fn frozen_check(row: &CartItem) -> StoreResult<()> {
  match row.order_id {
    None => Ok(()),
    Some(order_id) => Err(StoreError::Conflict(format!(
      "cart item {} already belongs to order {order_id}",
      row.id
    ))),
  }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
  async fn product_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
    self.with_tables(|t| Ok(t.products.get(&id).cloned()))
  }

  async fn product_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
    self.with_tables(|t| Ok(t.products.values().find(|p| p.name == name).cloned()))
  }

  async fn list_products(&self) -> StoreResult<Vec<Product>> {
    self.with_tables(|t| {
      let mut products: Vec<Product> = t.products.values().cloned().collect();
      products.sort_by(|a, b| a.name.cmp(&b.name));
      Ok(products)
    })
  }

  async fn insert_product(&self, name: &str) -> StoreResult<Product> {
    self.with_tables(|t| {
      if t.product_name_taken(name, None) {
        return Err(StoreError::Conflict(format!("product '{name}' already exists")));
      }
      let now = Utc::now();
      let product = Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        created_at: now,
        updated_at: now,
      };
      t.products.insert(product.id, product.clone());
      Ok(product)
    })
  }

  async fn update_product(&self, product: &Product) -> StoreResult<Product> {
    self.with_tables(|t| {
      if t.product_name_taken(&product.name, Some(product.id)) {
        return Err(StoreError::Conflict(format!("product '{}' already exists", product.name)));
      }
      let row = t
        .products
        .get_mut(&product.id)
        .ok_or_else(|| StoreError::not_found("product", product.id))?;
      row.name = product.name.clone();
      row.updated_at = Utc::now();
      Ok(row.clone())
    })
  }

  async fn delete_product(&self, id: Uuid) -> StoreResult<()> {
    self.with_tables(|t| {
      if !t.products.contains_key(&id) {
        return Err(StoreError::not_found("product", id));
      }
      if t.cart_items.values().any(|i| i.product_id == id) {
        return Err(StoreError::Conflict(format!("product {id} is still referenced by cart items")));
      }
      t.products.remove(&id);
      Ok(())
    })
  }

  async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
    self.with_tables(|t| Ok(t.users.values().find(|u| u.username == username).cloned()))
  }

  async fn lock_user(&self, username: &str) -> StoreResult<Option<User>> {
    // The whole unit of work already holds the table lock.
    self.user_by_username(username).await
  }

  async fn list_users(&self) -> StoreResult<Vec<User>> {
    self.with_tables(|t| {
      let mut users: Vec<User> = t.users.values().cloned().collect();
      users.sort_by(|a, b| a.username.cmp(&b.username));
      Ok(users)
    })
  }

  async fn insert_user(&self, username: &str) -> StoreResult<User> {
    self.with_tables(|t| {
      if t.username_taken(username, None) {
        return Err(StoreError::Conflict(format!("user '{username}' already exists")));
      }
      let now = Utc::now();
      let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        created_at: now,
        updated_at: now,
      };
      t.users.insert(user.id, user.clone());
      Ok(user)
    })
  }

  async fn update_user(&self, user: &User) -> StoreResult<User> {
    self.with_tables(|t| {
      if t.username_taken(&user.username, Some(user.id)) {
        return Err(StoreError::Conflict(format!("user '{}' already exists", user.username)));
      }
      let row = t.users.get_mut(&user.id).ok_or_else(|| StoreError::not_found("user", user.id))?;
      row.username = user.username.clone();
      row.updated_at = Utc::now();
      Ok(row.clone())
    })
  }

  async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
    self.with_tables(|t| {
      if t.users.remove(&id).is_none() {
        return Err(StoreError::not_found("user", id));
      }
      t.cart_items.retain(|_, item| item.user_id != id);
      t.orders.retain(|_, order| order.user_id != id);
      Ok(())
    })
  }

  async fn cart_item_by_id(&self, id: Uuid) -> StoreResult<Option<CartItem>> {
    self.with_tables(|t| Ok(t.cart_items.get(&id).cloned()))
  }

  async fn lock_cart_item(&self, id: Uuid) -> StoreResult<Option<CartItem>> {
    // The unit of work already holds every table.
    self.cart_item_by_id(id).await
  }

  async fn active_cart_items(&self, user_id: Uuid) -> StoreResult<Vec<CartItem>> {
    self.with_tables(|t| Ok(t.sorted_items(|i| i.user_id == user_id && i.is_active())))
  }

  async fn insert_cart_item(&self, new_item: NewCartItem) -> StoreResult<CartItem> {
    self.with_tables(|t| {
      if !t.users.contains_key(&new_item.user_id) {
        return Err(StoreError::Conflict(format!("user {} does not exist", new_item.user_id)));
      }
      if !t.products.contains_key(&new_item.product_id) {
        return Err(StoreError::Conflict(format!("product {} does not exist", new_item.product_id)));
      }
      let now = Utc::now();
      let item = CartItem {
        id: Uuid::new_v4(),
        user_id: new_item.user_id,
        product_id: new_item.product_id,
        quantity: new_item.quantity,
        order_id: None,
        added_at: now,
        updated_at: now,
      };
      t.cart_items.insert(item.id, item.clone());
      Ok(item)
    })
  }

  async fn update_cart_item(&self, item: &CartItem) -> StoreResult<CartItem> {
    self.with_tables(|t| {
      if let Some(order_id) = item.order_id {
        if !t.orders.contains_key(&order_id) {
          return Err(StoreError::Conflict(format!("order {order_id} does not exist")));
        }
      }
      let row = t
        .cart_items
        .get_mut(&item.id)
        .ok_or_else(|| StoreError::not_found("cart item", item.id))?;
      frozen_check(row)?;
      row.quantity = item.quantity;
      row.order_id = item.order_id;
      row.updated_at = Utc::now();
      Ok(row.clone())
    })
  }

  async fn delete_cart_item(&self, id: Uuid) -> StoreResult<()> {
    self.with_tables(|t| {
      let row = t.cart_items.get(&id).ok_or_else(|| StoreError::not_found("cart item", id))?;
      frozen_check(row)?;
      t.cart_items.remove(&id);
      Ok(())
    })
  }

  async fn insert_order(&self, user_id: Uuid) -> StoreResult<Order> {
    self.with_tables(|t| {
      if !t.users.contains_key(&user_id) {
        return Err(StoreError::Conflict(format!("user {user_id} does not exist")));
      }
      let order = Order {
        id: Uuid::new_v4(),
        user_id,
        created_at: Utc::now(),
      };
      t.orders.insert(order.id, order.clone());
      Ok(order)
    })
  }

  async fn order_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
    self.with_tables(|t| Ok(t.orders.get(&id).cloned()))
  }

  async fn orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
    self.with_tables(|t| {
      let mut orders: Vec<Order> = t.orders.values().filter(|o| o.user_id == user_id).cloned().collect();
      orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
      Ok(orders)
    })
  }

  async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<CartItem>> {
    self.with_tables(|t| Ok(t.sorted_items(|i| i.order_id == Some(order_id))))
  }

  async fn commit(&self) -> StoreResult<()> {
    let mut guard = self.guard.lock().take().ok_or(StoreError::Closed)?;
    *guard = std::mem::take(&mut *self.work.lock());
    Ok(())
  }

  async fn rollback(&self) -> StoreResult<()> {
    self.guard.lock().take().map(drop).ok_or(StoreError::Closed)
  }
}
