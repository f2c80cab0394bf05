// cartflow/src/shop/orders.rs

//! Order assembly: turns a selection of the user's active cart items into an
//! order, all or nothing.

use super::contexts::{required, CreateOrderCtxData};
use super::users::find_user;
use super::{normalize_username, run_workflow, settle, Shop};
use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::error::{ShopError, ShopResult};
use crate::models::{Order, OrderDetails};
use crate::pipeline::Pipeline;
use crate::store::UnitOfWork;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

impl Shop {
  /// Creates an order from the given items of the user's active cart.
  ///
  /// Fails with `EmptyCart` when the cart has no items, with `Validation`
  /// when `cart_item_ids` is empty and with `ItemNotInCart` when any id is not
  /// in the active cart. In every failure case nothing is written.
  #[instrument(name = "shop::create_order", skip(self, cart_item_ids), fields(num_items = cart_item_ids.len()), err(Display))]
  pub async fn create_order(&self, username: &str, cart_item_ids: &[Uuid]) -> ShopResult<OrderDetails> {
    let username = normalize_username(username)?;
    let uow = self.begin().await?;
    let ctx_data = ContextData::new(CreateOrderCtxData {
      uow: Arc::clone(&uow),
      username,
      requested_item_ids: cart_item_ids.to_vec(),
      user: None,
      active_cart: Vec::new(),
      selected_items: Vec::new(),
      order: None,
    });

    run_workflow(&self.workflows.create_order, ctx_data.clone(), uow.as_ref()).await?;
    let details = required(&ctx_data.read().order, "shop::create_order", "order")?;
    info!(order_id = %details.order.id, items = details.items.len(), "Order created.");
    Ok(details)
  }

  #[instrument(name = "shop::get_order", skip(self), err(Display))]
  pub async fn get_order(&self, order_id: Uuid) -> ShopResult<OrderDetails> {
    let uow = self.begin().await?;
    let result: ShopResult<OrderDetails> = async {
      let order = uow
        .order_by_id(order_id)
        .await?
        .ok_or_else(|| ShopError::not_found("order", order_id))?;
      order_details(uow.as_ref(), order).await
    }
    .await;
    settle(uow.as_ref(), result).await
  }

  /// All orders of the user, oldest first.
  #[instrument(name = "shop::list_orders", skip(self), err(Display))]
  pub async fn list_orders(&self, username: &str) -> ShopResult<Vec<OrderDetails>> {
    let username = normalize_username(username)?;
    let uow = self.begin().await?;
    let result: ShopResult<Vec<OrderDetails>> = async {
      let user = find_user(uow.as_ref(), &username).await?;
      let mut orders = Vec::new();
      for order in uow.orders_for_user(user.id).await? {
        orders.push(order_details(uow.as_ref(), order).await?);
      }
      Ok(orders)
    }
    .await;
    settle(uow.as_ref(), result).await
  }
}

async fn order_details(uow: &dyn UnitOfWork, order: Order) -> ShopResult<OrderDetails> {
  let items = uow.order_items(order.id).await?;
  Ok(OrderDetails { order, items })
}

pub(crate) fn create_order_pipeline() -> Pipeline<CreateOrderCtxData, ShopError> {
  let mut p = Pipeline::<CreateOrderCtxData, ShopError>::new(
    "create_order",
    &[
      ("lock_user", false, None),
      ("load_active_cart", false, None),
      ("select_items", false, None),
      ("persist_order", false, None),
      ("assign_items", false, None),
      ("persist_user", false, None),
      ("load_order_details", false, None),
    ],
  );

  p.on_root("lock_user", lock_user);
  p.on_root("load_active_cart", load_active_cart);

  p.before_root("select_items", |ctx_data: ContextData<CreateOrderCtxData>| async move {
    let guard = ctx_data.read();
    if guard.active_cart.is_empty() {
      return Err(ShopError::EmptyCart {
        username: guard.username.clone(),
      });
    }
    if guard.requested_item_ids.is_empty() {
      return Err(ShopError::Validation("cart_item_ids must not be empty".to_string()));
    }
    Ok(PipelineControl::Continue)
  });
  p.on_root("select_items", select_items);

  p.on_root("persist_order", persist_order);
  p.on_root("assign_items", assign_items);

  p.on_root("persist_user", |ctx_data: ContextData<CreateOrderCtxData>| async move {
    let (uow, user) = {
      let guard = ctx_data.read();
      (Arc::clone(&guard.uow), required(&guard.user, "persist_user", "user")?)
    };
    let user = uow.update_user(&user).await?;
    ctx_data.write().user = Some(user);
    Ok::<_, ShopError>(PipelineControl::Continue)
  });

  p.on_root("load_order_details", |ctx_data: ContextData<CreateOrderCtxData>| async move {
    let (uow, details) = {
      let guard = ctx_data.read();
      (
        Arc::clone(&guard.uow),
        required(&guard.order, "load_order_details", "order")?,
      )
    };
    let details = order_details(uow.as_ref(), details.order).await?;
    ctx_data.write().order = Some(details);
    Ok::<_, ShopError>(PipelineControl::Continue)
  });
  p
}

async fn lock_user(ctx_data: ContextData<CreateOrderCtxData>) -> ShopResult<PipelineControl> {
  let (uow, username) = {
    let guard = ctx_data.read();
    (Arc::clone(&guard.uow), guard.username.clone())
  };
  let user = uow
    .lock_user(&username)
    .await?
    .ok_or_else(|| ShopError::not_found("user", &username))?;
  ctx_data.write().user = Some(user);
  Ok(PipelineControl::Continue)
}

async fn load_active_cart(ctx_data: ContextData<CreateOrderCtxData>) -> ShopResult<PipelineControl> {
  let (uow, user) = {
    let guard = ctx_data.read();
    (Arc::clone(&guard.uow), required(&guard.user, "load_active_cart", "user")?)
  };
  let active_cart = uow.active_cart_items(user.id).await?;
  ctx_data.write().active_cart = active_cart;
  Ok(PipelineControl::Continue)
}

/// Matches the requested ids against the active cart. Duplicate ids count once.
async fn select_items(ctx_data: ContextData<CreateOrderCtxData>) -> ShopResult<PipelineControl> {
  let mut guard = ctx_data.write();
  let mut seen = HashSet::new();
  let mut selected = Vec::with_capacity(guard.requested_item_ids.len());

  for id in guard.requested_item_ids.iter().copied() {
    if !seen.insert(id) {
      continue;
    }
    match guard.active_cart.iter().find(|item| item.id == id) {
      Some(item) => selected.push(item.clone()),
      None => {
        warn!(cart_item_id = %id, username = %guard.username, "Requested item is not in the active cart.");
        return Err(ShopError::ItemNotInCart(id));
      }
    }
  }
  guard.selected_items = selected;
  Ok(PipelineControl::Continue)
}

async fn persist_order(ctx_data: ContextData<CreateOrderCtxData>) -> ShopResult<PipelineControl> {
  let (uow, user) = {
    let guard = ctx_data.read();
    (Arc::clone(&guard.uow), required(&guard.user, "persist_order", "user")?)
  };
  let order = uow.insert_order(user.id).await?;
  ctx_data.write().order = Some(OrderDetails { order, items: Vec::new() });
  Ok(PipelineControl::Continue)
}

async fn assign_items(ctx_data: ContextData<CreateOrderCtxData>) -> ShopResult<PipelineControl> {
  let (uow, order_id, selected) = {
    let guard = ctx_data.read();
    let details = required(&guard.order, "assign_items", "order")?;
    (Arc::clone(&guard.uow), details.order.id, guard.selected_items.clone())
  };

  // Re-read each row under lock: an unscoped edit or delete may have landed
  // since the cart was loaded.
  let mut assigned = Vec::with_capacity(selected.len());
  for selected_item in selected {
    let mut item = match uow.lock_cart_item(selected_item.id).await? {
      Some(item) if item.is_active() && item.user_id == selected_item.user_id => item,
      _ => {
        warn!(cart_item_id = %selected_item.id, "Cart item changed before it could be ordered.");
        return Err(ShopError::ItemNotInCart(selected_item.id));
      }
    };
    item.order_id = Some(order_id);
    assigned.push(uow.update_cart_item(&item).await?);
  }

  let mut guard = ctx_data.write();
  let assigned_ids: HashSet<Uuid> = assigned.iter().map(|item| item.id).collect();
  guard.active_cart.retain(|item| !assigned_ids.contains(&item.id));
  guard.selected_items = assigned;
  Ok(PipelineControl::Continue)
}
