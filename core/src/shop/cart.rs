// cartflow/src/shop/cart.rs

//! Cart mutations. Each one is a pipeline run inside a single unit of work
//! that starts by locking the user, so concurrent mutations of one cart are
//! serialized and a failed step leaves nothing behind.

use super::contexts::{required, AddToCartCtxData, RemoveFromCartCtxData, UpdateQuantityCtxData};
use super::{cart_entries, normalize_username, run_workflow, settle, validate_name, validate_quantity, Shop};
use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::step::SkipCondition;
use crate::error::{ShopError, ShopResult};
use crate::models::{CartEntry, CartItem, NewCartItem};
use crate::pipeline::Pipeline;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

impl Shop {
  /// Adds `quantity` of the named product to the user's cart, merging into an
  /// existing active item for the same product.
  #[instrument(name = "shop::add_to_cart", skip(self), err(Display))]
  pub async fn add_to_cart(&self, username: &str, product_name: &str, quantity: i32) -> ShopResult<CartItem> {
    let username = normalize_username(username)?;
    let product_name = validate_name("product name", product_name)?;
    let uow = self.begin().await?;
    let ctx_data = ContextData::new(AddToCartCtxData {
      uow: Arc::clone(&uow),
      username,
      product_name,
      quantity,
      register_missing_product: self.settings().auto_register_products,
      user: None,
      product: None,
      cart_item: None,
    });

    run_workflow(&self.workflows.add_to_cart, ctx_data.clone(), uow.as_ref()).await?;
    let cart_item = required(&ctx_data.read().cart_item, "shop::add_to_cart", "cart_item")?;
    Ok(cart_item)
  }

  /// Removes one item from the user's active cart and returns what is left.
  /// An id that is not in this user's active cart fails with `NotFound` and
  /// changes nothing.
  #[instrument(name = "shop::remove_from_cart", skip(self), err(Display))]
  pub async fn remove_from_cart(&self, username: &str, cart_item_id: Uuid) -> ShopResult<Vec<CartEntry>> {
    let username = normalize_username(username)?;
    let uow = self.begin().await?;
    let ctx_data = ContextData::new(RemoveFromCartCtxData {
      uow: Arc::clone(&uow),
      username,
      cart_item_id,
      user: None,
      removed_item: None,
      remaining_cart: Vec::new(),
    });

    run_workflow(&self.workflows.remove_from_cart, ctx_data.clone(), uow.as_ref()).await?;
    let remaining = ctx_data.read().remaining_cart.clone();
    Ok(remaining)
  }

  /// Replaces the quantity of a cart item. With `owner` set, the item must
  /// belong to that user; another user's item reads as missing. Items already
  /// assigned to an order are frozen.
  #[instrument(name = "shop::update_quantity", skip(self), err(Display))]
  pub async fn update_quantity(&self, cart_item_id: Uuid, quantity: i32, owner: Option<&str>) -> ShopResult<CartItem> {
    let owner = owner.map(normalize_username).transpose()?;
    let uow = self.begin().await?;
    let ctx_data = ContextData::new(UpdateQuantityCtxData {
      uow: Arc::clone(&uow),
      cart_item_id,
      quantity,
      owner,
      owner_id: None,
      cart_item: None,
    });

    run_workflow(&self.workflows.update_quantity, ctx_data.clone(), uow.as_ref()).await?;
    let cart_item = required(&ctx_data.read().cart_item, "shop::update_quantity", "cart_item")?;
    Ok(cart_item)
  }

  #[instrument(name = "shop::get_cart_item", skip(self), err(Display))]
  pub async fn get_cart_item(&self, cart_item_id: Uuid) -> ShopResult<CartEntry> {
    let uow = self.begin().await?;
    let result: ShopResult<CartEntry> = async {
      let item = uow
        .cart_item_by_id(cart_item_id)
        .await?
        .ok_or_else(|| ShopError::not_found("cart item", cart_item_id))?;
      let mut entries = cart_entries(uow.as_ref(), vec![item]).await?;
      entries
        .pop()
        .ok_or_else(|| ShopError::not_found("cart item", cart_item_id))
    }
    .await;
    settle(uow.as_ref(), result).await
  }

  /// Deletes an active cart item by id, whoever owns it.
  #[instrument(name = "shop::delete_cart_item", skip(self), err(Display))]
  pub async fn delete_cart_item(&self, cart_item_id: Uuid) -> ShopResult<()> {
    let uow = self.begin().await?;
    let result: ShopResult<()> = async {
      let item = uow
        .lock_cart_item(cart_item_id)
        .await?
        .ok_or_else(|| ShopError::not_found("cart item", cart_item_id))?;
      ensure_active(&item)?;
      Ok(uow.delete_cart_item(item.id).await?)
    }
    .await;
    settle(uow.as_ref(), result).await
  }
}

fn ensure_active(item: &CartItem) -> ShopResult<()> {
  match item.order_id {
    None => Ok(()),
    Some(order_id) => Err(ShopError::Conflict(format!(
      "cart item {} already belongs to order {order_id}",
      item.id
    ))),
  }
}

// --- add_to_cart ---

pub(crate) fn add_to_cart_pipeline() -> Pipeline<AddToCartCtxData, ShopError> {
  let registration_disabled: SkipCondition<AddToCartCtxData> = Arc::new(|data| !data.register_missing_product);

  let mut p = Pipeline::<AddToCartCtxData, ShopError>::new(
    "add_to_cart",
    &[
      ("lock_user", false, None),
      ("register_missing_product", false, Some(registration_disabled)),
      ("resolve_product", false, None),
      ("merge_into_cart", false, None),
    ],
  );

  p.before_root("lock_user", |ctx_data: ContextData<AddToCartCtxData>| async move {
    validate_quantity(ctx_data.read().quantity)?;
    Ok::<_, ShopError>(PipelineControl::Continue)
  });
  p.on_root("lock_user", |ctx_data: ContextData<AddToCartCtxData>| async move {
    let (uow, username) = {
      let guard = ctx_data.read();
      (Arc::clone(&guard.uow), guard.username.clone())
    };
    let user = uow
      .lock_user(&username)
      .await?
      .ok_or_else(|| ShopError::not_found("user", &username))?;
    ctx_data.write().user = Some(user);
    Ok::<_, ShopError>(PipelineControl::Continue)
  });
  p.on_root("register_missing_product", register_missing_product);
  p.on_root("resolve_product", resolve_product);
  p.on_root("merge_into_cart", merge_into_cart);
  p.after_root("merge_into_cart", |ctx_data: ContextData<AddToCartCtxData>| async move {
    if let Some(item) = &ctx_data.read().cart_item {
      info!(cart_item_id = %item.id, quantity = item.quantity, "Cart item stored.");
    }
    Ok::<_, ShopError>(PipelineControl::Continue)
  });
  p
}

async fn register_missing_product(ctx_data: ContextData<AddToCartCtxData>) -> ShopResult<PipelineControl> {
  let (uow, product_name) = {
    let guard = ctx_data.read();
    (Arc::clone(&guard.uow), guard.product_name.clone())
  };
  if uow.product_by_name(&product_name).await?.is_none() {
    let product = uow.insert_product(&product_name).await?;
    info!(product_id = %product.id, %product_name, "Registered product referenced by cart.");
  }
  Ok(PipelineControl::Continue)
}

async fn resolve_product(ctx_data: ContextData<AddToCartCtxData>) -> ShopResult<PipelineControl> {
  let (uow, product_name) = {
    let guard = ctx_data.read();
    (Arc::clone(&guard.uow), guard.product_name.clone())
  };
  let product = uow
    .product_by_name(&product_name)
    .await?
    .ok_or_else(|| ShopError::not_found("product", &product_name))?;
  ctx_data.write().product = Some(product);
  Ok(PipelineControl::Continue)
}

async fn merge_into_cart(ctx_data: ContextData<AddToCartCtxData>) -> ShopResult<PipelineControl> {
  let (uow, user, product, quantity) = {
    let guard = ctx_data.read();
    (
      Arc::clone(&guard.uow),
      required(&guard.user, "merge_into_cart", "user")?,
      required(&guard.product, "merge_into_cart", "product")?,
      guard.quantity,
    )
  };

  let existing = uow
    .active_cart_items(user.id)
    .await?
    .into_iter()
    .find(|item| item.product_id == product.id);

  let stored = match existing {
    Some(found) => {
      let mut item = uow
        .lock_cart_item(found.id)
        .await?
        .ok_or_else(|| ShopError::not_found("cart item", found.id))?;
      ensure_active(&item)?;
      item.quantity = item
        .quantity
        .checked_add(quantity)
        .ok_or_else(|| ShopError::Validation(format!("quantity overflow for cart item {}", item.id)))?;
      debug!(cart_item_id = %item.id, new_quantity = item.quantity, "Merging into existing cart item.");
      uow.update_cart_item(&item).await?
    }
    None => {
      uow
        .insert_cart_item(NewCartItem {
          user_id: user.id,
          product_id: product.id,
          quantity,
        })
        .await?
    }
  };
  ctx_data.write().cart_item = Some(stored);
  Ok(PipelineControl::Continue)
}

// --- remove_from_cart ---

pub(crate) fn remove_from_cart_pipeline() -> Pipeline<RemoveFromCartCtxData, ShopError> {
  let mut p = Pipeline::<RemoveFromCartCtxData, ShopError>::new(
    "remove_from_cart",
    &[
      ("lock_user", false, None),
      ("find_owned_item", false, None),
      ("delete_item", false, None),
      ("persist_user", false, None),
    ],
  );

  p.on_root("lock_user", |ctx_data: ContextData<RemoveFromCartCtxData>| async move {
    let (uow, username) = {
      let guard = ctx_data.read();
      (Arc::clone(&guard.uow), guard.username.clone())
    };
    let user = uow
      .lock_user(&username)
      .await?
      .ok_or_else(|| ShopError::not_found("user", &username))?;
    ctx_data.write().user = Some(user);
    Ok::<_, ShopError>(PipelineControl::Continue)
  });

  p.on_root("find_owned_item", |ctx_data: ContextData<RemoveFromCartCtxData>| async move {
    let (uow, user, cart_item_id) = {
      let guard = ctx_data.read();
      (
        Arc::clone(&guard.uow),
        required(&guard.user, "find_owned_item", "user")?,
        guard.cart_item_id,
      )
    };
    // Only this user's active cart is searched; another user's item is
    // indistinguishable from a missing one.
    let item = uow
      .active_cart_items(user.id)
      .await?
      .into_iter()
      .find(|item| item.id == cart_item_id);
    match item {
      Some(item) => {
        ctx_data.write().removed_item = Some(item);
        Ok::<_, ShopError>(PipelineControl::Continue)
      }
      None => {
        warn!(%cart_item_id, username = %user.username, "Cart item not in user's cart.");
        Err(ShopError::not_found("cart item", cart_item_id))
      }
    }
  });

  p.on_root("delete_item", |ctx_data: ContextData<RemoveFromCartCtxData>| async move {
    let (uow, item) = {
      let guard = ctx_data.read();
      (
        Arc::clone(&guard.uow),
        required(&guard.removed_item, "delete_item", "removed_item")?,
      )
    };
    uow.delete_cart_item(item.id).await?;
    Ok::<_, ShopError>(PipelineControl::Continue)
  });

  p.on_root("persist_user", |ctx_data: ContextData<RemoveFromCartCtxData>| async move {
    let (uow, user) = {
      let guard = ctx_data.read();
      (Arc::clone(&guard.uow), required(&guard.user, "persist_user", "user")?)
    };
    let user = uow.update_user(&user).await?;
    let remaining = uow.active_cart_items(user.id).await?;
    let remaining_cart = cart_entries(uow.as_ref(), remaining).await?;
    {
      let mut guard = ctx_data.write();
      guard.user = Some(user);
      guard.remaining_cart = remaining_cart;
    }
    Ok::<_, ShopError>(PipelineControl::Continue)
  });
  p
}

// --- update_quantity ---

// The owner is locked before the item, the same order create_order takes, and
// the item row is locked before it is checked, so an order committed in
// between is seen here rather than overwritten.
pub(crate) fn update_quantity_pipeline() -> Pipeline<UpdateQuantityCtxData, ShopError> {
  let unscoped: SkipCondition<UpdateQuantityCtxData> = Arc::new(|data| data.owner.is_none());

  let mut p = Pipeline::<UpdateQuantityCtxData, ShopError>::new(
    "update_quantity",
    &[
      ("validate_quantity", false, None),
      ("lock_owner", false, Some(unscoped)),
      ("load_item", false, None),
      ("save_quantity", false, None),
    ],
  );

  p.on_root("validate_quantity", |ctx_data: ContextData<UpdateQuantityCtxData>| async move {
    validate_quantity(ctx_data.read().quantity)?;
    Ok::<_, ShopError>(PipelineControl::Continue)
  });

  p.on_root("lock_owner", |ctx_data: ContextData<UpdateQuantityCtxData>| async move {
    let (uow, owner) = {
      let guard = ctx_data.read();
      (Arc::clone(&guard.uow), required(&guard.owner, "lock_owner", "owner")?)
    };
    let user = uow
      .lock_user(&owner)
      .await?
      .ok_or_else(|| ShopError::not_found("user", &owner))?;
    ctx_data.write().owner_id = Some(user.id);
    Ok::<_, ShopError>(PipelineControl::Continue)
  });

  p.on_root("load_item", |ctx_data: ContextData<UpdateQuantityCtxData>| async move {
    let (uow, cart_item_id, owner_id) = {
      let guard = ctx_data.read();
      (Arc::clone(&guard.uow), guard.cart_item_id, guard.owner_id)
    };
    let item = uow
      .lock_cart_item(cart_item_id)
      .await?
      .ok_or_else(|| ShopError::not_found("cart item", cart_item_id))?;
    if owner_id.is_some_and(|owner_id| owner_id != item.user_id) {
      warn!(%cart_item_id, "Cart item belongs to another user.");
      return Err(ShopError::not_found("cart item", cart_item_id));
    }
    ensure_active(&item)?;
    ctx_data.write().cart_item = Some(item);
    Ok::<_, ShopError>(PipelineControl::Continue)
  });

  p.on_root("save_quantity", |ctx_data: ContextData<UpdateQuantityCtxData>| async move {
    let (uow, mut item, quantity) = {
      let guard = ctx_data.read();
      (
        Arc::clone(&guard.uow),
        required(&guard.cart_item, "save_quantity", "cart_item")?,
        guard.quantity,
      )
    };
    item.quantity = quantity;
    let saved = uow.update_cart_item(&item).await?;
    ctx_data.write().cart_item = Some(saved);
    Ok::<_, ShopError>(PipelineControl::Continue)
  });
  p
}
