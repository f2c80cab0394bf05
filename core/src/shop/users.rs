// cartflow/src/shop/users.rs

use super::{cart_entries, normalize_username, settle, validate_name, Shop};
use crate::error::{ShopError, ShopResult};
use crate::models::{CartEntry, User, UserProfile};
use crate::store::UnitOfWork;
use tracing::{info, instrument};

impl Shop {
  #[instrument(name = "shop::create_user", skip(self), err(Display))]
  pub async fn create_user(&self, username: &str) -> ShopResult<User> {
    let username = normalize_username(username)?;
    let uow = self.begin().await?;
    let result: ShopResult<User> = async { Ok(uow.insert_user(&username).await?) }.await;
    let user = settle(uow.as_ref(), result).await?;
    info!(user_id = %user.id, "User created.");
    Ok(user)
  }

  /// The user with its active cart.
  #[instrument(name = "shop::get_user", skip(self), err(Display))]
  pub async fn get_user(&self, username: &str) -> ShopResult<UserProfile> {
    let username = normalize_username(username)?;
    let uow = self.begin().await?;
    let result: ShopResult<UserProfile> = async {
      let user = find_user(uow.as_ref(), &username).await?;
      profile(uow.as_ref(), user).await
    }
    .await;
    settle(uow.as_ref(), result).await
  }

  #[instrument(name = "shop::list_users", skip(self), err(Display))]
  pub async fn list_users(&self) -> ShopResult<Vec<User>> {
    let uow = self.begin().await?;
    let result: ShopResult<Vec<User>> = async { Ok(uow.list_users().await?) }.await;
    settle(uow.as_ref(), result).await
  }

  #[instrument(name = "shop::view_cart", skip(self), err(Display))]
  pub async fn view_cart(&self, username: &str) -> ShopResult<Vec<CartEntry>> {
    Ok(self.get_user(username).await?.cart)
  }

  /// Changes the username, keeping usernames unique.
  #[instrument(name = "shop::rename_user", skip(self), err(Display))]
  pub async fn rename_user(&self, username: &str, new_username: &str) -> ShopResult<UserProfile> {
    let username = normalize_username(username)?;
    let new_username = validate_name("new username", new_username)?;
    let uow = self.begin().await?;
    let result: ShopResult<UserProfile> = async {
      let mut user = uow
        .lock_user(&username)
        .await?
        .ok_or_else(|| ShopError::not_found("user", &username))?;
      if user.username != new_username && uow.user_by_username(&new_username).await?.is_some() {
        return Err(ShopError::Conflict(format!("user '{new_username}' already exists")));
      }
      user.username = new_username.clone();
      let user = uow.update_user(&user).await?;
      profile(uow.as_ref(), user).await
    }
    .await;
    let renamed = settle(uow.as_ref(), result).await?;
    info!(user_id = %renamed.user.id, new_username = %renamed.user.username, "User renamed.");
    Ok(renamed)
  }

  /// Deletes the user together with its cart items and orders.
  #[instrument(name = "shop::delete_user", skip(self), err(Display))]
  pub async fn delete_user(&self, username: &str) -> ShopResult<()> {
    let username = normalize_username(username)?;
    let uow = self.begin().await?;
    let result: ShopResult<()> = async {
      let user = uow
        .lock_user(&username)
        .await?
        .ok_or_else(|| ShopError::not_found("user", &username))?;
      Ok(uow.delete_user(user.id).await?)
    }
    .await;
    settle(uow.as_ref(), result).await?;
    info!("User deleted.");
    Ok(())
  }
}

pub(crate) async fn find_user(uow: &dyn UnitOfWork, username: &str) -> ShopResult<User> {
  uow
    .user_by_username(username)
    .await?
    .ok_or_else(|| ShopError::not_found("user", username))
}

async fn profile(uow: &dyn UnitOfWork, user: User) -> ShopResult<UserProfile> {
  let items = uow.active_cart_items(user.id).await?;
  let cart = cart_entries(uow, items).await?;
  Ok(UserProfile { user, cart })
}
