// tests/catalog_user_tests.rs
mod common;

use common::*;
use cartflow::ShopError;

#[tokio::test]
async fn test_duplicate_product_is_a_conflict_and_keeps_the_original() {
  setup_tracing();
  let shop = new_shop();
  let original = shop.create_product("widget").await.unwrap();

  let err = shop.create_product("widget").await.unwrap_err();
  assert!(matches!(err, ShopError::Conflict(_)), "got {err:?}");

  let stored = shop.get_product("widget").await.unwrap();
  assert_eq!(stored, original);
  assert_eq!(shop.list_products().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_product_names_are_trimmed_and_must_not_be_blank() {
  setup_tracing();
  let shop = new_shop();

  let product = shop.create_product("  gadget ").await.unwrap();
  assert_eq!(product.name, "gadget");

  let err = shop.create_product("   ").await.unwrap_err();
  assert!(matches!(err, ShopError::Validation(_)));
}

#[tokio::test]
async fn test_products_are_listed_by_name() {
  setup_tracing();
  let shop = new_shop();
  for name in ["widget", "bolt", "gadget"] {
    shop.create_product(name).await.unwrap();
  }

  let names: Vec<String> = shop.list_products().await.unwrap().into_iter().map(|p| p.name).collect();
  assert_eq!(names, vec!["bolt", "gadget", "widget"]);
}

#[tokio::test]
async fn test_rename_product() {
  setup_tracing();
  let shop = new_shop();
  let widget = shop.create_product("widget").await.unwrap();
  shop.create_product("bolt").await.unwrap();

  let renamed = shop.rename_product("widget", "sprocket").await.unwrap();
  assert_eq!(renamed.id, widget.id);
  assert_eq!(renamed.name, "sprocket");
  assert!(renamed.updated_at >= widget.updated_at);
  assert!(matches!(shop.get_product("widget").await, Err(ShopError::NotFound(_))));

  let err = shop.rename_product("sprocket", "bolt").await.unwrap_err();
  assert!(matches!(err, ShopError::Conflict(_)));
  assert!(matches!(
    shop.rename_product("missing", "x").await,
    Err(ShopError::NotFound(_))
  ));
}

#[tokio::test]
async fn test_product_in_a_cart_cannot_be_deleted() {
  setup_tracing();
  let shop = new_shop();
  seed(&shop, "alice", &["widget", "bolt"]).await;
  shop.add_to_cart("alice", "widget", 1).await.unwrap();

  let err = shop.delete_product("widget").await.unwrap_err();
  assert!(matches!(err, ShopError::Conflict(_)), "got {err:?}");
  assert!(shop.get_product("widget").await.is_ok());

  shop.delete_product("bolt").await.unwrap();
  assert!(matches!(shop.get_product("bolt").await, Err(ShopError::NotFound(_))));
}

#[tokio::test]
async fn test_user_lifecycle() {
  setup_tracing();
  let shop = new_shop();
  let alice = shop.create_user("alice").await.unwrap();
  shop.create_user("bob").await.unwrap();

  assert!(matches!(shop.create_user("alice").await, Err(ShopError::Conflict(_))));

  let profile = shop.get_user("alice").await.unwrap();
  assert_eq!(profile.user, alice);
  assert!(profile.cart.is_empty());

  let usernames: Vec<String> = shop.list_users().await.unwrap().into_iter().map(|u| u.username).collect();
  assert_eq!(usernames, vec!["alice", "bob"]);

  assert!(matches!(shop.rename_user("alice", "bob").await, Err(ShopError::Conflict(_))));
  let renamed = shop.rename_user("alice", "alicia").await.unwrap();
  assert_eq!(renamed.user.id, alice.id);
  assert!(matches!(shop.get_user("alice").await, Err(ShopError::NotFound(_))));

  shop.delete_user("alicia").await.unwrap();
  assert!(matches!(shop.get_user("alicia").await, Err(ShopError::NotFound(_))));
  assert!(matches!(shop.delete_user("alicia").await, Err(ShopError::NotFound(_))));
}

#[tokio::test]
async fn test_deleting_a_user_removes_its_cart_and_orders() {
  setup_tracing();
  let shop = new_shop();
  seed(&shop, "alice", &["widget"]).await;
  let item = shop.add_to_cart("alice", "widget", 2).await.unwrap();
  let order = shop.create_order("alice", &[item.id]).await.unwrap();

  shop.delete_user("alice").await.unwrap();

  assert!(matches!(shop.get_order(order.order.id).await, Err(ShopError::NotFound(_))));
  assert!(matches!(shop.get_cart_item(item.id).await, Err(ShopError::NotFound(_))));
  // Nothing references the product any more.
  shop.delete_product("widget").await.unwrap();
}
