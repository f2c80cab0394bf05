// tests/cart_workflow_tests.rs
mod common;

use common::*;
use cartflow::{ShopError, ShopSettings};
use uuid::Uuid;

#[tokio::test]
async fn test_adding_the_same_product_twice_sums_quantities() {
  setup_tracing();
  let shop = new_shop();
  let (alice, products) = seed(&shop, "alice", &["widget"]).await;

  let first = shop.add_to_cart("alice", "widget", 3).await.unwrap();
  let second = shop.add_to_cart("alice", "widget", 2).await.unwrap();

  assert_eq!(first.id, second.id);
  assert_eq!(second.quantity, 5);
  assert_eq!(second.user_id, alice.id);
  assert_eq!(second.product_id, products[0].id);

  let cart = shop.view_cart("alice").await.unwrap();
  assert_eq!(cart.len(), 1);
  assert_eq!(cart[0].item.quantity, 5);
  assert_eq!(cart[0].product.name, "widget");
}

#[tokio::test]
async fn test_add_to_cart_rejects_bad_input_without_writing() {
  setup_tracing();
  let shop = new_shop();
  seed(&shop, "alice", &["widget"]).await;

  for quantity in [0, -4] {
    let err = shop.add_to_cart("alice", "widget", quantity).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)), "got {err:?}");
  }
  assert!(matches!(
    shop.add_to_cart("nobody", "widget", 1).await,
    Err(ShopError::NotFound(_))
  ));
  assert!(matches!(
    shop.add_to_cart("alice", "unknown", 1).await,
    Err(ShopError::NotFound(_))
  ));

  assert!(active_cart(&shop, "alice").await.is_empty());
  assert!(matches!(shop.get_product("unknown").await, Err(ShopError::NotFound(_))));
}

#[tokio::test]
async fn test_auto_registration_creates_the_missing_product() {
  setup_tracing();
  let shop = new_shop_with(ShopSettings {
    auto_register_products: true,
  });
  shop.create_user("alice").await.unwrap();

  let item = shop.add_to_cart("alice", "gizmo", 2).await.unwrap();
  let gizmo = shop.get_product("gizmo").await.unwrap();
  assert_eq!(item.product_id, gizmo.id);

  // Registration happens inside the cart's unit of work: a failed add leaves no product behind.
  assert!(shop.add_to_cart("nobody", "phantom", 1).await.is_err());
  assert!(matches!(shop.get_product("phantom").await, Err(ShopError::NotFound(_))));
}

#[tokio::test]
async fn test_remove_from_cart_returns_what_is_left() {
  setup_tracing();
  let shop = new_shop();
  seed(&shop, "alice", &["widget", "bolt"]).await;
  let widget = shop.add_to_cart("alice", "widget", 1).await.unwrap();
  let bolt = shop.add_to_cart("alice", "bolt", 4).await.unwrap();

  let remaining = shop.remove_from_cart("alice", widget.id).await.unwrap();
  assert_eq!(remaining.len(), 1);
  assert_eq!(remaining[0].item.id, bolt.id);

  assert!(matches!(shop.get_cart_item(widget.id).await, Err(ShopError::NotFound(_))));
  assert!(matches!(
    shop.remove_from_cart("alice", widget.id).await,
    Err(ShopError::NotFound(_))
  ));
}

#[tokio::test]
async fn test_removing_another_users_item_is_not_found_and_changes_nothing() {
  setup_tracing();
  let shop = new_shop();
  seed(&shop, "alice", &["widget"]).await;
  shop.create_user("bob").await.unwrap();
  let alice_item = shop.add_to_cart("alice", "widget", 2).await.unwrap();
  let bob_item = shop.add_to_cart("bob", "widget", 1).await.unwrap();

  let err = shop.remove_from_cart("bob", alice_item.id).await.unwrap_err();
  assert!(matches!(err, ShopError::NotFound(_)), "got {err:?}");

  assert_eq!(active_cart(&shop, "alice").await, vec![alice_item]);
  assert_eq!(active_cart(&shop, "bob").await, vec![bob_item]);
}

#[tokio::test]
async fn test_update_quantity_replaces_the_value() {
  setup_tracing();
  let shop = new_shop();
  seed(&shop, "alice", &["widget"]).await;
  let item = shop.add_to_cart("alice", "widget", 2).await.unwrap();

  let updated = shop.update_quantity(item.id, 7, None).await.unwrap();
  assert_eq!(updated.id, item.id);
  assert_eq!(updated.quantity, 7);

  assert!(matches!(
    shop.update_quantity(item.id, 0, None).await,
    Err(ShopError::Validation(_))
  ));
  assert!(matches!(
    shop.update_quantity(Uuid::new_v4(), 1, None).await,
    Err(ShopError::NotFound(_))
  ));
  assert_eq!(shop.get_cart_item(item.id).await.unwrap().item.quantity, 7);
}

#[tokio::test]
async fn test_scoped_update_checks_the_owner() {
  setup_tracing();
  let shop = new_shop();
  seed(&shop, "alice", &["widget"]).await;
  shop.create_user("bob").await.unwrap();
  let item = shop.add_to_cart("alice", "widget", 2).await.unwrap();

  let err = shop.update_quantity(item.id, 9, Some("bob")).await.unwrap_err();
  assert!(matches!(err, ShopError::NotFound(_)), "got {err:?}");
  assert_eq!(shop.get_cart_item(item.id).await.unwrap().item.quantity, 2);

  let updated = shop.update_quantity(item.id, 9, Some("alice")).await.unwrap();
  assert_eq!(updated.quantity, 9);
}

#[tokio::test]
async fn test_ordered_items_are_frozen() {
  setup_tracing();
  let shop = new_shop();
  seed(&shop, "alice", &["widget"]).await;
  let item = shop.add_to_cart("alice", "widget", 2).await.unwrap();
  shop.create_order("alice", &[item.id]).await.unwrap();

  assert!(matches!(
    shop.update_quantity(item.id, 5, None).await,
    Err(ShopError::Conflict(_))
  ));
  assert!(matches!(shop.delete_cart_item(item.id).await, Err(ShopError::Conflict(_))));
  assert_eq!(shop.get_cart_item(item.id).await.unwrap().item.quantity, 2);

  // The product goes into a fresh cart item, not the ordered one.
  let fresh = shop.add_to_cart("alice", "widget", 1).await.unwrap();
  assert_ne!(fresh.id, item.id);
  assert_eq!(fresh.quantity, 1);
}

#[tokio::test]
async fn test_delete_cart_item() {
  setup_tracing();
  let shop = new_shop();
  seed(&shop, "alice", &["widget"]).await;
  let item = shop.add_to_cart("alice", "widget", 2).await.unwrap();

  shop.delete_cart_item(item.id).await.unwrap();
  assert!(active_cart(&shop, "alice").await.is_empty());
  assert!(matches!(shop.delete_cart_item(item.id).await, Err(ShopError::NotFound(_))));
}

#[tokio::test]
async fn test_another_users_ordered_item_reads_as_missing() {
  setup_tracing();
  let shop = new_shop();
  seed(&shop, "alice", &["widget"]).await;
  shop.create_user("bob").await.unwrap();
  let item = shop.add_to_cart("alice", "widget", 2).await.unwrap();
  shop.create_order("alice", &[item.id]).await.unwrap();

  let err = shop.update_quantity(item.id, 5, Some("bob")).await.unwrap_err();
  assert!(matches!(err, ShopError::NotFound(_)), "got {err:?}");
  let err = shop.update_quantity(item.id, 5, Some("alice")).await.unwrap_err();
  assert!(matches!(err, ShopError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn test_usernames_are_trimmed_at_every_entry_point() {
  setup_tracing();
  let shop = new_shop();
  let alice = shop.create_user("alice ").await.unwrap();
  assert_eq!(alice.username, "alice");
  shop.create_product("widget").await.unwrap();

  let item = shop.add_to_cart(" alice", "widget", 2).await.unwrap();
  assert_eq!(item.user_id, alice.id);
  let item = shop.update_quantity(item.id, 3, Some("alice\t")).await.unwrap();
  assert_eq!(shop.get_user("  alice  ").await.unwrap().cart.len(), 1);

  let order = shop.create_order("alice ", &[item.id]).await.unwrap();
  assert_eq!(order.items[0].quantity, 3);
  assert_eq!(shop.list_orders(" alice").await.unwrap().len(), 1);

  let other = shop.add_to_cart("alice", "widget", 1).await.unwrap();
  assert!(shop.remove_from_cart("alice ", other.id).await.unwrap().is_empty());
  shop.delete_user(" alice ").await.unwrap();
  assert!(shop.list_users().await.unwrap().is_empty());
}
