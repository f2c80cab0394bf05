// tests/concurrency_tests.rs
mod common;

use common::*;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_to_one_cart_sum_exactly() {
  setup_tracing();
  let shop = Arc::new(new_shop());
  seed(&shop, "alice", &["widget"]).await;

  let mut handles = Vec::new();
  for _ in 0..32 {
    let shop = Arc::clone(&shop);
    handles.push(tokio::spawn(async move { shop.add_to_cart("alice", "widget", 2).await }));
  }
  for handle in handles {
    handle.await.unwrap().unwrap();
  }

  let cart = active_cart(&shop, "alice").await;
  assert_eq!(cart.len(), 1);
  assert_eq!(cart[0].quantity, 64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_orders_take_each_item_once() {
  setup_tracing();
  let shop = Arc::new(new_shop());
  seed(&shop, "alice", &["widget"]).await;
  let item = shop.add_to_cart("alice", "widget", 1).await.unwrap();

  let mut handles = Vec::new();
  for _ in 0..8 {
    let shop = Arc::clone(&shop);
    let ids = vec![item.id];
    handles.push(tokio::spawn(async move { shop.create_order("alice", &ids).await }));
  }

  let mut created = 0;
  for handle in handles {
    if handle.await.unwrap().is_ok() {
      created += 1;
    }
  }
  assert_eq!(created, 1);
  assert_eq!(shop.list_orders("alice").await.unwrap().len(), 1);
}
