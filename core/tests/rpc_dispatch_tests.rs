// tests/rpc_dispatch_tests.rs
mod common;

use async_trait::async_trait;
use cartflow::models::{CartItem, OrderDetails, Product};
use cartflow::rpc::{DeliveryOutcome, Dispatcher, InboundDelivery, Outcome, Reply, ReplyPublisher};
use cartflow::{MemoryStore, Shop, ShopSettings, Store};
use common::*;
use parking_lot::Mutex;
use serde_json::json;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct FakeDelivery {
  body: Vec<u8>,
  reply_to: Option<String>,
  correlation_id: Option<String>,
  acks: AtomicUsize,
}

impl FakeDelivery {
  fn new(body: serde_json::Value) -> Self {
    Self::raw(serde_json::to_vec(&body).unwrap())
  }

  fn raw(body: Vec<u8>) -> Self {
    FakeDelivery {
      body,
      reply_to: Some("amq.rabbitmq.reply-to".to_string()),
      correlation_id: Some("corr-42".to_string()),
      acks: AtomicUsize::new(0),
    }
  }

  fn acks(&self) -> usize {
    self.acks.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl InboundDelivery for FakeDelivery {
  fn body(&self) -> &[u8] {
    &self.body
  }

  fn reply_to(&self) -> Option<&str> {
    self.reply_to.as_deref()
  }

  fn correlation_id(&self) -> Option<&str> {
    self.correlation_id.as_deref()
  }

  async fn ack(&self) -> anyhow::Result<()> {
    self.acks.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

#[derive(Default)]
struct RecordingPublisher {
  published: Mutex<Vec<(String, Option<String>, Reply)>>,
  fail: bool,
}

impl RecordingPublisher {
  fn replies(&self) -> Vec<(String, Option<String>, Reply)> {
    self.published.lock().clone()
  }

  fn last_reply(&self) -> Reply {
    self.published.lock().last().expect("a reply was published").2.clone()
  }
}

#[async_trait]
impl ReplyPublisher for RecordingPublisher {
  async fn publish(&self, reply_to: &str, correlation_id: Option<&str>, body: Vec<u8>) -> anyhow::Result<()> {
    if self.fail {
      anyhow::bail!("channel closed");
    }
    let reply = Reply::from_slice(&body)?;
    self
      .published
      .lock()
      .push((reply_to.to_string(), correlation_id.map(str::to_string), reply));
    Ok(())
  }
}

fn dispatcher() -> Dispatcher {
  Dispatcher::new(Arc::new(new_shop()), Duration::from_secs(5))
}

async fn call(dispatcher: &Dispatcher, publisher: &RecordingPublisher, body: serde_json::Value) -> Reply {
  let delivery = FakeDelivery::new(body);
  let outcome = dispatcher.handle_delivery(&delivery, publisher).await.unwrap();
  assert_eq!(outcome, DeliveryOutcome::Replied);
  assert_eq!(delivery.acks(), 1);
  publisher.last_reply()
}

#[tokio::test]
#[serial]
async fn test_successful_request_replies_with_correlation_id() {
  setup_tracing();
  let dispatcher = dispatcher();
  let publisher = RecordingPublisher::default();

  let reply = call(
    &dispatcher,
    &publisher,
    json!({"pattern": "CREATE_PRODUCT", "data": {"name": "widget"}, "id": "req-1"}),
  )
  .await;

  assert_eq!(reply.success, Outcome::Success);
  assert_eq!(reply.message, "Product created");
  let product: Product = reply.decode_data().unwrap().unwrap();
  assert_eq!(product.name, "widget");

  let (reply_to, correlation_id, _) = publisher.replies().remove(0);
  assert_eq!(reply_to, "amq.rabbitmq.reply-to");
  assert_eq!(correlation_id.as_deref(), Some("corr-42"));
}

#[tokio::test]
#[serial]
async fn test_order_survives_the_reply_envelope() {
  setup_tracing();
  let dispatcher = dispatcher();
  let publisher = RecordingPublisher::default();

  call(&dispatcher, &publisher, json!({"pattern": "CREATE_USER", "data": {"username": "alice"}, "id": "1"})).await;
  for name in ["widget", "bolt"] {
    call(&dispatcher, &publisher, json!({"pattern": "CREATE_PRODUCT", "data": {"name": name}, "id": "2"})).await;
  }
  let mut items = Vec::new();
  for (name, quantity) in [("widget", 3), ("bolt", 4)] {
    let reply = call(
      &dispatcher,
      &publisher,
      json!({"pattern": "ADD_TO_CART", "data": {"username": "alice", "product_name": name, "quantity": quantity}, "id": "3"}),
    )
    .await;
    let item: CartItem = reply.decode_data().unwrap().unwrap();
    items.push(item);
  }

  let ids: Vec<_> = items.iter().map(|i| i.id).collect();
  let reply = call(
    &dispatcher,
    &publisher,
    json!({"pattern": "CREATE_ORDER", "data": {"username": "alice", "cart_item_ids": ids}, "id": "4"}),
  )
  .await;
  assert!(reply.is_success(), "{}", reply.message);

  // Through the wire bytes and back.
  let wire = reply.to_bytes().unwrap();
  let order: OrderDetails = Reply::from_slice(&wire).unwrap().decode_data().unwrap().unwrap();

  let mut sent: Vec<_> = items.iter().map(|i| (i.product_id, i.quantity)).collect();
  let mut received: Vec<_> = order.items.iter().map(|i| (i.product_id, i.quantity)).collect();
  sent.sort();
  received.sort();
  assert_eq!(sent, received);

  let reply = call(
    &dispatcher,
    &publisher,
    json!({"pattern": "GET_ORDER", "data": {"id": order.order.id}, "id": "5"}),
  )
  .await;
  assert_eq!(reply.decode_data::<OrderDetails>().unwrap(), Some(order));
}

#[tokio::test]
#[serial]
async fn test_shop_errors_become_error_replies() {
  setup_tracing();
  let dispatcher = dispatcher();
  let publisher = RecordingPublisher::default();

  call(&dispatcher, &publisher, json!({"pattern": "CREATE_USER", "data": {"username": "alice"}, "id": "1"})).await;
  let reply = call(
    &dispatcher,
    &publisher,
    json!({"pattern": "CREATE_ORDER", "data": {"username": "alice", "cart_item_ids": []}, "id": "2"}),
  )
  .await;

  assert_eq!(reply.success, Outcome::Error);
  assert_eq!(reply.message, "cart of user 'alice' is empty");
  assert_eq!(reply.data, None);
}

#[tokio::test]
#[serial]
async fn test_undecodable_deliveries_are_answered_and_acked() {
  setup_tracing();
  let dispatcher = dispatcher();
  let publisher = RecordingPublisher::default();

  let bodies = vec![
    b"{not json".to_vec(),
    serde_json::to_vec(&json!({"pattern": "GET_TOP3POPULARPRODUCTS", "data": {}, "id": "x"})).unwrap(),
    serde_json::to_vec(&json!({"pattern": "GET_ORDER", "data": {"id": 17}, "id": "y"})).unwrap(),
  ];
  for body in bodies {
    let delivery = FakeDelivery::raw(body);
    let outcome = dispatcher.handle_delivery(&delivery, &publisher).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Replied);
    assert_eq!(delivery.acks(), 1);
    assert_eq!(publisher.last_reply().success, Outcome::Error);
  }
  assert_eq!(publisher.replies().len(), 3);
}

#[tokio::test]
#[serial]
async fn test_missing_reply_to_and_failed_publish_still_ack() {
  setup_tracing();
  let dispatcher = dispatcher();
  let body = json!({"pattern": "GET_PRODUCTS", "data": null, "id": "1"});

  let mut delivery = FakeDelivery::new(body.clone());
  delivery.reply_to = None;
  let publisher = RecordingPublisher::default();
  let outcome = dispatcher.handle_delivery(&delivery, &publisher).await.unwrap();
  assert_eq!(outcome, DeliveryOutcome::NoReplyTo);
  assert_eq!(delivery.acks(), 1);
  assert!(publisher.replies().is_empty());

  let delivery = FakeDelivery::new(body);
  let failing = RecordingPublisher {
    fail: true,
    ..Default::default()
  };
  let outcome = dispatcher.handle_delivery(&delivery, &failing).await.unwrap();
  assert_eq!(outcome, DeliveryOutcome::PublishFailed);
  assert_eq!(delivery.acks(), 1);
}

#[tokio::test]
#[serial]
async fn test_request_id_is_used_when_the_delivery_has_no_correlation_id() {
  setup_tracing();
  let dispatcher = dispatcher();
  let publisher = RecordingPublisher::default();

  let mut delivery = FakeDelivery::new(json!({"pattern": "GET_USERS", "id": "req-9"}));
  delivery.correlation_id = None;
  dispatcher.handle_delivery(&delivery, &publisher).await.unwrap();

  let (_, correlation_id, reply) = publisher.replies().remove(0);
  assert_eq!(correlation_id.as_deref(), Some("req-9"));
  assert!(reply.is_success());
}

#[tokio::test]
#[serial]
async fn test_expired_deadline_sends_no_reply_but_acks() {
  setup_tracing();
  let store = MemoryStore::new();
  let shop = Shop::new(Arc::new(store.clone()), ShopSettings::default());
  let dispatcher = Dispatcher::new(Arc::new(shop), Duration::from_millis(50));
  let publisher = RecordingPublisher::default();

  // An open unit of work holds the store, so the request cannot start its own.
  let held = store.begin().await.unwrap();

  let delivery = FakeDelivery::new(json!({"pattern": "GET_PRODUCTS", "id": "slow"}));
  let outcome = dispatcher.handle_delivery(&delivery, &publisher).await.unwrap();

  assert_eq!(outcome, DeliveryOutcome::TimedOut);
  assert_eq!(delivery.acks(), 1);
  assert!(publisher.replies().is_empty());

  held.rollback().await.unwrap();
  let delivery = FakeDelivery::new(json!({"pattern": "GET_PRODUCTS", "id": "fast"}));
  assert_eq!(
    dispatcher.handle_delivery(&delivery, &publisher).await.unwrap(),
    DeliveryOutcome::Replied
  );
}
