// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every helper

use cartflow::models::{CartItem, Product, User};
use cartflow::{ContextData, FlowError, MemoryStore, PipelineControl, Shop, ShopSettings};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::Level;

// --- Context and error for engine tests ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("flow error: {0}")]
  Flow(#[from] FlowError),

  #[error("test handler failed: {0}")]
  Handler(String),

  #[error("store error: {0}")]
  Store(#[from] cartflow::StoreError),
}

pub fn create_simple_handler(
  step_name: &'static str,
  message_to_append: &'static str,
) -> cartflow::core::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      tracing::debug!(target: "test_handlers", step = step_name, counter = guard.counter, "executed");
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn create_failing_handler(
  step_name: &'static str,
  error_message: &'static str,
) -> cartflow::core::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      tracing::warn!(target: "test_handlers", step = step_name, "failing with: '{}'", error_message);
      Err(TestError::Handler(error_message.to_string()))
    })
  })
}

// --- Shop fixtures ---
pub fn new_shop() -> Shop {
  Shop::new(Arc::new(MemoryStore::new()), ShopSettings::default())
}

pub fn new_shop_with(settings: ShopSettings) -> Shop {
  Shop::new(Arc::new(MemoryStore::new()), settings)
}

/// Creates the user and every named product.
pub async fn seed(shop: &Shop, username: &str, products: &[&str]) -> (User, Vec<Product>) {
  let user = shop.create_user(username).await.expect("seed user");
  let mut created = Vec::new();
  for name in products {
    created.push(shop.create_product(name).await.expect("seed product"));
  }
  (user, created)
}

pub async fn active_cart(shop: &Shop, username: &str) -> Vec<CartItem> {
  shop
    .view_cart(username)
    .await
    .expect("view cart")
    .into_iter()
    .map(|entry| entry.item)
    .collect()
}

// --- Tracing setup, once per test binary ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
