// cartflow/src/rpc/dispatcher.rs

//! Turns queue deliveries into shop operations and replies.

use super::command::Command;
use super::envelope::Reply;
use crate::error::ShopError;
use crate::shop::Shop;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// A message taken off the queue. Implemented by the broker adapter.
#[async_trait]
pub trait InboundDelivery: Send + Sync {
  fn body(&self) -> &[u8];
  fn reply_to(&self) -> Option<&str>;
  fn correlation_id(&self) -> Option<&str>;
  async fn ack(&self) -> anyhow::Result<()>;
}

/// Sends a reply body to a reply destination.
#[async_trait]
pub trait ReplyPublisher: Send + Sync {
  async fn publish(&self, reply_to: &str, correlation_id: Option<&str>, body: Vec<u8>) -> anyhow::Result<()>;
}

/// What happened to one delivery. It is acknowledged in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
  Replied,
  /// Handled, but the delivery named no reply destination.
  NoReplyTo,
  /// The deadline expired first. No reply is sent.
  TimedOut,
  /// Handled, but publishing the reply failed.
  PublishFailed,
}

pub struct Dispatcher {
  shop: Arc<Shop>,
  deadline: Duration,
}

impl Dispatcher {
  pub fn new(shop: Arc<Shop>, deadline: Duration) -> Self {
    Self { shop, deadline }
  }

  pub fn deadline(&self) -> Duration {
    self.deadline
  }

  /// Handles one delivery to completion and acknowledges it exactly once.
  ///
  /// Only a failed `ack` is returned as an error; decode failures and shop
  /// errors become error replies.
  #[instrument(
    name = "rpc::handle_delivery",
    skip_all,
    fields(correlation_id = delivery.correlation_id().unwrap_or("-"))
  )]
  pub async fn handle_delivery(
    &self,
    delivery: &dyn InboundDelivery,
    publisher: &dyn ReplyPublisher,
  ) -> anyhow::Result<DeliveryOutcome> {
    let outcome = match tokio::time::timeout(self.deadline, self.process(delivery.body())).await {
      Err(_) => {
        warn!(deadline_ms = self.deadline.as_millis() as u64, "Deadline expired, request abandoned.");
        DeliveryOutcome::TimedOut
      }
      Ok((request_id, reply)) => {
        let correlation_id = delivery.correlation_id().or(request_id.as_deref());
        self.send_reply(delivery.reply_to(), correlation_id, &reply, publisher).await
      }
    };

    delivery.ack().await?;
    debug!(?outcome, "Delivery acknowledged.");
    Ok(outcome)
  }

  async fn send_reply(
    &self,
    reply_to: Option<&str>,
    correlation_id: Option<&str>,
    reply: &Reply,
    publisher: &dyn ReplyPublisher,
  ) -> DeliveryOutcome {
    let Some(reply_to) = reply_to else {
      warn!("Delivery has no reply_to, reply dropped.");
      return DeliveryOutcome::NoReplyTo;
    };
    let body = match reply.to_bytes() {
      Ok(body) => body,
      Err(e) => {
        error!(error = %e, "Failed to encode reply.");
        return DeliveryOutcome::PublishFailed;
      }
    };
    match publisher.publish(reply_to, correlation_id, body).await {
      Ok(()) => DeliveryOutcome::Replied,
      Err(e) => {
        error!(error = %e, reply_to, "Failed to publish reply.");
        DeliveryOutcome::PublishFailed
      }
    }
  }

  /// Decodes and executes a request body. Returns the request's own `id`
  /// alongside the reply.
  pub async fn process(&self, body: &[u8]) -> (Option<String>, Reply) {
    let (raw, command) = match Command::decode(body) {
      Ok(decoded) => decoded,
      Err(e) => {
        warn!(error = %e, "Rejecting undecodable request.");
        return (None, Reply::error(e.to_string()));
      }
    };
    info!(pattern = command.pattern(), request_id = raw.id.as_deref().unwrap_or("-"), "Request received.");
    (raw.id, self.execute(command).await)
  }

  /// Runs one command against the shop and wraps the result.
  pub async fn execute(&self, command: Command) -> Reply {
    let pattern = command.pattern();
    let shop = self.shop.as_ref();

    let result = match command {
      Command::CreateProduct(p) => encode("Product created", shop.create_product(&p.name).await),
      Command::GetProduct(p) => encode("Product retrieved", shop.get_product(&p.name).await),
      Command::GetProducts => encode("Products retrieved", shop.list_products().await),
      Command::UpdateProduct(p) => encode("Product updated", shop.rename_product(&p.name, &p.new_name).await),
      Command::DeleteProduct(p) => done("Product deleted", shop.delete_product(&p.name).await),
      Command::CreateUser(u) => encode("User created", shop.create_user(&u.username).await),
      Command::GetUser(u) => encode("User retrieved", shop.get_user(&u.username).await),
      Command::GetUsers => encode("Users retrieved", shop.list_users().await),
      Command::EditUser(u) => encode("User updated", shop.rename_user(&u.username, &u.new_username).await),
      Command::DeleteUser(u) => done("User deleted", shop.delete_user(&u.username).await),
      Command::AddToCart(a) => encode(
        "Cart item added",
        shop.add_to_cart(&a.username, &a.product_name, a.quantity).await,
      ),
      Command::RemoveFromCart(r) => encode(
        "Cart item removed",
        shop.remove_from_cart(&r.username, r.cart_item_id).await,
      ),
      Command::GetCartItem(c) => encode("Cart item retrieved", shop.get_cart_item(c.id).await),
      Command::UpdateCartItem(u) => encode(
        "Cart item updated",
        shop.update_quantity(u.id, u.quantity, u.username.as_deref()).await,
      ),
      Command::DeleteCartItem(c) => done("Cart item deleted", shop.delete_cart_item(c.id).await),
      Command::CreateOrder(o) => encode("Order created", shop.create_order(&o.username, &o.cart_item_ids).await),
      Command::GetOrder(o) => encode("Order retrieved", shop.get_order(o.id).await),
      Command::GetOrders(u) => encode("Orders retrieved", shop.list_orders(&u.username).await),
    };

    match result {
      Ok(reply) => reply,
      Err(e) => {
        warn!(pattern, kind = e.kind(), error = %e, "Request failed.");
        Reply::error(e.to_string())
      }
    }
  }
}

fn encode<T: Serialize>(message: &str, result: Result<T, ShopError>) -> Result<Reply, ShopError> {
  let value = result?;
  Ok(Reply::ok(message, &value).unwrap_or_else(|e| {
    error!(error = %e, "Failed to encode reply data.");
    Reply::error(format!("failed to encode reply data: {e}"))
  }))
}

fn done(message: &str, result: Result<(), ShopError>) -> Result<Reply, ShopError> {
  result.map(|()| Reply::done(message))
}
