// cart_service/src/broker/adapter.rs

//! lapin types behind the dispatcher's delivery and publisher traits.

use async_trait::async_trait;
use cartflow::rpc::{InboundDelivery, ReplyPublisher};
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicPublishOptions};
use lapin::{BasicProperties, Channel};

pub struct AmqpDelivery {
  inner: Delivery,
}

impl AmqpDelivery {
  pub fn new(inner: Delivery) -> Self {
    Self { inner }
  }

  pub fn delivery_tag(&self) -> u64 {
    self.inner.delivery_tag
  }
}

#[async_trait]
impl InboundDelivery for AmqpDelivery {
  fn body(&self) -> &[u8] {
    &self.inner.data
  }

  fn reply_to(&self) -> Option<&str> {
    self.inner.properties.reply_to().as_ref().map(|s| s.as_str())
  }

  fn correlation_id(&self) -> Option<&str> {
    self.inner.properties.correlation_id().as_ref().map(|s| s.as_str())
  }

  async fn ack(&self) -> anyhow::Result<()> {
    self.inner.acker.ack(BasicAckOptions::default()).await?;
    Ok(())
  }
}

/// Publishes replies on the default exchange, routed by the `reply_to` queue name.
pub struct ChannelPublisher {
  channel: Channel,
}

impl ChannelPublisher {
  pub fn new(channel: Channel) -> Self {
    Self { channel }
  }
}

#[async_trait]
impl ReplyPublisher for ChannelPublisher {
  async fn publish(&self, reply_to: &str, correlation_id: Option<&str>, body: Vec<u8>) -> anyhow::Result<()> {
    let mut properties = BasicProperties::default().with_content_type("application/json".into());
    if let Some(correlation_id) = correlation_id {
      properties = properties.with_correlation_id(correlation_id.into());
    }
    self
      .channel
      .basic_publish("", reply_to, BasicPublishOptions::default(), &body, properties)
      .await?
      .await?;
    Ok(())
  }
}
