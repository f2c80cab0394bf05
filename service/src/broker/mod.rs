// cart_service/src/broker/mod.rs

//! Queue consumer for the request/reply RPC transport.

pub mod adapter;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use adapter::{AmqpDelivery, ChannelPublisher};
use cartflow::rpc::Dispatcher;
use futures_util::StreamExt;
use lapin::options::{BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties};
use tracing::{error, info, instrument, warn};

const CONSUMER_TAG: &str = "cart_service";

/// Consumes the RPC queue until the connection drops. Deliveries are handled
/// one at a time, each acknowledged exactly once by the dispatcher.
#[instrument(name = "broker::run_consumer", skip_all, fields(queue = %config.rpc_queue))]
pub async fn run_consumer(config: &AppConfig, dispatcher: Dispatcher) -> Result<()> {
  let connection = Connection::connect(&config.amqp_url, ConnectionProperties::default()).await?;
  let channel = connection.create_channel().await?;

  channel
    .queue_declare(&config.rpc_queue, QueueDeclareOptions::default(), FieldTable::default())
    .await?;
  channel
    .basic_qos(config.rpc_prefetch, BasicQosOptions::default())
    .await?;

  let mut consumer = channel
    .basic_consume(
      &config.rpc_queue,
      CONSUMER_TAG,
      BasicConsumeOptions::default(),
      FieldTable::default(),
    )
    .await?;
  let publisher = ChannelPublisher::new(channel.clone());

  info!(
    prefetch = config.rpc_prefetch,
    deadline_secs = dispatcher.deadline().as_secs(),
    "Awaiting RPC requests."
  );

  while let Some(next) = consumer.next().await {
    let delivery = match next {
      Ok(delivery) => AmqpDelivery::new(delivery),
      Err(e) => {
        error!(error = %e, "Consumer stream failed.");
        return Err(AppError::from(e));
      }
    };
    let delivery_tag = delivery.delivery_tag();
    if let Err(e) = dispatcher.handle_delivery(&delivery, &publisher).await {
      // The broker redelivers unacknowledged messages once the channel closes.
      warn!(delivery_tag, error = %e, "Failed to acknowledge delivery.");
    }
  }

  warn!("Consumer stream ended.");
  Ok(())
}
