// cartflow/src/rpc/mod.rs

//! Message-queue transport, independent of the broker client.

pub mod command;
pub mod dispatcher;
pub mod envelope;

pub use command::{Command, DecodeError};
pub use dispatcher::{DeliveryOutcome, Dispatcher, InboundDelivery, ReplyPublisher, DEFAULT_DEADLINE};
pub use envelope::{Outcome, RawRequest, Reply};
