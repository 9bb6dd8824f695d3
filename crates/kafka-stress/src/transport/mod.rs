//! Broker transport used by the load generator.
//!
//! A [`Connector`] opens one client per pool connection, each client hands out
//! one [`BatchSender`] per producer loop. Clients and senders must be safe to
//! use from several tasks at once.

pub mod kafka;

#[cfg(test)]
pub(crate) mod fixture;

use async_trait::async_trait;

use crate::config::TransportConfig;
use crate::error::{BatchFailure, TransportError};
use crate::message::Message;

pub use kafka::KafkaConnector;

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Client: BrokerClient;

    /// open a client against `brokers`, resolves once the brokers answered
    async fn connect(
        &self,
        brokers: &[String],
        config: &TransportConfig,
    ) -> Result<Self::Client, TransportError>;
}

pub trait BrokerClient: Send + Sync + 'static {
    type Sender: BatchSender;

    /// create a sender bound to this client
    fn sender(&self) -> Result<Self::Sender, TransportError>;
}

#[async_trait]
pub trait BatchSender: Send + Sync + 'static {
    /// Send every message of `batch`, resolving once each of them was
    /// acknowledged or rejected. Returns the number of rejected messages on
    /// partial or total failure.
    async fn send_batch(&self, batch: &[Message]) -> Result<(), BatchFailure>;
}
