use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::config::TransportConfig;
use crate::error::{BatchFailure, TransportError};
use crate::message::Message;

use super::{BatchSender, BrokerClient, Connector};

/// Records everything the in-memory transport received
#[derive(Debug, Default)]
pub(crate) struct MemoryBroker {
    pub connects: AtomicUsize,
    pub senders: AtomicUsize,
    pub batches: AtomicU64,
    pub messages: AtomicU64,
    pub failed: AtomicU64,
}

impl MemoryBroker {
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> u64 {
        self.messages.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct MemoryConnector {
    pub broker: Arc<MemoryBroker>,
    pub fail_connect: bool,
    pub fail_sender: bool,
    /// messages rejected in every batch
    pub failures_per_batch: usize,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Client = MemoryClient;

    async fn connect(
        &self,
        _brokers: &[String],
        _config: &TransportConfig,
    ) -> Result<MemoryClient, TransportError> {
        if self.fail_connect {
            return Err(TransportError::Other("connection refused".to_string()));
        }
        self.broker.connects.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryClient {
            connector: self.clone(),
        })
    }
}

pub(crate) struct MemoryClient {
    connector: MemoryConnector,
}

impl BrokerClient for MemoryClient {
    type Sender = MemorySender;

    fn sender(&self) -> Result<MemorySender, TransportError> {
        if self.connector.fail_sender {
            return Err(TransportError::Sender("producer rejected".to_string()));
        }
        self.connector.broker.senders.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySender {
            broker: self.connector.broker.clone(),
            failures_per_batch: self.connector.failures_per_batch,
        })
    }
}

pub(crate) struct MemorySender {
    broker: Arc<MemoryBroker>,
    failures_per_batch: usize,
}

#[async_trait]
impl BatchSender for MemorySender {
    async fn send_batch(&self, batch: &[Message]) -> Result<(), BatchFailure> {
        futures_lite::future::yield_now().await;

        let failed = self.failures_per_batch.min(batch.len());
        self.broker.batches.fetch_add(1, Ordering::SeqCst);
        self.broker
            .messages
            .fetch_add(batch.len() as u64, Ordering::SeqCst);
        self.broker.failed.fetch_add(failed as u64, Ordering::SeqCst);

        if failed == 0 {
            Ok(())
        } else {
            Err(BatchFailure::new(failed, "injected failure"))
        }
    }
}
