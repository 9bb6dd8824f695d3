use std::sync::Arc;
use std::time::Duration;

use async_channel::{Receiver, Sender, bounded};
use fluvio_future::future::timeout;
use fluvio_future::task::{spawn, spawn_task};
use futures_util::future::try_join_all;
use tracing::{debug, info, warn};

use crate::config::TransportConfig;
use crate::error::LoadError;
use crate::message::Batch;
use crate::producer_worker::{ProducerWorker, StopSignal};
use crate::stats_collector::{BatchCounters, StatsSnapshot};
use crate::transport::{BrokerClient, Connector};

/// One broker client and the counters of the producers running on it
pub struct Connection<C> {
    id: usize,
    client: C,
    counters: Arc<BatchCounters>,
}

impl<C: BrokerClient> Connection<C> {
    fn new(id: usize, client: C) -> Self {
        Self {
            id,
            client,
            counters: Arc::new(BatchCounters::default()),
        }
    }
}

/// Fixed set of connections created together at startup
pub struct ConnectionPool<C> {
    connections: Vec<Connection<C>>,
    stop: StopSignal,
    producers: usize,
    /// every producer task holds a clone, the channel closes once all of them exited
    running_tx: Option<Sender<()>>,
    running_rx: Receiver<()>,
}

impl<C: BrokerClient> ConnectionPool<C> {
    /// Connect `count` clients concurrently. Fails as soon as one of them fails.
    pub async fn create<T>(
        connector: Arc<T>,
        count: usize,
        config: &TransportConfig,
        brokers: &[String],
        stop: StopSignal,
    ) -> Result<Self, LoadError>
    where
        T: Connector<Client = C>,
    {
        info!("Connecting {} clients...", count);

        let setups = (0..count).map(|id| {
            let connector = connector.clone();
            let config = config.clone();
            let brokers = brokers.to_vec();
            spawn_task(async move {
                let client = connector
                    .connect(&brokers, &config)
                    .await
                    .map_err(|source| LoadError::Connect { client: id, source })?;
                info!(client = id, "Client connected");
                Ok::<_, LoadError>(Connection::new(id, client))
            })
        });
        let connections = try_join_all(setups).await?;

        let (running_tx, running_rx) = bounded(1);
        Ok(Self {
            connections,
            stop,
            producers: 0,
            running_tx: Some(running_tx),
            running_rx,
        })
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// number of producer loops launched so far
    pub fn producers(&self) -> usize {
        self.producers
    }

    /// Launch `producers_per_connection` send loops on every connection and
    /// return immediately. Every sender is created before the first loop starts.
    pub fn write(
        &mut self,
        producers_per_connection: usize,
        message: &str,
        topic: &str,
        batch_size: usize,
    ) -> Result<(), LoadError> {
        let Some(running_tx) = self.running_tx.clone() else {
            return Err(LoadError::ShutDown);
        };

        let batch = Batch::repeat(topic, message, batch_size);
        let mut workers = Vec::with_capacity(self.connections.len() * producers_per_connection);
        for connection in &self.connections {
            for producer_id in 0..producers_per_connection {
                let sender = connection
                    .client
                    .sender()
                    .map_err(|source| LoadError::Sender {
                        client: connection.id,
                        source,
                    })?;
                workers.push(ProducerWorker::new(
                    connection.id,
                    producer_id,
                    sender,
                    batch.clone(),
                    connection.counters.clone(),
                    self.stop.clone(),
                ));
            }
        }

        self.producers += workers.len();
        for worker in workers {
            let running = running_tx.clone();
            spawn(async move {
                worker.run().await;
                drop(running);
            });
        }
        info!(
            producers = self.producers,
            batch_size, "Producers started"
        );
        Ok(())
    }

    /// Sum and reset the counters of every connection. Each connection is
    /// harvested under its own lock, in pool order.
    pub fn stats(&self) -> StatsSnapshot {
        self.connections
            .iter()
            .fold(StatsSnapshot::default(), |total, connection| {
                total + connection.counters.harvest()
            })
    }

    /// Stop all producers and wait up to `wait` for them to exit.
    /// Returns false when some producers were still running at the deadline.
    pub async fn shutdown(&mut self, wait: Duration) -> bool {
        self.stop.stop();
        drop(self.running_tx.take());

        let running_rx = self.running_rx.clone();
        let drained = async move { while running_rx.recv().await.is_ok() {} };
        match timeout(wait, drained).await {
            Ok(()) => {
                debug!(producers = self.producers, "all producers stopped");
                true
            }
            Err(_) => {
                warn!(
                    "producers still running after {:?}, giving up waiting",
                    wait
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use fluvio_future::timer::sleep;

    use crate::config::TransportConfigBuilder;
    use crate::transport::fixture::{MemoryClient, MemoryConnector};

    use super::*;

    fn transport_config() -> TransportConfig {
        TransportConfigBuilder::default().build().expect("config")
    }

    async fn pool(connector: MemoryConnector, count: usize) -> ConnectionPool<MemoryClient> {
        ConnectionPool::create(
            Arc::new(connector),
            count,
            &transport_config(),
            &["localhost:9092".to_string()],
            StopSignal::default(),
        )
        .await
        .expect("pool")
    }

    #[fluvio_future::test]
    async fn test_create_connects_every_client() {
        let connector = MemoryConnector::new();
        let broker = connector.broker.clone();
        let pool = pool(connector, 4).await;
        assert_eq!(pool.len(), 4);
        assert_eq!(broker.connects.load(Ordering::SeqCst), 4);
    }

    #[fluvio_future::test]
    async fn test_create_fails_when_a_client_fails() {
        let connector = MemoryConnector {
            fail_connect: true,
            ..MemoryConnector::new()
        };
        let result = ConnectionPool::create(
            Arc::new(connector),
            3,
            &transport_config(),
            &[],
            StopSignal::default(),
        )
        .await;
        assert!(matches!(result, Err(LoadError::Connect { .. })));
    }

    #[fluvio_future::test]
    async fn test_sender_failure_starts_no_producer() {
        let connector = MemoryConnector {
            fail_sender: true,
            ..MemoryConnector::new()
        };
        let broker = connector.broker.clone();
        let mut pool = pool(connector, 2).await;

        let result = pool.write(3, "message", "topic", 10);
        assert!(matches!(result, Err(LoadError::Sender { client: 0, .. })));
        assert_eq!(pool.producers(), 0);

        sleep(Duration::from_millis(20)).await;
        assert_eq!(broker.batches(), 0);
    }

    #[fluvio_future::test]
    async fn test_stats_reset_on_read() {
        let connector = MemoryConnector::new();
        let mut pool = pool(connector, 2).await;
        pool.write(2, "message", "topic", 10).expect("write");
        sleep(Duration::from_millis(20)).await;
        assert!(pool.shutdown(Duration::from_secs(5)).await);

        let first = pool.stats();
        assert!(first.sent > 0);
        assert_eq!(pool.stats(), StatsSnapshot::default());
    }

    #[fluvio_future::test]
    async fn test_no_lost_or_duplicated_counts() {
        let connector = MemoryConnector {
            failures_per_batch: 3,
            ..MemoryConnector::new()
        };
        let broker = connector.broker.clone();
        let mut pool = pool(connector, 3).await;
        pool.write(4, "message", "topic", 20).expect("write");
        assert_eq!(pool.producers(), 12);
        assert_eq!(broker.senders.load(Ordering::SeqCst), 12);

        // harvest while producers are running
        let mut total = StatsSnapshot::default();
        for _ in 0..10 {
            sleep(Duration::from_millis(5)).await;
            total += pool.stats();
        }
        assert!(pool.shutdown(Duration::from_secs(5)).await);
        total += pool.stats();

        assert!(broker.batches() > 0);
        assert_eq!(total.sent + total.errors, broker.messages());
        assert_eq!(total.errors, broker.failed());
        assert_eq!(total.errors, broker.batches() * 3);
    }

    #[fluvio_future::test]
    async fn test_many_producers_share_one_connection() {
        let connector = MemoryConnector {
            failures_per_batch: 2,
            ..MemoryConnector::new()
        };
        let broker = connector.broker.clone();
        let mut pool = pool(connector, 1).await;
        pool.write(50, "message", "topic", 10).expect("write");
        assert_eq!(pool.producers(), 50);

        let mut total = StatsSnapshot::default();
        for _ in 0..20 {
            sleep(Duration::from_millis(2)).await;
            total += pool.stats();
        }
        assert!(pool.shutdown(Duration::from_secs(5)).await);
        total += pool.stats();

        assert!(broker.batches() > 0);
        assert_eq!(total.sent + total.errors, broker.messages());
        assert_eq!(total.sent, broker.batches() * 8);
        assert_eq!(total.errors, broker.batches() * 2);
    }

    #[fluvio_future::test]
    async fn test_write_after_shutdown_is_rejected() {
        let mut pool = pool(MemoryConnector::new(), 1).await;
        assert!(pool.shutdown(Duration::from_millis(100)).await);
        assert!(matches!(
            pool.write(1, "message", "topic", 1),
            Err(LoadError::ShutDown)
        ));
        assert_eq!(pool.producers(), 0);
    }
}
