use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace};

use crate::message::Batch;
use crate::stats_collector::BatchCounters;
use crate::transport::BatchSender;

/// Flag raised once to stop every producer of a run
#[derive(Debug, Default, Clone)]
pub struct StopSignal {
    end: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn stop(&self) {
        self.end.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.end.load(Ordering::Relaxed)
    }
}

/// Send loop: submits the same batch over and over until stopped.
pub struct ProducerWorker<S> {
    client_id: usize,
    producer_id: usize,
    sender: S,
    batch: Batch,
    counters: Arc<BatchCounters>,
    stop: StopSignal,
}

impl<S: BatchSender> ProducerWorker<S> {
    pub fn new(
        client_id: usize,
        producer_id: usize,
        sender: S,
        batch: Batch,
        counters: Arc<BatchCounters>,
        stop: StopSignal,
    ) -> Self {
        Self {
            client_id,
            producer_id,
            sender,
            batch,
            counters,
            stop,
        }
    }

    /// Runs until the stop signal is raised, returns the number of batches sent.
    pub async fn run(self) -> u64 {
        debug!(
            client = self.client_id,
            producer = self.producer_id,
            "producer started"
        );

        let mut batches = 0;
        while !self.stop.is_stopped() {
            let failed = match self.sender.send_batch(&self.batch).await {
                Ok(()) => 0,
                Err(failure) => {
                    trace!(
                        client = self.client_id,
                        producer = self.producer_id,
                        %failure,
                        "batch failed"
                    );
                    failure.failed
                }
            };
            self.counters.record(self.batch.len(), failed);
            batches += 1;
        }

        debug!(
            client = self.client_id,
            producer = self.producer_id,
            batches,
            "producer stopped"
        );
        batches
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fluvio_future::task::spawn_task;
    use fluvio_future::timer::sleep;

    use crate::config::TransportConfigBuilder;
    use crate::stats_collector::StatsSnapshot;
    use crate::transport::fixture::MemoryConnector;
    use crate::transport::{BrokerClient, Connector};

    use super::*;

    #[fluvio_future::test]
    async fn test_worker_accounts_every_batch() {
        let connector = MemoryConnector {
            failures_per_batch: 2,
            ..MemoryConnector::new()
        };
        let broker = connector.broker.clone();
        let config = TransportConfigBuilder::default().build().expect("config");
        let client = connector.connect(&[], &config).await.expect("client");

        let counters = Arc::new(BatchCounters::default());
        let stop = StopSignal::default();
        let worker = ProducerWorker::new(
            0,
            0,
            client.sender().expect("sender"),
            Batch::repeat("topic", "message", 10),
            counters.clone(),
            stop.clone(),
        );

        let handle = spawn_task(worker.run());
        sleep(Duration::from_millis(50)).await;
        stop.stop();
        let batches = handle.await;

        assert!(batches > 0);
        assert_eq!(broker.batches(), batches);
        assert_eq!(
            counters.harvest(),
            StatsSnapshot::new(batches * 8, batches * 2)
        );
        assert_eq!(broker.failed(), batches * 2);
    }

    #[fluvio_future::test]
    async fn test_stopped_worker_sends_nothing() {
        let connector = MemoryConnector::new();
        let broker = connector.broker.clone();
        let config = TransportConfigBuilder::default().build().expect("config");
        let client = connector.connect(&[], &config).await.expect("client");

        let stop = StopSignal::default();
        stop.stop();
        let counters = Arc::new(BatchCounters::default());
        let worker = ProducerWorker::new(
            0,
            0,
            client.sender().expect("sender"),
            Batch::repeat("topic", "message", 10),
            counters.clone(),
            stop,
        );

        assert_eq!(worker.run().await, 0);
        assert_eq!(broker.batches(), 0);
        assert!(counters.harvest().is_empty());
    }
}
