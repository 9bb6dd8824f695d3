use std::sync::Arc;
use std::time::{Duration, Instant};

use fluvio_future::timer::sleep;
use tracing::{debug, info};

use crate::config::LoadConfig;
use crate::connection_pool::ConnectionPool;
use crate::error::LoadError;
use crate::producer_worker::StopSignal;
use crate::stats_collector::{Progress, Reporter, RunOutcome, RunSummary};
use crate::transport::Connector;

/// Drives a run: connects the pool, starts the producers and reports until
/// the message budget is reached or the run is stopped.
pub struct LoadDriver<T> {
    config: LoadConfig,
    connector: Arc<T>,
    stop: StopSignal,
}

impl<T: Connector> LoadDriver<T> {
    pub fn new(config: LoadConfig, connector: T) -> Self {
        Self {
            config,
            connector: Arc::new(connector),
            stop: StopSignal::default(),
        }
    }

    /// Signal observed by the producers and the report loop. Raising it ends
    /// the run at the next report.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub async fn run(self) -> Result<RunSummary, LoadError> {
        let config = &self.config;
        config.validate()?;
        debug!(?config, "starting load");

        let transport = config.transport_config()?;
        let mut pool = ConnectionPool::create(
            self.connector.clone(),
            config.clients,
            &transport,
            &config.broker_list(),
            self.stop.clone(),
        )
        .await?;
        pool.write(
            config.producers_per_client,
            &config.message,
            &config.topic,
            config.batch_size,
        )?;

        let mut reporter = Reporter::new(config.messages_to_send, config.report_interval)
            .map_err(|err| LoadError::InvalidConfig(err.to_string()))?;
        let start = Instant::now();
        let mut tick: u32 = 0;
        let outcome = loop {
            tick = tick.saturating_add(1);
            sleep(until_tick(start, config.report_interval, tick)).await;
            if reporter.record(pool.stats()) == Progress::Done {
                break RunOutcome::Completed;
            }
            if self.stop.is_stopped() {
                info!("Interrupted, stopping producers");
                break RunOutcome::Interrupted;
            }
        };

        pool.shutdown(config.shutdown_timeout).await;
        Ok(reporter.finish(outcome))
    }
}

/// Time left until report `tick`, counted from `start`. Ticks are fixed
/// multiples of `interval` so harvest and logging time does not shift them.
fn until_tick(start: Instant, interval: Duration, tick: u32) -> Duration {
    match start.checked_add(interval.saturating_mul(tick)) {
        Some(deadline) => deadline.saturating_duration_since(Instant::now()),
        None => interval,
    }
}
