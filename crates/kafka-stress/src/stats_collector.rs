use std::fmt::{self, Display, Formatter};
use std::ops::{Add, AddAssign};
use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use tracing::info;

const HIST_PRECISION: u8 = 3;

/// Sent and failed message counts over one reporting window
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub sent: u64,
    pub errors: u64,
}

impl StatsSnapshot {
    pub fn new(sent: u64, errors: u64) -> Self {
        Self { sent, errors }
    }

    pub fn is_empty(&self) -> bool {
        self.sent == 0 && self.errors == 0
    }
}

impl Add for StatsSnapshot {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            sent: self.sent + other.sent,
            errors: self.errors + other.errors,
        }
    }
}

impl AddAssign for StatsSnapshot {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// Counter pair of a single connection, shared by all of its producers.
#[derive(Debug, Default)]
pub struct BatchCounters {
    counts: Mutex<StatsSnapshot>,
}

impl BatchCounters {
    /// Account one batch outcome. `failed` is clamped to the batch size.
    pub fn record(&self, batch_size: usize, failed: usize) {
        let failed = failed.min(batch_size) as u64;
        let sent = batch_size as u64 - failed;
        let mut counts = self.counts.lock();
        counts.sent += sent;
        counts.errors += failed;
    }

    /// Read and zero the pair under the same lock.
    pub fn harvest(&self) -> StatsSnapshot {
        std::mem::take(&mut *self.counts.lock())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Running,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The message budget was reached
    Completed,
    /// Stopped by the operator before reaching the budget
    Interrupted,
}

/// Aggregates snapshots into a running total and decides when the run is over.
pub struct Reporter {
    budget: u64,
    interval: Duration,
    total: StatsSnapshot,
    ticks: u64,
    started: Instant,
    throughput: Histogram<u64>,
}

impl Reporter {
    pub fn new(budget: u64, interval: Duration) -> Result<Self, hdrhistogram::CreationError> {
        Ok(Self {
            budget,
            interval,
            total: StatsSnapshot::default(),
            ticks: 0,
            started: Instant::now(),
            throughput: Histogram::new(HIST_PRECISION)?,
        })
    }

    pub fn total(&self) -> StatsSnapshot {
        self.total
    }

    pub fn record(&mut self, snapshot: StatsSnapshot) -> Progress {
        self.ticks += 1;
        self.total += snapshot;

        let sent_rate = per_second(snapshot.sent, self.interval);
        let error_rate = per_second(snapshot.errors, self.interval);
        self.throughput.saturating_record(sent_rate);
        info!("Sent: {} msg/s; Error: {}/s", sent_rate, error_rate);

        if self.total.sent >= self.budget {
            info!("Done, sent a total of {} messages", self.total.sent);
            Progress::Done
        } else {
            Progress::Running
        }
    }

    pub fn finish(self, outcome: RunOutcome) -> RunSummary {
        RunSummary {
            outcome,
            total: self.total,
            ticks: self.ticks,
            elapsed: self.started.elapsed(),
            rate_max: self.throughput.max(),
            rate_median: self.throughput.value_at_quantile(0.5),
            rate_min: self.throughput.min(),
        }
    }
}

fn per_second(count: u64, interval: Duration) -> u64 {
    if interval.is_zero() {
        return count;
    }
    (count as f64 / interval.as_secs_f64()).round() as u64
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub total: StatsSnapshot,
    pub ticks: u64,
    pub elapsed: Duration,
    pub rate_max: u64,
    pub rate_median: u64,
    pub rate_min: u64,
}

impl RunSummary {
    pub fn average_rate(&self) -> u64 {
        per_second(self.total.sent, self.elapsed)
    }

    pub fn log(&self) {
        for line in self.to_string().lines() {
            info!("{line}");
        }
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let status = match self.outcome {
            RunOutcome::Completed => "completed",
            RunOutcome::Interrupted => "interrupted",
        };
        writeln!(
            f,
            "Run {status} after {:.1?}: {} sent, {} errors, {} msg/s on average",
            self.elapsed,
            self.total.sent,
            self.total.errors,
            self.average_rate()
        )?;
        writeln!(f, "Throughput Max, Median, Min")?;
        writeln!(f, "p1.00: {:>9} msg/s", self.rate_max)?;
        writeln!(f, "p0.50: {:>9} msg/s", self.rate_median)?;
        write!(f, "p0.00: {:>9} msg/s", self.rate_min)
    }
}
