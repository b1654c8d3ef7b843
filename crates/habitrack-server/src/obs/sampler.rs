//! Background host/process/store sampler.
//!
//! One long-lived task, started at boot, runs an ordered list of collectors
//! every interval. Each collector is its own failure boundary: an error (or
//! panic) is logged with the collector's name, its gauge keeps the last good
//! value, and the remaining collectors still run. The loop only ends when the
//! owning [`SamplerHandle`] is shut down or the runtime goes away.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::SamplerSection;
use crate::obs::collectors;
use crate::obs::HostGauges;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse: {0}")]
    Parse(String),
    #[error("unsupported on this host: {0}")]
    Unsupported(&'static str),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// One independently guarded metric source.
pub trait Collector: Send {
    fn name(&self) -> &'static str;
    fn collect(&mut self) -> Result<(), SampleError>;
}

/// Outcome of a single tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub collected: usize,
    pub failed: Vec<&'static str>,
}

pub struct Sampler {
    interval: Duration,
    collectors: Vec<Box<dyn Collector>>,
}

impl Sampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            collectors: Vec::new(),
        }
    }

    /// The full collector set, in collection order.
    pub fn standard(cfg: &SamplerSection, db_path: &str, gauges: &HostGauges) -> Self {
        Self {
            interval: Duration::from_millis(cfg.interval_ms),
            collectors: collectors::standard(
                PathBuf::from(&cfg.proc_root),
                PathBuf::from(db_path),
                gauges,
            ),
        }
    }

    pub fn push(&mut self, collector: impl Collector + 'static) {
        self.collectors.push(Box::new(collector));
    }

    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run every collector once.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        for c in self.collectors.iter_mut() {
            let name = c.name();
            match panic::catch_unwind(AssertUnwindSafe(|| c.collect())) {
                Ok(Ok(())) => report.collected += 1,
                Ok(Err(e)) => {
                    tracing::warn!(collector = name, error = %e, "metric collection failed");
                    report.failed.push(name);
                }
                Err(_) => {
                    tracing::error!(collector = name, "metric collector panicked");
                    report.failed.push(name);
                }
            }
        }
        report
    }

    /// Spawn the sampling loop onto the current runtime.
    pub fn spawn(self) -> SamplerHandle {
        let interval = self.interval;
        let task = tokio::spawn(self.run());
        tracing::info!(interval_ms = interval.as_millis() as u64, "sampler started");
        SamplerHandle { task }
    }

    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = self.tick();
            tracing::debug!(collected = report.collected, failed = report.failed.len(), "sampler tick");
        }
    }
}

/// Owner of the running sampler task.
pub struct SamplerHandle {
    task: JoinHandle<()>,
}

impl SamplerHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the loop and wait for the task to unwind.
    pub async fn shutdown(self) {
        self.task.abort();
        let _ = self.task.await;
        tracing::info!("sampler stopped");
    }
}
