//! Scoped latency observation.
//!
//! A `ScopedTimer` records the wall-clock time between its creation and its
//! drop into one histogram series. The observation happens exactly once: on
//! explicit `stop`, or in `Drop` on every other exit path (early return, `?`,
//! panic unwinding, future cancellation).

use std::sync::Arc;
use std::time::Instant;

use super::family::{Histogram, HistogramCell};

pub struct ScopedTimer {
    histogram: Histogram,
    cell: Option<Arc<HistogramCell>>,
    start: Option<Instant>,
}

impl ScopedTimer {
    pub(crate) fn new(histogram: Histogram, cell: Option<Arc<HistogramCell>>) -> Self {
        Self {
            histogram,
            cell,
            start: Some(Instant::now()),
        }
    }

    /// Seconds since the scope was entered.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.map(|s| s.elapsed().as_secs_f64()).unwrap_or(0.0)
    }

    /// Observe now and return the recorded seconds. Drop becomes a no-op.
    pub fn stop(mut self) -> f64 {
        self.record()
    }

    fn record(&mut self) -> f64 {
        let Some(start) = self.start.take() else { return 0.0 };
        let secs = start.elapsed().as_secs_f64();
        if let Some(cell) = &self.cell {
            cell.observe(self.histogram.bounds(), secs);
        }
        secs
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        self.record();
    }
}

/// Times operations of a given kind into a histogram with one label dimension.
///
/// `observe("read")` on an observer built over `db_query_latency_seconds{operation}`
/// yields a scope that lands in the `operation="read"` series when it ends.
#[derive(Debug, Clone)]
pub struct LatencyObserver {
    histogram: Histogram,
    label: &'static str,
}

impl LatencyObserver {
    pub fn new(histogram: Histogram, label: &'static str) -> Self {
        Self { histogram, label }
    }

    pub fn observe(&self, kind: &str) -> ScopedTimer {
        self.histogram.start_timer(&[(self.label, kind)])
    }

    /// Run `f` inside an observation scope and hand its result back untouched.
    pub fn time<T>(&self, kind: &str, f: impl FnOnce() -> T) -> T {
        let _scope = self.observe(kind);
        f()
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }
}
