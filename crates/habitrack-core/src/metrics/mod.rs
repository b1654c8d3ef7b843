//! In-process metrics: registry, metric families, scoped timing.
//!
//! Metrics are stored as atomics keyed by label values in a `DashMap` and are
//! rendered in the Prometheus text exposition format on demand. There is no
//! push path and no history: every family holds only its current values.
//!
//! ```text
//! Registry ──register──▶ Counter / Gauge / Histogram handles (cheap clones)
//!     │                        │
//!     └──render()◀──────────── atomics per label set
//! ```

mod family;
mod registry;
mod timer;

pub use family::{Counter, Gauge, Histogram, DEFAULT_BUCKETS};
pub use registry::{Metric, MetricKind, Registry, CONTENT_TYPE};
pub use timer::{LatencyObserver, ScopedTimer};
