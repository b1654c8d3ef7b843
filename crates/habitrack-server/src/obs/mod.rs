//! Operational telemetry for the service.
//!
//! - `metrics`    : the metric catalog registered at startup
//! - `middleware` : per-request count + latency
//! - `sampler`    : background loop over independent collectors
//! - `collectors` : host/process/store metric sources
//! - `procfs`     : parsers for the host statistics files

pub mod collectors;
pub mod metrics;
pub mod middleware;
pub mod procfs;
pub mod sampler;

pub use metrics::{AppMetrics, DbOp, HostGauges};
pub use sampler::{Collector, SampleError, Sampler, SamplerHandle};
