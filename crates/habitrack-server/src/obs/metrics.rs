//! Metric catalog for the service.
//!
//! Every family is registered eagerly, before the first request, so a naming
//! clash aborts startup instead of surfacing mid-traffic. Names and label
//! dimensions here are a dashboard contract: keep them stable.

use std::sync::Arc;

use habitrack_core::error::Result;
use habitrack_core::metrics::{Counter, Gauge, Histogram, LatencyObserver, Registry};

/// Kind of storage call being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbOp {
    Read,
    Write,
}

impl DbOp {
    pub fn as_str(self) -> &'static str {
        match self {
            DbOp::Read => "read",
            DbOp::Write => "write",
        }
    }
}

/// Gauges written by the background sampler.
#[derive(Debug, Clone)]
pub struct HostGauges {
    pub cpu_percent: Gauge,
    pub cpu_mode_percent: Gauge,
    pub ram_percent: Gauge,
    pub ram_megabytes: Gauge,
    pub swap_used_megabytes: Gauge,
    pub load1: Gauge,
    pub process_rss_megabytes: Gauge,
    pub process_major_faults: Gauge,
    pub tcp_curr_estab: Gauge,
    pub tcp_retrans_segs: Gauge,
    pub tcp_inuse: Gauge,
    pub sqlite_db_size: Gauge,
    pub sqlite_cache_pages: Gauge,
    pub sqlite_overflow_pages: Gauge,
}

impl HostGauges {
    fn register(reg: &Registry) -> Result<Self> {
        Ok(Self {
            cpu_percent: reg.gauge("system_cpu_usage_percent", "Host CPU usage in percent", &[])?,
            cpu_mode_percent: reg.gauge(
                "cpu_usage_percent",
                "Share of CPU time spent per mode since the previous sample",
                &["mode"],
            )?,
            ram_percent: reg.gauge("system_ram_usage_percent", "Host memory used in percent", &[])?,
            ram_megabytes: reg.gauge("system_ram_usage_megabytes", "Host memory used in megabytes", &[])?,
            swap_used_megabytes: reg.gauge("node_swap_used_megabytes", "Swap used in megabytes", &[])?,
            load1: reg.gauge("node_load1", "1-minute load average", &[])?,
            process_rss_megabytes: reg.gauge(
                "process_resident_memory_megabytes",
                "Resident memory of this process in megabytes",
                &[],
            )?,
            process_major_faults: reg.gauge(
                "process_page_faults_major_total",
                "Major page faults of this process",
                &[],
            )?,
            tcp_curr_estab: reg.gauge("node_netstat_tcp_CurrEstab", "Established TCP connections", &[])?,
            tcp_retrans_segs: reg.gauge("node_netstat_Tcp_RetransSegs", "Retransmitted TCP segments", &[])?,
            tcp_inuse: reg.gauge("node_sockstat_TCP_inuse", "TCP sockets in use", &[])?,
            sqlite_db_size: reg.gauge("sqlite_db_size", "Database file size in bytes", &[])?,
            sqlite_cache_pages: reg.gauge(
                "sqlite_cache_size_pages",
                "Configured SQLite page cache limit in pages (PRAGMA cache_size), not pages in use",
                &[],
            )?,
            sqlite_overflow_pages: reg.gauge(
                "sqlite_cache_overflow_pages",
                "SQLite overflow pages in the database file",
                &[],
            )?,
        })
    }
}

/// Shared handles to every family the service writes.
#[derive(Debug, Clone)]
pub struct AppMetrics {
    registry: Arc<Registry>,
    pub http_requests: Counter,
    pub http_latency: Histogram,
    pub db: LatencyObserver,
    pub host: HostGauges,
}

impl AppMetrics {
    /// Register the full catalog. Fails fast on any naming clash.
    pub fn register(registry: Arc<Registry>) -> Result<Self> {
        let http_requests = registry.counter(
            "http_requests_total",
            "Total HTTP requests",
            &["method", "endpoint"],
        )?;
        let http_latency = registry.histogram(
            "http_request_latency_seconds",
            "HTTP request latency in seconds",
            &["method", "endpoint"],
        )?;
        let db_latency = registry.histogram(
            "db_query_latency_seconds",
            "Database query latency in seconds",
            &["operation"],
        )?;
        let host = HostGauges::register(&registry)?;

        Ok(Self {
            registry,
            http_requests,
            http_latency,
            db: LatencyObserver::new(db_latency, "operation"),
            host,
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn render(&self) -> String {
        self.registry.render()
    }
}
