//! Concrete collectors run by the sampler.
//!
//! CPU, memory, swap, load average and process RSS come from `sysinfo`.
//! Page faults, the CPU mode split and TCP statistics are parsed from files
//! under a configurable proc root. Store gauges use the file size and a
//! read-only inspection connection that lives as long as the sampler.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use habitrack_core::metrics::Gauge;
use rusqlite::{Connection, OpenFlags};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::obs::procfs::{self, CpuTimes};
use crate::obs::sampler::{Collector, SampleError};
use crate::obs::HostGauges;

const MEGABYTE: f64 = 1024.0 * 1024.0;

fn read(path: &Path) -> Result<String, SampleError> {
    fs::read_to_string(path).map_err(|source| SampleError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn ensure_supported() -> Result<(), SampleError> {
    if sysinfo::IS_SUPPORTED_SYSTEM {
        Ok(())
    } else {
        Err(SampleError::Unsupported("sysinfo"))
    }
}

/// Build every collector in the order they run each tick.
pub fn standard(proc_root: PathBuf, db_path: PathBuf, g: &HostGauges) -> Vec<Box<dyn Collector>> {
    let inspector = Arc::new(Mutex::new(StoreInspector::new(db_path.clone())));
    let collectors: Vec<Box<dyn Collector>> = vec![
        Box::new(CpuUsage::new(g.cpu_percent.clone())) as Box<dyn Collector>,
        Box::new(CpuModes::new(&proc_root, g.cpu_mode_percent.clone())),
        Box::new(ProcessRss::new(g.process_rss_megabytes.clone())),
        Box::new(ProcFileGauge::major_faults(&proc_root, g.process_major_faults.clone())),
        Box::new(SwapUsed::new(g.swap_used_megabytes.clone())),
        Box::new(LoadAverage::new(g.load1.clone())),
        Box::new(MemoryUsed::new(g.ram_percent.clone(), g.ram_megabytes.clone())),
        Box::new(ProcFileGauge::tcp_curr_estab(&proc_root, g.tcp_curr_estab.clone())),
        Box::new(ProcFileGauge::tcp_retrans_segs(&proc_root, g.tcp_retrans_segs.clone())),
        Box::new(ProcFileGauge::tcp_inuse(&proc_root, g.tcp_inuse.clone())),
        Box::new(DbFileSize::new(db_path, g.sqlite_db_size.clone())),
        Box::new(SqliteCacheSize::new(Arc::clone(&inspector), g.sqlite_cache_pages.clone())),
        Box::new(SqliteOverflowPages::new(inspector, g.sqlite_overflow_pages.clone())),
    ];
    collectors
}

// --------------------
// sysinfo-backed
// --------------------

pub struct CpuUsage {
    sys: System,
    gauge: Gauge,
}

impl CpuUsage {
    pub fn new(gauge: Gauge) -> Self {
        Self { sys: System::new(), gauge }
    }
}

impl Collector for CpuUsage {
    fn name(&self) -> &'static str {
        "cpu_usage"
    }

    // The first reading after startup is 0; usage is a delta between refreshes.
    fn collect(&mut self) -> Result<(), SampleError> {
        ensure_supported()?;
        self.sys.refresh_cpu_usage();
        self.gauge.set(&[], f64::from(self.sys.global_cpu_usage()));
        Ok(())
    }
}

pub struct ProcessRss {
    sys: System,
    pid: Option<Pid>,
    gauge: Gauge,
}

impl ProcessRss {
    pub fn new(gauge: Gauge) -> Self {
        Self {
            sys: System::new(),
            pid: sysinfo::get_current_pid().ok(),
            gauge,
        }
    }
}

impl Collector for ProcessRss {
    fn name(&self) -> &'static str {
        "process_rss"
    }

    fn collect(&mut self) -> Result<(), SampleError> {
        ensure_supported()?;
        let pid = self.pid.ok_or(SampleError::Unsupported("current pid"))?;
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        let process = self
            .sys
            .process(pid)
            .ok_or_else(|| SampleError::Parse(format!("process {pid} not visible")))?;
        self.gauge.set(&[], process.memory() as f64 / MEGABYTE);
        Ok(())
    }
}

pub struct SwapUsed {
    sys: System,
    gauge: Gauge,
}

impl SwapUsed {
    pub fn new(gauge: Gauge) -> Self {
        Self { sys: System::new(), gauge }
    }
}

impl Collector for SwapUsed {
    fn name(&self) -> &'static str {
        "swap_used"
    }

    fn collect(&mut self) -> Result<(), SampleError> {
        ensure_supported()?;
        self.sys.refresh_memory();
        self.gauge.set(&[], self.sys.used_swap() as f64 / MEGABYTE);
        Ok(())
    }
}

pub struct LoadAverage {
    gauge: Gauge,
}

impl LoadAverage {
    pub fn new(gauge: Gauge) -> Self {
        Self { gauge }
    }
}

impl Collector for LoadAverage {
    fn name(&self) -> &'static str {
        "load_average"
    }

    fn collect(&mut self) -> Result<(), SampleError> {
        ensure_supported()?;
        self.gauge.set(&[], System::load_average().one);
        Ok(())
    }
}

pub struct MemoryUsed {
    sys: System,
    percent: Gauge,
    megabytes: Gauge,
}

impl MemoryUsed {
    pub fn new(percent: Gauge, megabytes: Gauge) -> Self {
        Self {
            sys: System::new(),
            percent,
            megabytes,
        }
    }
}

impl Collector for MemoryUsed {
    fn name(&self) -> &'static str {
        "memory_used"
    }

    fn collect(&mut self) -> Result<(), SampleError> {
        ensure_supported()?;
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        if total == 0 {
            return Err(SampleError::Unsupported("total memory reported as 0"));
        }
        let used = self.sys.used_memory();
        self.percent.set(&[], used as f64 * 100.0 / total as f64);
        self.megabytes.set(&[], used as f64 / MEGABYTE);
        Ok(())
    }
}

// --------------------
// proc-file backed
// --------------------

/// CPU mode split (`user`, `system`) between consecutive ticks.
pub struct CpuModes {
    path: PathBuf,
    prev: CpuTimes,
    gauge: Gauge,
}

impl CpuModes {
    pub fn new(proc_root: &Path, gauge: Gauge) -> Self {
        Self {
            path: proc_root.join("stat"),
            prev: CpuTimes::default(),
            gauge,
        }
    }
}

impl Collector for CpuModes {
    fn name(&self) -> &'static str {
        "cpu_modes"
    }

    fn collect(&mut self) -> Result<(), SampleError> {
        let now = procfs::parse_cpu_times(&read(&self.path)?)?;
        let (user, system) = now.percent_since(&self.prev);
        self.prev = now;
        self.gauge.set(&[("mode", "user")], user);
        self.gauge.set(&[("mode", "system")], system);
        Ok(())
    }
}

/// One gauge fed by one file and one parser.
pub struct ProcFileGauge {
    name: &'static str,
    path: PathBuf,
    parse: fn(&str) -> Result<u64, SampleError>,
    gauge: Gauge,
}

impl ProcFileGauge {
    pub fn new(
        name: &'static str,
        path: PathBuf,
        parse: fn(&str) -> Result<u64, SampleError>,
        gauge: Gauge,
    ) -> Self {
        Self { name, path, parse, gauge }
    }

    pub fn major_faults(proc_root: &Path, gauge: Gauge) -> Self {
        Self::new("major_faults", proc_root.join("self/stat"), procfs::parse_major_faults, gauge)
    }

    pub fn tcp_curr_estab(proc_root: &Path, gauge: Gauge) -> Self {
        Self::new("tcp_curr_estab", proc_root.join("net/snmp"), |s| {
            procfs::parse_netstat_field(s, "Tcp:", "CurrEstab")
        }, gauge)
    }

    pub fn tcp_retrans_segs(proc_root: &Path, gauge: Gauge) -> Self {
        Self::new("tcp_retrans_segs", proc_root.join("net/snmp"), |s| {
            procfs::parse_netstat_field(s, "Tcp:", "RetransSegs")
        }, gauge)
    }

    pub fn tcp_inuse(proc_root: &Path, gauge: Gauge) -> Self {
        Self::new("tcp_inuse", proc_root.join("net/sockstat"), procfs::parse_sockstat_tcp_inuse, gauge)
    }
}

impl Collector for ProcFileGauge {
    fn name(&self) -> &'static str {
        self.name
    }

    fn collect(&mut self) -> Result<(), SampleError> {
        let value = (self.parse)(&read(&self.path)?)?;
        self.gauge.set(&[], value as f64);
        Ok(())
    }
}

// --------------------
// store-backed
// --------------------

pub struct DbFileSize {
    path: PathBuf,
    gauge: Gauge,
}

impl DbFileSize {
    pub fn new(path: PathBuf, gauge: Gauge) -> Self {
        Self { path, gauge }
    }
}

impl Collector for DbFileSize {
    fn name(&self) -> &'static str {
        "db_file_size"
    }

    fn collect(&mut self) -> Result<(), SampleError> {
        let meta = fs::metadata(&self.path).map_err(|source| SampleError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.gauge.set(&[], meta.len() as f64);
        Ok(())
    }
}

/// Read-only introspection connection, opened lazily and dropped after a
/// failed query so the next tick reconnects.
pub struct StoreInspector {
    path: PathBuf,
    conn: Option<Connection>,
}

impl StoreInspector {
    pub fn new(path: PathBuf) -> Self {
        Self { path, conn: None }
    }

    fn with_conn<T>(
        &mut self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, SampleError> {
        let conn = match self.conn.take() {
            Some(c) => c,
            None => Connection::open_with_flags(
                &self.path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
        };
        let out = f(&conn)?;
        self.conn = Some(conn);
        Ok(out)
    }

    /// `PRAGMA cache_size` in pages. Negative pragma values are KiB.
    pub fn cache_size_pages(&mut self) -> Result<i64, SampleError> {
        self.with_conn(|c| {
            let size: i64 = c.query_row("PRAGMA cache_size", [], |r| r.get(0))?;
            if size >= 0 {
                return Ok(size);
            }
            let page_size: i64 = c.query_row("PRAGMA page_size", [], |r| r.get(0))?;
            Ok(size.saturating_neg().saturating_mul(1024) / page_size.max(1))
        })
    }

    /// Overflow pages in the database file, from the `dbstat` virtual table.
    pub fn overflow_pages(&mut self) -> Result<i64, SampleError> {
        self.with_conn(|c| {
            c.query_row(
                "SELECT count(*) FROM dbstat WHERE pagetype = 'overflow'",
                [],
                |r| r.get(0),
            )
        })
    }
}

pub struct SqliteCacheSize {
    inspector: Arc<Mutex<StoreInspector>>,
    gauge: Gauge,
}

impl SqliteCacheSize {
    pub fn new(inspector: Arc<Mutex<StoreInspector>>, gauge: Gauge) -> Self {
        Self { inspector, gauge }
    }
}

impl Collector for SqliteCacheSize {
    fn name(&self) -> &'static str {
        "sqlite_cache_size"
    }

    fn collect(&mut self) -> Result<(), SampleError> {
        let pages = self
            .inspector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cache_size_pages()?;
        self.gauge.set(&[], pages as f64);
        Ok(())
    }
}

pub struct SqliteOverflowPages {
    inspector: Arc<Mutex<StoreInspector>>,
    gauge: Gauge,
}

impl SqliteOverflowPages {
    pub fn new(inspector: Arc<Mutex<StoreInspector>>, gauge: Gauge) -> Self {
        Self { inspector, gauge }
    }
}

impl Collector for SqliteOverflowPages {
    fn name(&self) -> &'static str {
        "sqlite_overflow_pages"
    }

    fn collect(&mut self) -> Result<(), SampleError> {
        let pages = self
            .inspector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .overflow_pages()?;
        self.gauge.set(&[], pages as f64);
        Ok(())
    }
}
