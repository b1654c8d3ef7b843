//! Metric families with dynamic labels.
//!
//! Each family owns a descriptor (name, help, declared label names) and a
//! `DashMap` from label values to atomic cells. Label values are resolved
//! against the declared names, so callers may pass pairs in any order but must
//! cover every declared dimension exactly once. A write with the wrong label
//! set is logged and dropped: metric writes never fail the caller.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use super::timer::ScopedTimer;

/// Default latency ladder in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Render a sample value the way Prometheus parsers expect it.
pub(crate) fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        format!("{v}")
    }
}

/// f64 stored as raw bits; `add` is a CAS loop so concurrent writers never lose updates.
#[derive(Debug, Default)]
pub(crate) struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(v: f64) -> Self {
        Self(AtomicU64::new(v.to_bits()))
    }

    pub(crate) fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    fn add(&self, delta: f64) {
        let mut cur = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(cur) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => cur = actual,
            }
        }
    }
}

/// Name, help text and declared label dimensions of a family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Desc {
    pub(crate) name: String,
    pub(crate) help: String,
    pub(crate) label_names: Vec<String>,
}

impl Desc {
    /// Resolve `(name, value)` pairs into values ordered like the declared names.
    fn series_key(&self, labels: &[(&str, &str)]) -> Option<Vec<String>> {
        if labels.len() != self.label_names.len() {
            tracing::warn!(metric = %self.name, expected = self.label_names.len(), got = labels.len(), "label arity mismatch; write dropped");
            return None;
        }
        let mut key = Vec::with_capacity(self.label_names.len());
        for name in &self.label_names {
            match labels.iter().find(|(k, _)| k == name) {
                Some((_, v)) => key.push((*v).to_string()),
                None => {
                    tracing::warn!(metric = %self.name, label = %name, "missing label; write dropped");
                    return None;
                }
            }
        }
        Some(key)
    }

    fn label_str(&self, values: &[String]) -> String {
        self.label_names
            .iter()
            .zip(values)
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn write_header(&self, kind: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", self.name, escape_help(&self.help));
        let _ = writeln!(out, "# TYPE {} {}", self.name, kind);
    }

    fn write_sample(&self, suffix: &str, labels: &str, value: &str, out: &mut String) {
        if labels.is_empty() {
            let _ = writeln!(out, "{}{} {}", self.name, suffix, value);
        } else {
            let _ = writeln!(out, "{}{}{{{}}} {}", self.name, suffix, labels, value);
        }
    }
}

/// Snapshot the map sorted by label values so output is stable within a run.
fn sorted<V, T>(map: &DashMap<Vec<String>, V>, f: impl Fn(&V) -> T) -> Vec<(Vec<String>, T)> {
    let mut rows: Vec<_> = map.iter().map(|r| (r.key().clone(), f(r.value()))).collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}

// --------------------
// Counter
// --------------------

#[derive(Debug)]
struct CounterInner {
    desc: Desc,
    map: DashMap<Vec<String>, AtomicU64>,
}

/// Monotonic counter family. Cloning shares the underlying cells.
#[derive(Debug, Clone)]
pub struct Counter {
    inner: Arc<CounterInner>,
}

impl Counter {
    pub(crate) fn new(desc: Desc) -> Self {
        let map = DashMap::new();
        if desc.label_names.is_empty() {
            map.insert(Vec::new(), AtomicU64::new(0));
        }
        Self { inner: Arc::new(CounterInner { desc, map }) }
    }

    pub(crate) fn desc(&self) -> &Desc {
        &self.inner.desc
    }

    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.inc_by(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn inc_by(&self, labels: &[(&str, &str)], v: u64) {
        let Some(key) = self.inner.desc.series_key(labels) else { return };
        let counter = self.inner.map.entry(key).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value, if the label set has been written.
    pub fn get(&self, labels: &[(&str, &str)]) -> Option<u64> {
        let key = self.inner.desc.series_key(labels)?;
        self.inner.map.get(&key).map(|c| c.load(Ordering::Relaxed))
    }

    /// Number of distinct label sets written so far.
    pub fn series_count(&self) -> usize {
        self.inner.map.len()
    }

    /// Render in Prometheus text exposition format.
    pub(crate) fn render(&self, out: &mut String) {
        let desc = &self.inner.desc;
        desc.write_header("counter", out);
        for (key, val) in sorted(&self.inner.map, |c| c.load(Ordering::Relaxed)) {
            desc.write_sample("", &desc.label_str(&key), &val.to_string(), out);
        }
    }
}

// --------------------
// Gauge
// --------------------

#[derive(Debug)]
struct GaugeInner {
    desc: Desc,
    map: DashMap<Vec<String>, AtomicF64>,
}

/// Last-value gauge family.
#[derive(Debug, Clone)]
pub struct Gauge {
    inner: Arc<GaugeInner>,
}

impl Gauge {
    pub(crate) fn new(desc: Desc) -> Self {
        let map = DashMap::new();
        if desc.label_names.is_empty() {
            map.insert(Vec::new(), AtomicF64::new(0.0));
        }
        Self { inner: Arc::new(GaugeInner { desc, map }) }
    }

    pub(crate) fn desc(&self) -> &Desc {
        &self.inner.desc
    }

    /// Overwrite the value.
    pub fn set(&self, labels: &[(&str, &str)], v: f64) {
        let Some(key) = self.inner.desc.series_key(labels) else { return };
        self.inner.map.entry(key).or_default().store(v);
    }

    /// Add an arbitrary signed delta.
    pub fn add(&self, labels: &[(&str, &str)], v: f64) {
        let Some(key) = self.inner.desc.series_key(labels) else { return };
        self.inner.map.entry(key).or_default().add(v);
    }

    /// Current value, if the label set has been written.
    pub fn get(&self, labels: &[(&str, &str)]) -> Option<f64> {
        let key = self.inner.desc.series_key(labels)?;
        self.inner.map.get(&key).map(|g| g.load())
    }

    /// Render in Prometheus text exposition format.
    pub(crate) fn render(&self, out: &mut String) {
        let desc = &self.inner.desc;
        desc.write_header("gauge", out);
        for (key, val) in sorted(&self.inner.map, AtomicF64::load) {
            desc.write_sample("", &desc.label_str(&key), &fmt_value(val), out);
        }
    }
}

// --------------------
// Histogram
// --------------------

/// Aggregated observations for one label set. Buckets are cumulative.
#[derive(Debug)]
pub(crate) struct HistogramCell {
    count: AtomicU64,
    sum: AtomicF64,
    buckets: Box<[AtomicU64]>,
}

impl HistogramCell {
    fn new(n: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicF64::default(),
            buckets: (0..n).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub(crate) fn observe(&self, bounds: &[f64], v: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum.add(v);
        // Cumulative Buckets: increment every bucket whose bound covers the value
        for (i, &le) in bounds.iter().enumerate() {
            if v <= le {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[derive(Debug)]
struct HistogramInner {
    desc: Desc,
    bounds: Vec<f64>,
    map: DashMap<Vec<String>, Arc<HistogramCell>>,
}

/// Distribution family (seconds for latency histograms).
#[derive(Debug, Clone)]
pub struct Histogram {
    inner: Arc<HistogramInner>,
}

impl Histogram {
    pub(crate) fn new(desc: Desc, bounds: Vec<f64>) -> Self {
        let map = DashMap::new();
        if desc.label_names.is_empty() {
            map.insert(Vec::new(), Arc::new(HistogramCell::new(bounds.len())));
        }
        Self { inner: Arc::new(HistogramInner { desc, bounds, map }) }
    }

    pub(crate) fn desc(&self) -> &Desc {
        &self.inner.desc
    }

    pub(crate) fn bounds(&self) -> &[f64] {
        &self.inner.bounds
    }

    pub(crate) fn cell(&self, labels: &[(&str, &str)]) -> Option<Arc<HistogramCell>> {
        let key = self.inner.desc.series_key(labels)?;
        let n = self.inner.bounds.len();
        let cell = self
            .inner
            .map
            .entry(key)
            .or_insert_with(|| Arc::new(HistogramCell::new(n)));
        Some(Arc::clone(&cell))
    }

    /// Record one observation.
    pub fn observe(&self, labels: &[(&str, &str)], v: f64) {
        if let Some(cell) = self.cell(labels) {
            cell.observe(&self.inner.bounds, v);
        }
    }

    /// Record a duration in seconds.
    pub fn observe_duration(&self, labels: &[(&str, &str)], d: Duration) {
        self.observe(labels, d.as_secs_f64());
    }

    /// Start a timer that observes into this label set when dropped.
    pub fn start_timer(&self, labels: &[(&str, &str)]) -> ScopedTimer {
        ScopedTimer::new(self.clone(), self.cell(labels))
    }

    /// `(count, sum)` for a label set, if it has been written.
    pub fn get(&self, labels: &[(&str, &str)]) -> Option<(u64, f64)> {
        let key = self.inner.desc.series_key(labels)?;
        self.inner
            .map
            .get(&key)
            .map(|c| (c.count.load(Ordering::Relaxed), c.sum.load()))
    }

    /// Render in Prometheus text exposition format (unit: seconds).
    pub(crate) fn render(&self, out: &mut String) {
        let desc = &self.inner.desc;
        desc.write_header("histogram", out);
        for (key, cell) in sorted(&self.inner.map, Arc::clone) {
            let label_str = desc.label_str(&key);
            let prefix = if label_str.is_empty() { String::new() } else { format!("{},", label_str) };

            for (i, &le) in self.inner.bounds.iter().enumerate() {
                let count = cell.buckets[i].load(Ordering::Relaxed);
                let bucket_labels = format!("{}le=\"{}\"", prefix, fmt_value(le));
                desc.write_sample("_bucket", &bucket_labels, &count.to_string(), out);
            }
            let count = cell.count.load(Ordering::Relaxed);
            desc.write_sample("_bucket", &format!("{}le=\"+Inf\"", prefix), &count.to_string(), out);
            desc.write_sample("_sum", &label_str, &fmt_value(cell.sum.load()), out);
            desc.write_sample("_count", &label_str, &count.to_string(), out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(labels: &[&str]) -> Desc {
        Desc {
            name: "t".into(),
            help: "h".into(),
            label_names: labels.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn label_pairs_resolve_in_declared_order() {
        let d = desc(&["method", "endpoint"]);
        let key = d.series_key(&[("endpoint", "/users"), ("method", "GET")]);
        assert_eq!(key, Some(vec!["GET".to_string(), "/users".to_string()]));
    }

    #[test]
    fn wrong_label_set_is_dropped() {
        let c = Counter::new(desc(&["method"]));
        c.inc(&[("verb", "GET")]);
        c.inc(&[]);
        assert_eq!(c.series_count(), 0);
    }

    #[test]
    fn value_formatting() {
        assert_eq!(fmt_value(42.0), "42");
        assert_eq!(fmt_value(0.25), "0.25");
        assert_eq!(fmt_value(f64::INFINITY), "+Inf");
        assert_eq!(fmt_value(f64::NAN), "NaN");
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let h = Histogram::new(desc(&[]), vec![0.1, 1.0]);
        h.observe(&[], 0.05);
        h.observe(&[], 0.5);
        h.observe(&[], 5.0);
        let mut out = String::new();
        h.render(&mut out);
        assert!(out.contains("t_bucket{le=\"0.1\"} 1\n"));
        assert!(out.contains("t_bucket{le=\"1\"} 2\n"));
        assert!(out.contains("t_bucket{le=\"+Inf\"} 3\n"));
        assert!(out.contains("t_count 3\n"));
    }
}
