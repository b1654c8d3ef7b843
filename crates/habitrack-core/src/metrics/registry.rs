//! Process-wide metric registry.
//!
//! One `Registry` is built at startup and shared (behind `Arc`) by every
//! component that records telemetry. Registration is the only fallible step:
//! a name may be registered again with the identical shape (the existing
//! handle is returned), but any clash in kind, labels or buckets is a
//! configuration error meant to abort startup.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{HabitError, Result};

use super::family::{Counter, Desc, Gauge, Histogram, DEFAULT_BUCKETS};

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// Handle to a registered family.
#[derive(Debug, Clone)]
pub enum Metric {
    Counter(Counter),
    Gauge(Gauge),
    Histogram(Histogram),
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Histogram(_) => MetricKind::Histogram,
        }
    }

    fn desc(&self) -> &Desc {
        match self {
            Metric::Counter(c) => c.desc(),
            Metric::Gauge(g) => g.desc(),
            Metric::Histogram(h) => h.desc(),
        }
    }

    fn render(&self, out: &mut String) {
        match self {
            Metric::Counter(c) => c.render(out),
            Metric::Gauge(g) => g.render(out),
            Metric::Histogram(h) => h.render(out),
        }
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    families: DashMap<String, Metric>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a family, or return the existing one when the shape matches.
    /// Histograms get [`DEFAULT_BUCKETS`].
    pub fn register(
        &self,
        name: &str,
        kind: MetricKind,
        help: &str,
        label_names: &[&str],
    ) -> Result<Metric> {
        let buckets = match kind {
            MetricKind::Histogram => Some(DEFAULT_BUCKETS.as_slice()),
            _ => None,
        };
        self.register_inner(name, kind, help, label_names, buckets)
    }

    pub fn counter(&self, name: &str, help: &str, label_names: &[&str]) -> Result<Counter> {
        match self.register(name, MetricKind::Counter, help, label_names)? {
            Metric::Counter(c) => Ok(c),
            other => Err(kind_clash(name, MetricKind::Counter, other.kind())),
        }
    }

    pub fn gauge(&self, name: &str, help: &str, label_names: &[&str]) -> Result<Gauge> {
        match self.register(name, MetricKind::Gauge, help, label_names)? {
            Metric::Gauge(g) => Ok(g),
            other => Err(kind_clash(name, MetricKind::Gauge, other.kind())),
        }
    }

    pub fn histogram(&self, name: &str, help: &str, label_names: &[&str]) -> Result<Histogram> {
        self.histogram_with_buckets(name, help, label_names, &DEFAULT_BUCKETS)
    }

    /// Histogram with an explicit, strictly increasing bucket ladder (`+Inf` is implicit).
    pub fn histogram_with_buckets(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: &[f64],
    ) -> Result<Histogram> {
        match self.register_inner(name, MetricKind::Histogram, help, label_names, Some(buckets))? {
            Metric::Histogram(h) => Ok(h),
            other => Err(kind_clash(name, MetricKind::Histogram, other.kind())),
        }
    }

    /// Look up a registered family by name.
    pub fn get(&self, name: &str) -> Option<Metric> {
        self.families.get(name).map(|m| m.value().clone())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.families.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Render every family in the text exposition format, ordered by name.
    pub fn render(&self) -> String {
        let mut families: Vec<Metric> = self.families.iter().map(|r| r.value().clone()).collect();
        families.sort_by(|a, b| a.desc().name.cmp(&b.desc().name));

        let mut out = String::new();
        for m in &families {
            m.render(&mut out);
        }
        out
    }

    fn register_inner(
        &self,
        name: &str,
        kind: MetricKind,
        help: &str,
        label_names: &[&str],
        buckets: Option<&[f64]>,
    ) -> Result<Metric> {
        validate_metric_name(name)?;
        for (i, l) in label_names.iter().enumerate() {
            validate_label_name(name, kind, l)?;
            if label_names[..i].contains(l) {
                return Err(HabitError::Config(format!(
                    "metric {name} declares label {l:?} more than once"
                )));
            }
        }
        if let Some(b) = buckets {
            validate_buckets(name, b)?;
        }

        let desc = Desc {
            name: name.to_string(),
            help: help.to_string(),
            label_names: label_names.iter().map(|s| s.to_string()).collect(),
        };

        match self.families.entry(name.to_string()) {
            Entry::Occupied(e) => {
                let existing = e.get();
                if existing.kind() != kind {
                    return Err(kind_clash(name, kind, existing.kind()));
                }
                if existing.desc().label_names != desc.label_names {
                    return Err(HabitError::Config(format!(
                        "metric {name} already registered with labels {:?}",
                        existing.desc().label_names
                    )));
                }
                if let (Metric::Histogram(h), Some(b)) = (existing, buckets) {
                    if h.bounds() != b {
                        return Err(HabitError::Config(format!(
                            "metric {name} already registered with different buckets"
                        )));
                    }
                }
                Ok(existing.clone())
            }
            Entry::Vacant(e) => {
                let metric = match kind {
                    MetricKind::Counter => Metric::Counter(Counter::new(desc)),
                    MetricKind::Gauge => Metric::Gauge(Gauge::new(desc)),
                    MetricKind::Histogram => {
                        let bounds = buckets.unwrap_or(&DEFAULT_BUCKETS).to_vec();
                        Metric::Histogram(Histogram::new(desc, bounds))
                    }
                };
                tracing::debug!(metric = %name, kind = kind.as_str(), "metric registered");
                e.insert(metric.clone());
                Ok(metric)
            }
        }
    }
}

fn kind_clash(name: &str, wanted: MetricKind, existing: MetricKind) -> HabitError {
    HabitError::Config(format!(
        "metric {name} already registered as {} (wanted {})",
        existing.as_str(),
        wanted.as_str()
    ))
}

fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(HabitError::Config(format!("invalid metric name: {name:?}")))
    }
}

fn validate_label_name(metric: &str, kind: MetricKind, label: &str) -> Result<()> {
    let mut chars = label.chars();
    let well_formed = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !well_formed || label.starts_with("__") {
        return Err(HabitError::Config(format!(
            "invalid label name {label:?} on metric {metric}"
        )));
    }
    if kind == MetricKind::Histogram && label == "le" {
        return Err(HabitError::Config(format!(
            "label \"le\" is reserved on histogram {metric}"
        )));
    }
    Ok(())
}

fn validate_buckets(metric: &str, buckets: &[f64]) -> Result<()> {
    if buckets.is_empty() {
        return Err(HabitError::Config(format!("histogram {metric} needs at least one bucket")));
    }
    if buckets.iter().any(|b| !b.is_finite()) || buckets.windows(2).any(|w| w[0] >= w[1]) {
        return Err(HabitError::Config(format!(
            "histogram {metric} buckets must be finite and strictly increasing"
        )));
    }
    Ok(())
}
