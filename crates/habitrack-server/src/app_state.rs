//! Shared application state.
//!
//! The metric registry is built by the caller and handed in, so ownership of
//! the one process-wide instance stays explicit. Construction registers the
//! whole metric catalog and opens the store; either failing aborts startup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use habitrack_core::error::Result;
use habitrack_core::metrics::Registry;

use crate::config::ServerConfig;
use crate::obs::AppMetrics;
use crate::ops::MetricsAuth;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServerConfig,
    metrics: AppMetrics,
    metrics_auth: MetricsAuth,
    store: Store,
    draining: AtomicBool,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: ServerConfig, registry: Arc<Registry>, metrics_auth: MetricsAuth) -> Result<Self> {
        let metrics = AppMetrics::register(registry)?;
        let store = Store::open(&cfg.store, metrics.db.clone())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                metrics,
                metrics_auth,
                store,
                draining: AtomicBool::new(false),
            }),
        })
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> &AppMetrics {
        &self.inner.metrics
    }

    pub fn metrics_auth(&self) -> &MetricsAuth {
        &self.inner.metrics_auth
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
