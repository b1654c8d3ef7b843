//! SQLite store behind an r2d2 pool.
//!
//! Every call goes through [`Store::call`], which checks a connection out on
//! the blocking pool and times the whole call as one `read` or `write`
//! observation. The timing scope also covers failed calls.

pub mod queries;

use std::time::Duration;

use habitrack_core::error::{HabitError, Result};
use habitrack_core::metrics::LatencyObserver;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::config::StoreSection;
use crate::obs::DbOp;

pub(crate) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users(
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    email TEXT UNIQUE
);
CREATE TABLE IF NOT EXISTS habits(
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    owner_id INTEGER,
    last_mark DATETIME,
    streak INTEGER DEFAULT 0,
    FOREIGN KEY (owner_id) REFERENCES users(id)
);
";

#[derive(Clone)]
pub struct Store {
    pool: Pool<SqliteConnectionManager>,
    observer: LatencyObserver,
}

impl Store {
    /// Open the pool and create missing tables.
    pub fn open(cfg: &StoreSection, observer: LatencyObserver) -> Result<Self> {
        let manager = SqliteConnectionManager::file(&cfg.path).with_init(|c| {
            c.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });
        let pool = Pool::builder()
            .max_size(cfg.pool_size)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)
            .map_err(|e| HabitError::Config(format!("open store {}: {e}", cfg.path)))?;

        let conn = pool
            .get()
            .map_err(|e| HabitError::Config(format!("store connection: {e}")))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| HabitError::Config(format!("create tables: {e}")))?;

        tracing::info!(path = %cfg.path, pool_size = cfg.pool_size, "store ready");
        Ok(Self { pool, observer })
    }

    /// Run `f` on a pooled connection inside an `op` latency scope.
    pub async fn call<T, F>(&self, op: DbOp, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let _scope = self.observer.observe(op.as_str());
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| HabitError::Internal(format!("store connection: {e}")))?;
            f(&conn)
        })
        .await
        .map_err(|e| HabitError::Internal(format!("store task: {e}")))?
    }
}
