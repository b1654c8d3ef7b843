//! Server config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use habitrack_core::error::{HabitError, Result};

pub use schema::{SamplerSection, ServerConfig, ServerSection, StoreSection};

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| HabitError::Config(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

/// Load `path` when it exists, otherwise fall back to built-in defaults.
pub fn load_or_default(path: &str) -> Result<ServerConfig> {
    if Path::new(path).exists() {
        load_from_file(path)
    } else {
        tracing::info!(%path, "config file not found; using defaults");
        let cfg = ServerConfig::default();
        cfg.validate()?;
        Ok(cfg)
    }
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = serde_yaml::from_str(s)
        .map_err(|e| HabitError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
