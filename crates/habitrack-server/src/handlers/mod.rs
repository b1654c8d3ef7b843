//! User and habit handlers.
//!
//! Thin wrappers: light input checks, one `Store::call` each, JSON out.

pub mod habits;
pub mod users;

use axum::{http::Uri, Json};
use habitrack_core::error::{HabitError, Result};
use serde_json::{json, Value};

use crate::error::ApiError;

const NAME_LEN: std::ops::RangeInclusive<usize> = 2..=60;

pub async fn home() -> Json<Value> {
    Json(json!({
        "message": "habitrack is up. Try GET /users"
    }))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError(HabitError::NotFound(format!("no route for {}", uri.path())))
}

pub(crate) fn check_name(field: &str, value: &str) -> Result<()> {
    let len = value.trim().chars().count();
    if NAME_LEN.contains(&len) {
        Ok(())
    } else {
        Err(HabitError::BadRequest(format!(
            "{field} must be between {} and {} characters",
            NAME_LEN.start(),
            NAME_LEN.end()
        )))
    }
}

pub(crate) fn check_email(value: &str) -> Result<()> {
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(HabitError::BadRequest(format!("invalid email: {value:?}"))),
    }
}
