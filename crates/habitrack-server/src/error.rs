//! HTTP mapping for the shared error type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use habitrack_core::error::HabitError;
use serde_json::json;

/// Handler error: a `HabitError` rendered as a JSON body with a matching status.
#[derive(Debug)]
pub struct ApiError(pub HabitError);

impl From<HabitError> for ApiError {
    fn from(e: HabitError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            HabitError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HabitError::AuthFailed => StatusCode::UNAUTHORIZED,
            HabitError::NotFound(_) => StatusCode::NOT_FOUND,
            HabitError::Conflict(_) => StatusCode::CONFLICT,
            HabitError::Config(_) | HabitError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = Json(json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
