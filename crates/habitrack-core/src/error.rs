//! Shared error type across habitrack crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Auth failed.
    AuthFailed,
    /// Referenced row does not exist.
    NotFound,
    /// Unique constraint hit.
    Conflict,
    /// Startup misconfiguration (bad config file, metric registration clash).
    Config,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::Conflict => "CONFLICT",
            ClientCode::Config => "CONFIG",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, HabitError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum HabitError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("auth failed")]
    AuthFailed,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl HabitError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            HabitError::BadRequest(_) => ClientCode::BadRequest,
            HabitError::AuthFailed => ClientCode::AuthFailed,
            HabitError::NotFound(_) => ClientCode::NotFound,
            HabitError::Conflict(_) => ClientCode::Conflict,
            HabitError::Config(_) => ClientCode::Config,
            HabitError::Internal(_) => ClientCode::Internal,
        }
    }
}
