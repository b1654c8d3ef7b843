//! HTTP Basic check guarding the exposition endpoint.
//!
//! Credentials come from `METRICS_USER` / `METRICS_PASSWORD`, read once at
//! startup. When either is missing every request is rejected.

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

pub const USER_ENV: &str = "METRICS_USER";
pub const PASSWORD_ENV: &str = "METRICS_PASSWORD";

#[derive(Clone, Default)]
pub struct MetricsAuth {
    user: Option<String>,
    password: Option<String>,
}

impl std::fmt::Debug for MetricsAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsAuth")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl MetricsAuth {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            password: Some(password.into()),
        }
    }

    /// No secrets configured: every check fails.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let auth = Self {
            user: std::env::var(USER_ENV).ok().filter(|v| !v.is_empty()),
            password: std::env::var(PASSWORD_ENV).ok().filter(|v| !v.is_empty()),
        };
        if !auth.is_configured() {
            tracing::warn!(
                "{USER_ENV}/{PASSWORD_ENV} not set; /metrics will reject every request"
            );
        }
        auth
    }

    pub fn is_configured(&self) -> bool {
        self.user.is_some() && self.password.is_some()
    }

    /// Check the `Authorization: Basic ...` header.
    pub fn verify(&self, headers: &HeaderMap) -> bool {
        let (Some(user), Some(password)) = (&self.user, &self.password) else {
            return false;
        };
        let Some((got_user, got_password)) = basic_credentials(headers) else {
            return false;
        };
        // Both comparisons always run.
        let user_ok = constant_time_eq(got_user.as_bytes(), user.as_bytes());
        let password_ok = constant_time_eq(got_password.as_bytes(), password.as_bytes());
        user_ok & password_ok
    }
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_owned(), password.to_owned()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(raw: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(raw).unwrap());
        h
    }

    fn basic(user: &str, password: &str) -> HeaderMap {
        headers(&format!("Basic {}", BASE64.encode(format!("{user}:{password}"))))
    }

    #[test]
    fn accepts_matching_credentials() {
        let auth = MetricsAuth::new("prom", "s3cret");
        assert!(auth.verify(&basic("prom", "s3cret")));
    }

    #[test]
    fn rejects_mismatch_and_garbage() {
        let auth = MetricsAuth::new("prom", "s3cret");
        assert!(!auth.verify(&basic("prom", "wrong")));
        assert!(!auth.verify(&basic("other", "s3cret")));
        assert!(!auth.verify(&headers("Bearer abc")));
        assert!(!auth.verify(&headers("Basic !!notbase64")));
        assert!(!auth.verify(&HeaderMap::new()));
    }

    #[test]
    fn password_may_contain_colons() {
        let auth = MetricsAuth::new("prom", "a:b:c");
        assert!(auth.verify(&basic("prom", "a:b:c")));
    }

    #[test]
    fn unconfigured_rejects_everything() {
        let auth = MetricsAuth::disabled();
        assert!(!auth.is_configured());
        assert!(!auth.verify(&basic("", "")));
    }
}
