//! Request instrumentation.
//!
//! Counts and times every request by `(method, endpoint)`, where `endpoint`
//! is the matched route template (`/habits/:habit_id`, never the raw path) so
//! label cardinality stays bounded. The exposition path is passed through
//! untouched. The downstream response is returned as-is.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Method, Request},
    middleware::Next,
    response::Response,
};

use crate::obs::AppMetrics;
use crate::ops::METRICS_PATH;

/// Label used for requests that did not match any route.
pub const UNMATCHED_ENDPOINT: &str = "<unmatched>";

/// Label used for any method outside the standard set.
pub const OTHER_METHOD: &str = "OTHER";

/// Extension methods are arbitrary tokens, so they collapse into one label.
pub fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::HEAD => "HEAD",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::PATCH => "PATCH",
        Method::DELETE => "DELETE",
        Method::OPTIONS => "OPTIONS",
        _ => OTHER_METHOD,
    }
}

pub async fn track_requests(
    State(metrics): State<AppMetrics>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.uri().path() == METRICS_PATH {
        return next.run(req).await;
    }

    let method = method_label(req.method());
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_owned());
    let labels = [("method", method), ("endpoint", endpoint.as_str())];

    metrics.http_requests.inc(&labels);
    // Dropped on completion or when the request future is cancelled.
    let _timer = metrics.http_latency.start_timer(&labels);

    next.run(req).await
}
