//! Axum router wiring.
//!
//! Business routes, ops routes and the exposition endpoint share one router;
//! the request-instrumentation layer wraps all of them and skips `/metrics`
//! itself.

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::handlers::{self, habits, users};
use crate::obs::middleware::track_requests;
use crate::{app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/users", get(users::list).post(users::create))
        .route("/users/:user_id", get(users::get))
        .route("/habits", post(habits::create))
        .route(
            "/habits/:habit_id",
            get(habits::get).patch(habits::mark).delete(habits::delete),
        )
        .route("/habits/:habit_id/rename", patch(habits::rename))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route(ops::METRICS_PATH, get(ops::metrics))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.metrics().clone(),
            track_requests,
        ))
        .with_state(state)
}
