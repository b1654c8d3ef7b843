#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use support::{app, get, metrics_request, send, PASSWORD, USER};

#[tokio::test]
async fn metrics_path_is_not_instrumented() {
    let t = app();
    let m = t.state.metrics();

    for _ in 0..3 {
        let (status, _) = send(&t.router, metrics_request(USER, PASSWORD)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(&t.router, metrics_request(USER, "nope")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(m.http_requests.series_count(), 0);
    assert!(m
        .http_latency
        .get(&[("method", "GET"), ("endpoint", "/metrics")])
        .is_none());
}

#[tokio::test]
async fn each_request_hits_one_cell() {
    let t = app();
    let m = t.state.metrics();

    let (status, body) = send(&t.router, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let labels = [("method", "GET"), ("endpoint", "/healthz")];
    assert_eq!(m.http_requests.series_count(), 1);
    assert_eq!(m.http_requests.get(&labels), Some(1));
    let (count, sum) = m.http_latency.get(&labels).unwrap();
    assert_eq!(count, 1);
    assert!(sum >= 0.0);
}

#[tokio::test]
async fn route_template_is_the_endpoint_label() {
    let t = app();
    let m = t.state.metrics();

    send(&t.router, get("/users/1")).await;
    send(&t.router, get("/users/2")).await;

    let labels = [("method", "GET"), ("endpoint", "/users/:user_id")];
    assert_eq!(m.http_requests.get(&labels), Some(2));
    assert_eq!(m.http_requests.series_count(), 1);
}

#[tokio::test]
async fn error_responses_are_counted_and_passed_through() {
    let t = app();
    let m = t.state.metrics();

    let (status, body) = send(&t.router, get("/habits/77")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["error"], "NOT_FOUND");
    assert_eq!(v["message"], "not found: Habit with id 77 not found");

    let labels = [("method", "GET"), ("endpoint", "/habits/:habit_id")];
    assert_eq!(m.http_requests.get(&labels), Some(1));
    assert_eq!(m.http_latency.get(&labels).unwrap().0, 1);

    // the failed lookup still timed its storage call
    assert_eq!(m.db.histogram().get(&[("operation", "read")]).unwrap().0, 1);
}

#[tokio::test]
async fn unmatched_paths_share_one_label() {
    let t = app();
    let m = t.state.metrics();

    let (status, _) = send(&t.router, get("/no/such/route")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    send(&t.router, get("/another/missing")).await;

    let labels = [("method", "GET"), ("endpoint", "<unmatched>")];
    assert_eq!(m.http_requests.get(&labels), Some(2));
    assert_eq!(m.http_requests.series_count(), 1);
}

#[tokio::test]
async fn extension_methods_collapse_into_other() {
    let t = app();
    let m = t.state.metrics();

    for i in 0..20 {
        let req = Request::builder()
            .method(format!("X{i}").as_str())
            .uri("/nope")
            .body(Body::empty())
            .unwrap();
        send(&t.router, req).await;
    }
    let req = Request::builder().method("OPTIONS").uri("/nope").body(Body::empty()).unwrap();
    send(&t.router, req).await;

    let other = [("method", "OTHER"), ("endpoint", "<unmatched>")];
    assert_eq!(m.http_requests.get(&other), Some(20));
    assert_eq!(m.http_latency.get(&other).unwrap().0, 20);
    assert_eq!(
        m.http_requests.get(&[("method", "OPTIONS"), ("endpoint", "<unmatched>")]),
        Some(1)
    );
    assert_eq!(m.http_requests.series_count(), 2);
}
