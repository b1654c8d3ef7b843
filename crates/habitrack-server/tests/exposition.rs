#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use axum::http::{header, StatusCode};
use habitrack_core::metrics::CONTENT_TYPE;
use habitrack_server::ops::MetricsAuth;
use support::{app, app_with_auth, get, metrics_request, send, PASSWORD, USER};
use tower::ServiceExt;

const CONTRACT: &[&str] = &[
    "http_requests_total",
    "http_request_latency_seconds",
    "db_query_latency_seconds",
    "system_cpu_usage_percent",
    "system_ram_usage_percent",
    "system_ram_usage_megabytes",
    "cpu_usage_percent",
    "node_load1",
    "node_swap_used_megabytes",
    "process_resident_memory_megabytes",
    "process_page_faults_major_total",
    "node_netstat_tcp_CurrEstab",
    "node_netstat_Tcp_RetransSegs",
    "node_sockstat_TCP_inuse",
    "sqlite_db_size",
    "sqlite_cache_size_pages",
    "sqlite_cache_overflow_pages",
];

#[tokio::test]
async fn valid_credentials_get_every_metric() {
    let t = app();
    send(&t.router, get("/healthz")).await;

    let res = t.router.clone().oneshot(metrics_request(USER, PASSWORD)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], CONTENT_TYPE);

    let (_, body) = send(&t.router, metrics_request(USER, PASSWORD)).await;
    for name in CONTRACT {
        assert!(body.contains(&format!("# TYPE {name} ")), "missing {name}");
    }
    for name in t.state.metrics().registry().names() {
        assert!(body.contains(&name), "missing {name}");
    }
    assert!(body.contains("http_requests_total{method=\"GET\",endpoint=\"/healthz\"} 1\n"));
    assert!(body.contains(
        "# HELP sqlite_cache_size_pages Configured SQLite page cache limit in pages (PRAGMA cache_size), not pages in use\n"
    ));
}

#[tokio::test]
async fn bad_credentials_get_empty_401() {
    let t = app();

    let res = t.router.clone().oneshot(metrics_request(USER, "wrong")).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));

    let (status, body) = send(&t.router, metrics_request("intruder", PASSWORD)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.is_empty());

    let (status, body) = send(&t.router, get("/metrics")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.is_empty());
}

#[tokio::test]
async fn missing_secrets_reject_everything() {
    let t = app_with_auth(MetricsAuth::disabled());
    let (status, body) = send(&t.router, metrics_request(USER, PASSWORD)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.is_empty());
}

#[tokio::test]
async fn readiness_follows_draining() {
    let t = app();
    let (status, _) = send(&t.router, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);

    t.state.set_draining();
    let (status, body) = send(&t.router, get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "draining");
}
