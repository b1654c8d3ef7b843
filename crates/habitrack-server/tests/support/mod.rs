#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use habitrack_core::metrics::Registry;
use habitrack_server::{app_state::AppState, config::ServerConfig, ops::MetricsAuth, router};
use tempfile::TempDir;
use tower::ServiceExt;

pub const USER: &str = "prom";
pub const PASSWORD: &str = "s3cret";

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub dir: TempDir,
}

impl TestApp {
    pub fn db_path(&self) -> String {
        self.state.cfg().store.path.clone()
    }

    pub fn proc_root(&self) -> PathBuf {
        PathBuf::from(&self.state.cfg().sampler.proc_root)
    }
}

pub fn app() -> TestApp {
    app_with_auth(MetricsAuth::new(USER, PASSWORD))
}

pub fn app_with_auth(auth: MetricsAuth) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let proc_root = dir.path().join("proc");
    write_proc_fixture(&proc_root);

    let mut cfg = ServerConfig::default();
    cfg.store.path = dir.path().join("habits.db").to_string_lossy().into_owned();
    cfg.sampler.proc_root = proc_root.to_string_lossy().into_owned();
    cfg.validate().unwrap();

    let state = AppState::new(cfg, Arc::new(Registry::new()), auth).unwrap();
    let router = router::build_router(state.clone());
    TestApp { state, router, dir }
}

pub fn write_proc_fixture(root: &Path) {
    fs::create_dir_all(root.join("self")).unwrap();
    fs::create_dir_all(root.join("net")).unwrap();
    fs::write(root.join("stat"), "cpu  100 0 50 850 0 0 0 0 0 0\ncpu0 100 0 50 850 0 0 0 0 0 0\n").unwrap();
    fs::write(
        root.join("self/stat"),
        "4242 (habitrack-server) S 1 4242 4242 0 -1 4194560 812 0 17 0 5 3 0 0 20 0\n",
    )
    .unwrap();
    write_snmp(root, 3, 42);
    write_sockstat(root, 5);
}

pub fn write_snmp(root: &Path, curr_estab: u64, retrans: u64) {
    let content = format!(
        "Ip: Forwarding DefaultTTL\nIp: 1 64\n\
         Tcp: RtoAlgorithm RtoMin RtoMax MaxConn ActiveOpens PassiveOpens AttemptFails EstabResets CurrEstab InSegs OutSegs RetransSegs InErrs OutRsts\n\
         Tcp: 1 200 120000 -1 10 5 0 0 {curr_estab} 1000 900 {retrans} 0 1\n"
    );
    fs::write(root.join("net/snmp"), content).unwrap();
}

pub fn write_sockstat(root: &Path, inuse: u64) {
    let content = format!("sockets: used 10\nTCP: inuse {inuse} orphan 0 tw 0 alloc 6 mem 1\nUDP: inuse 1 mem 1\n");
    fs::write(root.join("net/sockstat"), content).unwrap();
}

pub fn basic(user: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{user}:{password}")))
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn metrics_request(user: &str, password: &str) -> Request<Body> {
    Request::builder()
        .uri("/metrics")
        .header(header::AUTHORIZATION, basic(user, password))
        .body(Body::empty())
        .unwrap()
}

pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, String) {
    let res = router.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}
