//! habitrack server
//!
//! - Strict YAML config (`HABITRACK_CONFIG`, default `habitrack.yaml`)
//! - One metric registry for the whole process, registered before serving
//! - Background sampler owned by `main`, stopped after the server drains

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use habitrack_core::error::{HabitError, Result};
use habitrack_core::metrics::Registry;
use habitrack_server::{app_state::AppState, config, obs::Sampler, ops::MetricsAuth, router};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "habitrack-server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::var("HABITRACK_CONFIG").unwrap_or_else(|_| "habitrack.yaml".into());
    let cfg = config::load_or_default(&path)?;
    let listen = cfg.server.listen_addr()?;

    let registry = Arc::new(Registry::new());
    let state = AppState::new(cfg, registry, MetricsAuth::from_env())?;

    let sampler = Sampler::standard(
        &state.cfg().sampler,
        &state.cfg().store.path,
        &state.metrics().host,
    )
    .spawn();

    let app = router::build_router(state.clone());

    tracing::info!(%listen, "habitrack-server starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| HabitError::Internal(format!("bind {listen}: {e}")))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| HabitError::Internal(format!("server failed: {e}")));

    sampler.shutdown().await;
    served
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    state.set_draining();
    tracing::info!("signal received, starting graceful shutdown");
}
