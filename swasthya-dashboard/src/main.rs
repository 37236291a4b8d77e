/**
 * SWASTHYA DASHBOARD - Entry point of the hospital dashboard server
 *
 * ROLE: loads config, mounts the synchronization core against the remote
 * service and serves the snapshot over HTTP/SSE until Ctrl-C.
 *
 * LIFECYCLE: mount (both polling tasks start) -> serve -> signal ->
 * SSE streams close -> server drains -> unmount (timers stop, late
 * results are discarded).
 */

mod config;
mod health;
mod http;

use crate::config::load_config;
use crate::health::HealthTracker;
use crate::http::AppState;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use swasthya_core::{Dashboard, HttpFetcher};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SYNC_REPORT_EVERY: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("swasthya=info")))
        .init();

    let cfg = load_config().await;
    info!(api_base = %cfg.sync.api_base, bind = %cfg.http.bind, "config loaded");

    let fetcher = Arc::new(HttpFetcher::new(cfg.sync.api_base.clone()));
    let dashboard = Arc::new(Dashboard::mount(cfg.sync.clone(), fetcher));

    let health_tracker = HealthTracker::new();
    let reporter = health_tracker.spawn_sync_reporter(dashboard.store().clone(), SYNC_REPORT_EVERY);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app_state = AppState {
        dashboard: dashboard.clone(),
        health_tracker,
        shutdown: shutdown_rx,
    };
    let app = http::build_router(app_state);

    let addr: SocketAddr = cfg
        .http
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {:?}", cfg.http.bind))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
            info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("HTTP server failed")?;

    reporter.abort();
    dashboard.stop();
    info!("dashboard unmounted");
    Ok(())
}
