//! Core shared utilities for AirWatch services.

use anyhow::Result;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod metrics_ext;

pub use config::{load_config, CONFIG_FILE_ENV, ENV_PREFIX};
pub use metrics_ext::{init_metrics, render_metrics, SurgeMetrics, SURGE_METRICS};

static TRACING_INIT: OnceCell<()> = OnceCell::new();
static NODE_LIVENESS: AtomicBool = AtomicBool::new(true);
static NODE_READINESS: AtomicBool = AtomicBool::new(false);

pub fn mark_ready() { NODE_READINESS.store(true, Ordering::SeqCst); }
pub fn clear_ready() { NODE_READINESS.store(false, Ordering::SeqCst); }
pub fn mark_not_live() { NODE_LIVENESS.store(false, Ordering::SeqCst); }
pub fn is_ready() -> bool { NODE_READINESS.load(Ordering::SeqCst) }
pub fn is_live() -> bool { NODE_LIVENESS.load(Ordering::SeqCst) }

/// Install the global subscriber. Logs go to stderr so stdout stays free for
/// machine-readable output. Set `AIRWATCH_JSON_LOG=1` for JSON lines.
pub fn init_tracing(service: &str) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| -> Result<()> {
        let json = std::env::var("AIRWATCH_JSON_LOG").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(env_filter);
        if json {
            registry
                .with(tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr))
                .try_init()?;
        } else {
            registry
                .with(tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(true)
                    .with_writer(std::io::stderr))
                .try_init()?;
        }
        Ok(())
    })?;
    info!(target: "airwatch", service, "tracing initialized");
    Ok(())
}

/// Liveness, readiness and Prometheus metrics. Services merge their own routes on top.
pub fn health_router() -> Router {
    Router::new()
        .route("/live", get(|| async { Json(serde_json::json!({"live": is_live()})) }))
        .route("/ready", get(|| async { Json(serde_json::json!({"ready": is_ready()})) }))
        .route("/metrics", get(metrics_handler))
}

async fn metrics_handler() -> Response {
    match render_metrics() {
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics not initialized").into_response(),
        Some(Err(e)) => (StatusCode::INTERNAL_SERVER_ERROR, format!("encode error: {e}")).into_response(),
        Some(Ok(body)) => ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
    }
}

/// Bind `port` on all interfaces and serve `app` on a background task.
pub async fn serve(app: Router, port: u16) -> Result<SocketAddr> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(addr = ?local, "http server listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = ?e, "http server failed");
        }
    });
    Ok(local)
}
