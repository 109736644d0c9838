use axum::extract::DefaultBodyLimit;
use axum::{Extension, Router};
use tokio::sync::watch;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;

pub mod api;
mod config;
mod handlers;
mod health;

pub use config::{Config, ConfigError};

use crate::ServiceState;

const API_PREFIX: &str = "/api";
const STATUS_PREFIX: &str = "/_status";

fn request_tracing(level: tracing::Level) -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros))
}

/// Everything the daemon serves.
///
/// Request bodies are capped a little above the blob limit, since blobs
/// arrive base64 encoded inside JSON.
pub fn router(config: Config, state: ServiceState) -> Router {
    let tracing_layer = request_tracing(config.log_level);
    let body_limit = DefaultBodyLimit::max(config.max_body_bytes);

    Router::new()
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .nest(API_PREFIX, api::router(state.clone()))
        .fallback(handlers::not_found_handler)
        .layer(body_limit)
        .layer(Extension(config))
        .with_state(state)
        .layer(tracing_layer)
}

/// Serve until `shutdown_rx` fires, then drain in-flight requests.
///
/// Open event streams are dropped with their connections, which releases
/// their subscriptions.
pub async fn run_api(
    config: Config,
    state: ServiceState,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, public_url = %config.public_url, "serving object API");

    axum::serve(listener, router(config, state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
            tracing::info!("API server draining");
        })
        .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("failed to serve the object API: {0}")]
    ServingFailed(#[from] std::io::Error),
}
