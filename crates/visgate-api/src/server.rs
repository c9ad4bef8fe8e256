//! HTTP server bootstrap, grounded on `crates/healer/src/ci/server.rs`'s
//! `build_router`/`run_server` pair.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{
    create_deployment, delete_deployment, deployment_ready_callback, get_deployment, health, readiness,
    stream_deployment,
};
use crate::state::ApiState;

/// Build the HTTP router (spec.md §6.1).
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/v1/deployments", post(create_deployment))
        .route("/v1/deployments/{id}", get(get_deployment).delete(delete_deployment))
        .route("/v1/deployments/{id}/stream", get(stream_deployment))
        .route("/internal/deployment-ready/{id}", post(deployment_ready_callback))
        .route("/health", get(health))
        .route("/readiness", get(readiness))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts serving `state`'s router on `addr` until the process is killed.
///
/// # Errors
/// Returns an error if the listener cannot bind or the server fails.
pub async fn run_server(state: Arc<ApiState>, addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("VisGate API listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
