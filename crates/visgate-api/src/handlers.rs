//! Handlers for the six endpoints in spec.md §6.1, each returning
//! `impl IntoResponse` the same way `healer`'s
//! `platform_alert_handler`/`workflow_alert_handler` do.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::{self, Stream};
use serde::Deserialize;
use tracing::{info, warn};
use visgate_store::StoreError;
use visgate_types::{owner_hash, ApiError};

use crate::auth::extract_provider_key;
use crate::error::ApiErrorResponse;
use crate::request::CreateDeploymentRequest;
use crate::response::{CreateDeploymentResponse, DeploymentSnapshot, HealthResponse};
use crate::state::ApiState;

pub async fn create_deployment(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(body): Json<CreateDeploymentRequest>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let provider_key = extract_provider_key(&headers)?;
    let owner = owner_hash(&provider_key);

    if let Err(retry_after_secs) = state.rate_limiter.check(&owner) {
        return Err(ApiError::RateLimit { retry_after_secs }.into());
    }

    let hf_token = body.hf_token.clone();
    let deployment = body.into_deployment(&provider_key)?;

    if let Some(existing) = state
        .store
        .find_reusable(
            &deployment.owner_hash,
            &deployment.model_id,
            deployment.requested_tier.as_deref(),
        )
        .await
        .map_err(|e| ApiError::Store(e.to_string()))?
    {
        info!(deployment_id = %existing.id, "reusing existing deployment");
        let response = CreateDeploymentResponse::from(&existing);
        return Ok((StatusCode::ACCEPTED, Json(response)));
    }

    state
        .store
        .create(deployment.clone())
        .await
        .map_err(|e| ApiError::Store(e.to_string()))?;

    let response = CreateDeploymentResponse::from(&deployment);
    state.engine.spawn_deployment(deployment, provider_key, hf_token).await;

    Ok((StatusCode::ACCEPTED, Json(response)))
}

pub async fn get_deployment(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<LogQuery>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let provider_key = extract_provider_key(&headers)?;
    let owner = owner_hash(&provider_key);

    let deployment = state.store.get(&id, &owner).await.map_err(map_store_error)?;
    let limit = query.limit.unwrap_or(state.default_log_limit);
    let logs = state
        .store
        .get_logs(&id, limit)
        .await
        .map_err(|e| ApiError::Store(e.to_string()))?;

    Ok(Json(DeploymentSnapshot::new(deployment, logs)))
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    limit: Option<usize>,
}

pub async fn delete_deployment(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let provider_key = extract_provider_key(&headers)?;
    let owner = owner_hash(&provider_key);

    // Confirms ownership before touching anything — `Engine::delete_deployment`
    // itself is owner-unaware (it drives off `get_any`), matching the rest
    // of the engine's internal/owner-checked boundary split.
    state.store.get(&id, &owner).await.map_err(map_store_error)?;

    state
        .engine
        .delete_deployment(&id, &provider_key)
        .await
        .map_err(|e| ApiError::Store(e.to_string()))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn stream_deployment(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiErrorResponse> {
    let provider_key = extract_provider_key(&headers)?;
    let owner = owner_hash(&provider_key);
    state.store.get(&id, &owner).await.map_err(map_store_error)?;

    let store = state.store.clone();
    let seed = (store, id, owner, None::<visgate_types::DeploymentStatus>, false);

    let stream = stream::unfold(seed, |(store, id, owner, last_status, done)| async move {
        if done {
            return None;
        }
        loop {
            let deployment = match store.get(&id, &owner).await {
                Ok(d) => d,
                Err(_) => return None,
            };

            let changed = Some(deployment.status) != last_status;
            let terminal = deployment.status.is_terminal();

            if changed {
                let payload = serde_json::json!({
                    "deployment_id": deployment.id,
                    "status": deployment.status,
                });
                let event = Event::default().json_data(payload).unwrap_or_else(|_| Event::default());
                return Some((Ok(event), (store, id, owner, Some(deployment.status), terminal)));
            }

            if terminal {
                return None;
            }

            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub async fn deployment_ready_callback(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    if let Some(expected) = &state.config.internal_webhook_secret {
        let provided = headers
            .get("X-Internal-Secret")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if provided != expected {
            warn!(deployment_id = %id, "rejected readiness callback with bad internal secret");
            return Err(ApiError::Unauthorized("invalid X-Internal-Secret".to_string()).into());
        }
    }

    state
        .engine
        .handle_ready_callback(&id)
        .await
        .map_err(|e| ApiError::Store(e.to_string()))?;

    Ok(StatusCode::OK)
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

pub async fn readiness(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    match state.store.get_any("__visgate_readiness_probe__").await {
        Err(StoreError::Backend(_)) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        _ => (StatusCode::OK, Json(HealthResponse { status: "ok" })).into_response(),
    }
}

fn map_store_error(err: StoreError) -> ApiErrorResponse {
    match err {
        StoreError::NotFound => ApiError::DeploymentNotFound.into(),
        other => ApiError::Store(other.to_string()).into(),
    }
}
