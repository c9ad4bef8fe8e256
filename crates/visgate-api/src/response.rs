//! Response bodies for `visgate-api` (spec.md §6.1).

use chrono::{DateTime, Utc};
use serde::Serialize;
use visgate_types::{CacheScope, Deployment, DeploymentError, DeploymentStatus, GpuAttempt, LogEntry};

/// Rough heuristic for a cold-start endpoint: GPU provisioning plus a
/// model download, before any per-model download-size data is available.
/// Not asserted on by any test; purely advisory for the caller.
const ESTIMATED_READY_SECONDS: i64 = 180;

#[derive(Debug, Serialize)]
pub struct CreateDeploymentResponse {
    pub deployment_id: String,
    pub status: DeploymentStatus,
    pub model_id: String,
    pub estimated_ready_seconds: i64,
    pub webhook_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Deployment> for CreateDeploymentResponse {
    fn from(deployment: &Deployment) -> Self {
        Self {
            deployment_id: deployment.id.clone(),
            status: deployment.status,
            model_id: deployment.model_id.clone(),
            estimated_ready_seconds: ESTIMATED_READY_SECONDS,
            webhook_url: deployment.webhook_url.clone(),
            created_at: deployment.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeploymentSnapshot {
    pub deployment_id: String,
    pub status: DeploymentStatus,
    pub model_id: String,
    pub requested_tier: Option<String>,
    pub resolved_tier: Option<String>,
    pub min_vram_gb: Option<u32>,
    pub endpoint_url: Option<String>,
    pub cache_scope: CacheScope,
    pub error: Option<DeploymentError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
    pub attempts: Vec<GpuAttempt>,
    pub logs: Vec<LogEntry>,
}

impl DeploymentSnapshot {
    #[must_use]
    pub fn new(deployment: Deployment, logs: Vec<LogEntry>) -> Self {
        Self {
            deployment_id: deployment.id,
            status: deployment.status,
            model_id: deployment.model_id,
            requested_tier: deployment.requested_tier,
            resolved_tier: deployment.resolved_tier,
            min_vram_gb: deployment.min_vram_gb,
            endpoint_url: deployment.endpoint_url,
            cache_scope: deployment.cache_scope,
            error: deployment.error,
            created_at: deployment.created_at,
            updated_at: deployment.updated_at,
            ready_at: deployment.ready_at,
            attempts: deployment.attempts,
            logs,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
