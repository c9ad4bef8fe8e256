//! Provider adapter trait and common types (spec.md §4.5).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the GPU provider, classified into exactly two buckets so
/// the lifecycle engine can tell capacity exhaustion (retryable, drives
/// fallback) apart from everything else (terminal).
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No GPU of the requested tier is currently available. Retryable —
    /// the engine pops the next fallback candidate.
    #[error("no capacity available: {0}")]
    Capacity(String),

    /// Any other provider failure: auth, malformed request, 5xx, network.
    #[error("provider error: {0}")]
    Generic(String),
}

impl ProviderError {
    #[must_use]
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::Capacity(_))
    }
}

/// Worker-scaling knobs, injected by the engine at creation time
/// (spec.md §4.5, §6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerScalingConfig {
    pub workers_min: u32,
    pub workers_max: u32,
    pub idle_timeout_seconds: u32,
    pub scaler_type: String,
    pub scaler_value: u32,
}

impl Default for WorkerScalingConfig {
    fn default() -> Self {
        Self {
            workers_min: 0,
            workers_max: 3,
            idle_timeout_seconds: 120,
            scaler_type: "QUEUE_DELAY".to_string(),
            scaler_value: 1,
        }
    }
}

/// Environment variables passed into the worker container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerEnvVars {
    pub hf_model_id: String,
    pub hf_token: Option<String>,
    /// Inbound callback URL, e.g. `.../internal/deployment-ready/{id}`.
    pub visgate_webhook: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_endpoint_url: Option<String>,
    pub s3_model_url: Option<String>,
}

/// Request to create a new serverless endpoint.
#[derive(Debug, Clone)]
pub struct CreateEndpointRequest {
    /// Endpoint name; the adapter prefixes it with `visgate-`.
    pub name: String,
    /// Worker container image tag.
    pub image: String,
    /// Provider-native GPU tier id to request.
    pub gpu_tier_id: String,
    pub env_vars: WorkerEnvVars,
    pub scaling: WorkerScalingConfig,
}

/// An endpoint as returned by `create_endpoint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub endpoint_id: String,
    pub endpoint_url: String,
}

/// Live status of an endpoint, as observed by the readiness poller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointStatus {
    pub created: bool,
    pub workers_ready: u32,
    pub last_error: Option<String>,
}

/// Capabilities consumed by the lifecycle engine. Stateless; the adapter
/// owns only a shared HTTP client.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn create_endpoint(
        &self,
        req: CreateEndpointRequest,
    ) -> Result<Endpoint, ProviderError>;

    async fn delete_endpoint(&self, endpoint_id: &str) -> Result<(), ProviderError>;

    async fn list_endpoints(&self) -> Result<Vec<Endpoint>, ProviderError>;

    async fn get_endpoint_status(&self, endpoint_id: &str) -> Result<EndpointStatus, ProviderError>;
}

/// Builds a [`Provider`] bound to one caller-supplied credential. The
/// caller's provider key is never persisted (it is also the input to
/// `owner_hash`), so the engine holds only this factory and mints a
/// fresh provider per deployment instead of sharing one authenticated
/// client across callers.
pub trait ProviderFactory: Send + Sync {
    fn build(&self, api_key: &str) -> Result<Arc<dyn Provider>, ProviderError>;
}
