//! Error taxonomy shared by every VisGate crate.
//!
//! Mirrors the teacher's convention (`GpuProviderError`, `CloudProviderError`)
//! of keeping the error enum transport-agnostic: this crate knows nothing
//! about HTTP status codes. `visgate-api` maps variants to responses at the
//! edge.

use thiserror::Error;

/// Errors surfaced by the deployment lifecycle, from request validation
/// through to terminal deployment state.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed request body.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or invalid provider key.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Unknown deployment id, or owner_hash mismatch.
    #[error("deployment not found")]
    DeploymentNotFound,

    /// Hugging Face lookup failed outright.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Model exists but requires a token the caller didn't supply.
    #[error("model is gated and requires a token: {0}")]
    ModelGated(String),

    /// Caller-requested GPU tier is too small for the model.
    #[error("requested GPU tier is insufficient: {0}")]
    UnsupportedGpu(String),

    /// No GPU tier fits, or all candidates were exhausted by capacity errors.
    #[error("no suitable GPU capacity: {0}")]
    InsufficientGpu(String),

    /// Provider reported transient capacity exhaustion. Internal only —
    /// never crosses the HTTP boundary, always retried or converted into
    /// `InsufficientGpu` by the engine.
    #[error("provider capacity exhausted: {0}")]
    ProviderCapacity(String),

    /// Non-capacity provider failure.
    #[error("provider error: {0}")]
    Provider(String),

    /// A lifecycle phase exceeded its budget.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Webhook delivery retries were exhausted.
    #[error("webhook delivery failed: {0}")]
    WebhookDelivery(String),

    /// Ingress rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds the caller should wait before retrying.
        retry_after_secs: u64,
    },

    /// Model registry / HF metadata had no usable parameter map and the
    /// model isn't in the static registry either.
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    /// Store-level failure (transient or otherwise) that could not be
    /// classified more specifically by the caller.
    #[error("store error: {0}")]
    Store(String),
}

impl ApiError {
    /// Short machine-readable kind, used as the `error` field in the
    /// user-visible `{error, message, details}` envelope (spec.md §7).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::Unauthorized(_) => "UnauthorizedError",
            Self::DeploymentNotFound => "DeploymentNotFoundError",
            Self::ModelNotFound(_) => "ModelNotFoundError",
            Self::ModelGated(_) => "ModelGatedError",
            Self::UnsupportedGpu(_) => "UnsupportedGPUError",
            Self::InsufficientGpu(_) => "InsufficientGPUError",
            Self::ProviderCapacity(_) => "ProviderCapacityError",
            Self::Provider(_) => "ProviderError",
            Self::Timeout(_) => "TimeoutError",
            Self::WebhookDelivery(_) => "WebhookDeliveryError",
            Self::RateLimit { .. } => "RateLimitError",
            Self::UnsupportedModel(_) => "UnsupportedModelError",
            Self::Store(_) => "StoreError",
        }
    }
}
