//! The `Deployment` entity and its satellite types (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where model weights are fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    /// Fetch weights fresh on every deployment.
    Off,
    /// Reuse weights from a platform-managed object store.
    Shared,
    /// Reuse weights from caller-owned S3-compatible storage.
    Private,
}

impl Default for CacheScope {
    fn default() -> Self {
        Self::Off
    }
}

/// Caller-owned S3-compatible storage, required iff `cache_scope == Private`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Credentials {
    /// S3-compatible endpoint URL.
    pub endpoint_url: String,
    /// Bucket/object URL where weights live.
    pub model_url: String,
    /// AWS-style access key id.
    pub access_key_id: String,
    /// AWS-style secret access key. Never logged; always redacted via
    /// [`crate::mask::redact_secrets`] before any serialization for
    /// logging purposes.
    pub secret_access_key: String,
}

/// The authoritative lifecycle state of a deployment (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Validating,
    SelectingGpu,
    CreatingEndpoint,
    DownloadingModel,
    LoadingModel,
    Ready,
    Failed,
    WebhookFailed,
    Deleted,
    Timeout,
}

impl DeploymentStatus {
    /// Whether this status is a terminal state the lifecycle engine no
    /// longer advances out of on its own (a `delete` can still apply).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Ready
                | Self::Failed
                | Self::WebhookFailed
                | Self::Deleted
                | Self::Timeout
        )
    }

    /// Whether the readiness monitor is allowed to observe this status
    /// (spec.md §4.9: callbacks outside this set are no-ops).
    #[must_use]
    pub fn awaits_readiness(self) -> bool {
        matches!(
            self,
            Self::CreatingEndpoint | Self::DownloadingModel | Self::LoadingModel
        )
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validating => "validating",
            Self::SelectingGpu => "selecting_gpu",
            Self::CreatingEndpoint => "creating_endpoint",
            Self::DownloadingModel => "downloading_model",
            Self::LoadingModel => "loading_model",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::WebhookFailed => "webhook_failed",
            Self::Deleted => "deleted",
            Self::Timeout => "timeout",
        };
        write!(f, "{s}")
    }
}

/// Kind + message recorded on a terminal-non-ready deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentError {
    /// Machine-readable error kind (matches [`crate::error::ApiError::kind`]).
    pub kind: String,
    /// Human-readable message. Never contains a raw secret.
    pub message: String,
}

/// One capacity-fallback attempt recorded while creating an endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuAttempt {
    /// The tier id that was tried.
    pub tier_id: String,
    /// Why it failed (capacity message, or terminal error summary).
    pub failure_reason: String,
}

/// The central entity: a caller's request to run a model on a rented GPU,
/// plus the lifecycle driving it to readiness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// Opaque, human-recognizable id: `visgate-<year>-<suffix>`.
    pub id: String,
    /// SHA-256 of the caller's provider key. Proof of ownership; the raw
    /// key is never stored.
    pub owner_hash: String,
    /// Resolved Hugging Face model identifier.
    pub model_id: String,
    /// Optional hint for indirect resolution (provider-specific alias).
    pub provider_hint: Option<String>,
    /// Optional human-friendly model name used to resolve `model_id`.
    pub model_name_alias: Option<String>,
    /// User-requested GPU tier alias, if any.
    pub requested_tier: Option<String>,
    /// Actually-chosen GPU tier id, set once selection succeeds.
    pub resolved_tier: Option<String>,
    /// Computed memory floor in GB.
    pub min_vram_gb: Option<u32>,
    /// Provider-native endpoint id, set once creation is acknowledged.
    pub endpoint_id: Option<String>,
    /// Public endpoint URL, set once creation is acknowledged.
    pub endpoint_url: Option<String>,
    /// Caller callback target for the ready notification.
    pub webhook_url: String,
    /// Weight-caching strategy.
    pub cache_scope: CacheScope,
    /// Caller-owned S3 credentials, present iff `cache_scope == Private`.
    pub s3: Option<S3Credentials>,
    /// Current lifecycle status.
    pub status: DeploymentStatus,
    /// Populated when `status` is terminal and not `ready`.
    pub error: Option<DeploymentError>,
    /// When the deployment was accepted.
    pub created_at: DateTime<Utc>,
    /// Last time any field changed.
    pub updated_at: DateTime<Utc>,
    /// When the endpoint first became ready. Never cleared once set.
    pub ready_at: Option<DateTime<Utc>>,
    /// Capacity-fallback audit trail.
    pub attempts: Vec<GpuAttempt>,
}

impl Deployment {
    /// `resolved_tier.vram_gb >= min_vram_gb` and `endpoint_id` invariants
    /// are enforced by the engine at each transition, not here — this type
    /// is a plain data holder, matching the teacher's `GpuVm`/`Instance`
    /// structs which carry no behavior of their own.
    #[must_use]
    pub fn is_owned_by(&self, owner_hash: &str) -> bool {
        self.owner_hash == owner_hash
    }
}

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// An append-only log entry parented by deployment id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}
