//! State Store trait (spec.md §4.7).

use async_trait::async_trait;
use thiserror::Error;
use visgate_types::{Deployment, DeploymentStatus, LogEntry, LogLevel};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("deployment already exists")]
    AlreadyExists,

    #[error("deployment not found")]
    NotFound,

    #[error("expected status {expected}, found {actual}")]
    StatusMismatch {
        expected: DeploymentStatus,
        actual: DeploymentStatus,
    },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// A mutation applied to a deployment already known to be in the expected
/// status. Kept as a plain closure rather than a field-by-field patch
/// struct since callers (the lifecycle engine) already hold the specific
/// field values they want to set and there is no wire format to match.
pub type DeploymentPatch = Box<dyn FnOnce(&mut Deployment) + Send>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with `AlreadyExists` if the id is already present.
    async fn create(&self, deployment: Deployment) -> Result<(), StoreError>;

    /// Returns the deployment iff `owner_hash` matches, else `NotFound`.
    async fn get(&self, id: &str, owner_hash: &str) -> Result<Deployment, StoreError>;

    /// Returns the deployment regardless of owner. For internal callers
    /// only (the lifecycle engine, the inbound readiness callback) — the
    /// owner check in [`Store::get`] is an API-boundary concern, not a
    /// storage-layer one.
    async fn get_any(&self, id: &str) -> Result<Deployment, StoreError>;

    /// Compare-and-set on `status`: applies `patch` only if the stored
    /// deployment's status equals `expected_status`, then returns the
    /// updated document. Also bumps `updated_at`.
    async fn update(
        &self,
        id: &str,
        expected_status: DeploymentStatus,
        patch: DeploymentPatch,
    ) -> Result<Deployment, StoreError>;

    async fn append_log(
        &self,
        id: &str,
        level: LogLevel,
        message: &str,
    ) -> Result<(), StoreError>;

    /// Returns the most recent `limit` log entries, oldest first.
    async fn get_logs(&self, id: &str, limit: usize) -> Result<Vec<LogEntry>, StoreError>;

    /// Returns an existing non-failed deployment with an identical
    /// fingerprint, if any. An optional optimization; returning `Ok(None)`
    /// unconditionally is a valid implementation.
    async fn find_reusable(
        &self,
        owner_hash: &str,
        model_id: &str,
        gpu_tier: Option<&str>,
    ) -> Result<Option<Deployment>, StoreError>;
}
