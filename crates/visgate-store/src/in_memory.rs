//! In-memory `Store`, for local development and tests (spec.md §4.7).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;
use visgate_types::{Deployment, DeploymentStatus, LogEntry, LogLevel};

use crate::traits::{DeploymentPatch, Store, StoreError};

/// A single process-wide mutex guards both maps, giving `update` true
/// compare-and-set semantics — matching the durable store's per-document
/// transaction, not just Rust's aliasing rules.
#[derive(Default)]
pub struct InMemoryStore {
    deployments: Arc<Mutex<HashMap<String, Deployment>>>,
    logs: Arc<Mutex<HashMap<String, Vec<LogEntry>>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create(&self, deployment: Deployment) -> Result<(), StoreError> {
        let mut deployments = self.deployments.lock().await;
        if deployments.contains_key(&deployment.id) {
            return Err(StoreError::AlreadyExists);
        }
        debug!(id = %deployment.id, "creating deployment in memory store");
        deployments.insert(deployment.id.clone(), deployment);
        Ok(())
    }

    async fn get(&self, id: &str, owner_hash: &str) -> Result<Deployment, StoreError> {
        let deployments = self.deployments.lock().await;
        let deployment = deployments.get(id).ok_or(StoreError::NotFound)?;
        if !deployment.is_owned_by(owner_hash) {
            return Err(StoreError::NotFound);
        }
        Ok(deployment.clone())
    }

    async fn get_any(&self, id: &str) -> Result<Deployment, StoreError> {
        let deployments = self.deployments.lock().await;
        deployments.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update(
        &self,
        id: &str,
        expected_status: DeploymentStatus,
        patch: DeploymentPatch,
    ) -> Result<Deployment, StoreError> {
        let mut deployments = self.deployments.lock().await;
        let deployment = deployments.get_mut(id).ok_or(StoreError::NotFound)?;

        if deployment.status != expected_status {
            return Err(StoreError::StatusMismatch {
                expected: expected_status,
                actual: deployment.status,
            });
        }

        patch(deployment);
        deployment.updated_at = Utc::now();
        Ok(deployment.clone())
    }

    async fn append_log(
        &self,
        id: &str,
        level: LogLevel,
        message: &str,
    ) -> Result<(), StoreError> {
        {
            let deployments = self.deployments.lock().await;
            if !deployments.contains_key(id) {
                return Err(StoreError::NotFound);
            }
        }

        let mut logs = self.logs.lock().await;
        logs.entry(id.to_string()).or_default().push(LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
        });
        Ok(())
    }

    async fn get_logs(&self, id: &str, limit: usize) -> Result<Vec<LogEntry>, StoreError> {
        let logs = self.logs.lock().await;
        let Some(entries) = logs.get(id) else {
            return Ok(vec![]);
        };
        let start = entries.len().saturating_sub(limit);
        Ok(entries[start..].to_vec())
    }

    async fn find_reusable(
        &self,
        owner_hash: &str,
        model_id: &str,
        gpu_tier: Option<&str>,
    ) -> Result<Option<Deployment>, StoreError> {
        let deployments = self.deployments.lock().await;
        let found = deployments.values().find(|d| {
            d.owner_hash == owner_hash
                && d.model_id == model_id
                && d.requested_tier.as_deref() == gpu_tier
                && d.status != DeploymentStatus::Failed
                && d.status != DeploymentStatus::Deleted
                && d.status != DeploymentStatus::Timeout
        });
        Ok(found.cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visgate_types::new_deployment_id;

    fn sample(owner_hash: &str) -> Deployment {
        let now = Utc::now();
        Deployment {
            id: new_deployment_id(),
            owner_hash: owner_hash.to_string(),
            model_id: "stabilityai/sd-turbo".to_string(),
            provider_hint: None,
            model_name_alias: None,
            requested_tier: None,
            resolved_tier: None,
            min_vram_gb: None,
            endpoint_id: None,
            endpoint_url: None,
            webhook_url: "https://example.com/hook".to_string(),
            cache_scope: visgate_types::CacheScope::Off,
            s3: None,
            status: DeploymentStatus::Validating,
            error: None,
            created_at: now,
            updated_at: now,
            ready_at: None,
            attempts: vec![],
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryStore::new();
        let deployment = sample("owner-a");
        let id = deployment.id.clone();
        store.create(deployment).await.unwrap();

        let fetched = store.get(&id, "owner-a").await.unwrap();
        assert_eq!(fetched.id, id);
    }

    #[tokio::test]
    async fn get_with_wrong_owner_is_not_found() {
        let store = InMemoryStore::new();
        let deployment = sample("owner-a");
        let id = deployment.id.clone();
        store.create(deployment).await.unwrap();

        let err = store.get(&id, "owner-b").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = InMemoryStore::new();
        let deployment = sample("owner-a");
        store.create(deployment.clone()).await.unwrap();
        let err = store.create(deployment).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn update_enforces_compare_and_set() {
        let store = InMemoryStore::new();
        let deployment = sample("owner-a");
        let id = deployment.id.clone();
        store.create(deployment).await.unwrap();

        let err = store
            .update(
                &id,
                DeploymentStatus::Ready,
                Box::new(|d| d.status = DeploymentStatus::Deleted),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StatusMismatch { .. }));

        let updated = store
            .update(
                &id,
                DeploymentStatus::Validating,
                Box::new(|d| d.status = DeploymentStatus::SelectingGpu),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, DeploymentStatus::SelectingGpu);
    }

    #[tokio::test]
    async fn append_log_requires_existing_deployment() {
        let store = InMemoryStore::new();
        let err = store
            .append_log("missing", LogLevel::Info, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
