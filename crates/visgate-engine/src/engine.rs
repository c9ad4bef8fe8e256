//! Lifecycle Engine (spec.md §4.8) and Readiness Monitor (spec.md §4.9).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use visgate_catalog::{model_registry, select_candidates, vram_estimator, SelectorError};
use visgate_hf::{HfError, HfValidator};
use visgate_provider::{CreateEndpointRequest, Provider, ProviderError, ProviderFactory, WorkerEnvVars};
use visgate_store::{Store, StoreError};
use visgate_types::{
    Deployment, DeploymentError, DeploymentStatus, GpuAttempt, GpuSpec, LogLevel,
};
use visgate_webhook::{DeploymentReadyPayload, WebhookDispatcher};

use crate::config::EngineConfig;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Statuses the Readiness Monitor is allowed to transition out of.
const AWAITS_READINESS: [DeploymentStatus; 3] = [
    DeploymentStatus::CreatingEndpoint,
    DeploymentStatus::DownloadingModel,
    DeploymentStatus::LoadingModel,
];

/// All non-terminal-deleted statuses, used by `delete_deployment`'s
/// from-any-state compare-and-set.
const ALL_NON_DELETED: [DeploymentStatus; 9] = [
    DeploymentStatus::Validating,
    DeploymentStatus::SelectingGpu,
    DeploymentStatus::CreatingEndpoint,
    DeploymentStatus::DownloadingModel,
    DeploymentStatus::LoadingModel,
    DeploymentStatus::Ready,
    DeploymentStatus::Failed,
    DeploymentStatus::WebhookFailed,
    DeploymentStatus::Timeout,
];

/// Drives every deployment through the state machine in spec.md §4.8.
/// One `tokio::spawn`ed task per deployment; the engine itself holds only
/// the shared, stateless collaborators plus a table of cancellation
/// handles, mirroring the teacher's `RemediationTracker`.
pub struct Engine {
    store: Arc<dyn Store>,
    provider_factory: Arc<dyn ProviderFactory>,
    hf: HfValidator,
    webhook: WebhookDispatcher,
    config: EngineConfig,
    tasks: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl Engine {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        provider_factory: Arc<dyn ProviderFactory>,
        hf: HfValidator,
        webhook: WebhookDispatcher,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            provider_factory,
            hf,
            webhook,
            config,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Begin driving `deployment` from `validating`. `provider_key` and
    /// `hf_token` are never persisted; they live only for the lifetime of
    /// this task (and any provider/HF calls it makes).
    pub async fn spawn_deployment(
        self: &Arc<Self>,
        deployment: Deployment,
        provider_key: String,
        hf_token: Option<String>,
    ) {
        let id = deployment.id.clone();
        let cancel = CancellationToken::new();
        self.tasks.lock().await.insert(id.clone(), cancel.clone());

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let driver = Arc::clone(&engine);
            tokio::select! {
                () = cancel.cancelled() => {
                    info!(deployment_id = %id, "lifecycle task cancelled");
                }
                () = driver.drive(deployment, provider_key, hf_token, &cancel) => {}
            }
            engine.tasks.lock().await.remove(&id);
        });
    }

    /// Inbound readiness callback (spec.md §4.9). A no-op if the
    /// deployment is not currently awaiting readiness.
    pub async fn handle_ready_callback(&self, id: &str) -> Result<(), EngineError> {
        self.transition_to_ready(id).await.map(|_| ())
    }

    /// Valid from any state (spec.md §4.8). Best-effort provider delete,
    /// then marks `deleted` unconditionally. Idempotent: deleting an
    /// already-deleted deployment succeeds silently.
    pub async fn delete_deployment(&self, id: &str, provider_key: &str) -> Result<(), EngineError> {
        if let Some(cancel) = self.tasks.lock().await.remove(id) {
            cancel.cancel();
        }

        let deployment = match self.store.get_any(id).await {
            Ok(d) => d,
            Err(StoreError::NotFound) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if let Some(endpoint_id) = deployment.endpoint_id.clone() {
            match self.provider_factory.build(provider_key) {
                Ok(provider) => {
                    if let Err(e) = provider.delete_endpoint(&endpoint_id).await {
                        warn!(deployment_id = %id, error = %e, "best-effort provider delete failed");
                        let _ = self
                            .store
                            .append_log(id, LogLevel::Warn, &format!("provider delete failed: {e}"))
                            .await;
                    }
                }
                Err(e) => warn!(deployment_id = %id, error = %e, "could not build provider for delete"),
            }
        }

        self.transition_status_any(id, &ALL_NON_DELETED, DeploymentStatus::Deleted)
            .await?;
        Ok(())
    }

    async fn drive(
        self: Arc<Self>,
        deployment: Deployment,
        provider_key: String,
        hf_token: Option<String>,
        cancel: &CancellationToken,
    ) {
        let Some(deployment) = self.run_validating(&deployment, hf_token.as_deref()).await else {
            return;
        };

        let Some((deployment, candidates)) = self.run_selecting_gpu(&deployment).await else {
            return;
        };

        let Some((deployment, provider)) = self
            .run_creating_endpoint(&deployment, &provider_key, hf_token.as_deref(), &candidates)
            .await
        else {
            return;
        };

        self.run_readiness_wait(&deployment, provider.as_ref(), cancel).await;
    }

    async fn run_validating(&self, deployment: &Deployment, hf_token: Option<&str>) -> Option<Deployment> {
        let id = &deployment.id;
        let _ = self.store.append_log(id, LogLevel::Info, "validating").await;

        let metadata = match self.hf.validate(&deployment.model_id, hf_token).await {
            Ok(m) => m,
            Err(e) => {
                let kind = match &e {
                    HfError::ModelNotFound(_) => "model_not_found",
                    HfError::ModelGatedRequiresToken => "model_gated_requires_token",
                    HfError::ModelAccessDenied => "model_access_denied",
                    HfError::ModelRegistryUnreachable(_) => "model_registry_unreachable",
                };
                self.fail(id, DeploymentStatus::Validating, kind, &e.to_string())
                    .await;
                return None;
            }
        };

        let min_vram_gb = if let Some(registered) = model_registry::lookup(&deployment.model_id) {
            registered.min_vram_gb
        } else {
            let estimate = metadata
                .parameter_map
                .as_ref()
                .ok_or(vram_estimator::EstimatorError::NoParameterMap)
                .and_then(vram_estimator::estimate_min_vram_gb);
            match estimate {
                Ok(gb) => gb,
                Err(e) => {
                    self.fail(id, DeploymentStatus::Validating, "unsupported_model", &e.to_string())
                        .await;
                    return None;
                }
            }
        };

        let result = self
            .store
            .update(
                id,
                DeploymentStatus::Validating,
                Box::new(move |d: &mut Deployment| {
                    d.min_vram_gb = Some(min_vram_gb);
                    d.status = DeploymentStatus::SelectingGpu;
                }),
            )
            .await;

        match result {
            Ok(updated) => {
                let _ = self.store.append_log(id, LogLevel::Info, "selecting_gpu").await;
                Some(updated)
            }
            Err(_) => None,
        }
    }

    async fn run_selecting_gpu(&self, deployment: &Deployment) -> Option<(Deployment, Vec<GpuSpec>)> {
        let id = &deployment.id;
        let min_vram_gb = deployment.min_vram_gb.unwrap_or(0);

        let candidates = match select_candidates(min_vram_gb, deployment.requested_tier.as_deref()) {
            Ok(c) => c.into_iter().cloned().collect::<Vec<_>>(),
            Err(e) => {
                let kind = match &e {
                    SelectorError::UnsupportedGpu { .. } => "unsupported_gpu",
                    SelectorError::InsufficientGpu { .. } => "insufficient_gpu",
                };
                self.fail(id, DeploymentStatus::SelectingGpu, kind, &e.to_string())
                    .await;
                return None;
            }
        };

        let result = self
            .store
            .update(
                id,
                DeploymentStatus::SelectingGpu,
                Box::new(|d: &mut Deployment| d.status = DeploymentStatus::CreatingEndpoint),
            )
            .await;

        match result {
            Ok(updated) => {
                let _ = self.store.append_log(id, LogLevel::Info, "creating_endpoint").await;
                Some((updated, candidates))
            }
            Err(_) => None,
        }
    }

    async fn run_creating_endpoint(
        &self,
        deployment: &Deployment,
        provider_key: &str,
        hf_token: Option<&str>,
        candidates: &[GpuSpec],
    ) -> Option<(Deployment, Arc<dyn Provider>)> {
        let id = &deployment.id;

        let provider = match self.provider_factory.build(provider_key) {
            Ok(p) => p,
            Err(e) => {
                self.fail(id, DeploymentStatus::CreatingEndpoint, "provider_error", &e.to_string())
                    .await;
                return None;
            }
        };

        let webhook_callback = format!(
            "{}/internal/deployment-ready/{}",
            self.config.internal_webhook_base_url.trim_end_matches('/'),
            id
        );

        for candidate in candidates {
            let env_vars = WorkerEnvVars {
                hf_model_id: deployment.model_id.clone(),
                hf_token: hf_token.map(str::to_string),
                visgate_webhook: Some(webhook_callback.clone()),
                aws_access_key_id: deployment.s3.as_ref().map(|s| s.access_key_id.clone()),
                aws_secret_access_key: deployment.s3.as_ref().map(|s| s.secret_access_key.clone()),
                aws_endpoint_url: deployment.s3.as_ref().map(|s| s.endpoint_url.clone()),
                s3_model_url: deployment.s3.as_ref().map(|s| s.model_url.clone()),
            };

            let req = CreateEndpointRequest {
                name: id.clone(),
                image: self.config.docker_image.clone(),
                gpu_tier_id: candidate.tier_id.clone(),
                env_vars,
                scaling: self.config.scaling.clone(),
            };

            match provider.create_endpoint(req).await {
                Ok(endpoint) => {
                    let tier_id = candidate.tier_id.clone();
                    let endpoint_id = endpoint.endpoint_id.clone();
                    let endpoint_url = endpoint.endpoint_url.clone();

                    let result = self
                        .store
                        .update(
                            id,
                            DeploymentStatus::CreatingEndpoint,
                            Box::new(move |d: &mut Deployment| {
                                d.resolved_tier = Some(tier_id);
                                d.endpoint_id = Some(endpoint_id);
                                d.endpoint_url = Some(endpoint_url);
                                d.status = DeploymentStatus::DownloadingModel;
                            }),
                        )
                        .await;

                    return match result {
                        Ok(updated) => {
                            let _ = self.store.append_log(id, LogLevel::Info, "downloading_model").await;
                            Some((updated, provider))
                        }
                        Err(_) => None,
                    };
                }
                Err(ProviderError::Capacity(reason)) => {
                    let tier_id = candidate.tier_id.clone();
                    let reason_for_log = reason.clone();
                    let _ = self
                        .store
                        .update(
                            id,
                            DeploymentStatus::CreatingEndpoint,
                            Box::new(move |d: &mut Deployment| {
                                d.attempts.push(GpuAttempt {
                                    tier_id,
                                    failure_reason: reason,
                                });
                            }),
                        )
                        .await;
                    let _ = self
                        .store
                        .append_log(
                            id,
                            LogLevel::Warn,
                            &format!("capacity exhausted for {}: {reason_for_log}", candidate.tier_id),
                        )
                        .await;
                }
                Err(ProviderError::Generic(message)) => {
                    self.fail(id, DeploymentStatus::CreatingEndpoint, "provider_error", &message)
                        .await;
                    return None;
                }
            }
        }

        self.fail(
            id,
            DeploymentStatus::CreatingEndpoint,
            "insufficient_gpu",
            "all candidate GPU tiers reported capacity exhaustion",
        )
        .await;
        None
    }

    /// Polls `get_endpoint_status` on `config.poll_interval_secs` while the
    /// deployment is in an awaits-readiness status. Stops as soon as an
    /// inbound callback (or this poll itself) wins the race to `ready`, the
    /// phase timeout elapses, or `cancel` fires.
    async fn run_readiness_wait(&self, deployment: &Deployment, provider: &dyn Provider, cancel: &CancellationToken) {
        let id = deployment.id.clone();
        let Some(endpoint_id) = deployment.endpoint_id.clone() else {
            return;
        };
        let phase_start = Utc::now();

        loop {
            if cancel.is_cancelled() {
                return;
            }

            let current = match self.store.get_any(&id).await {
                Ok(d) => d,
                Err(_) => return,
            };
            if !current.status.awaits_readiness() {
                return;
            }

            let elapsed = (Utc::now() - phase_start).num_seconds().max(0) as u64;
            if elapsed > self.config.phase_timeout_secs {
                if self
                    .transition_status_any(&id, &AWAITS_READINESS, DeploymentStatus::Timeout)
                    .await
                    .is_ok()
                {
                    let _ = self
                        .store
                        .append_log(&id, LogLevel::Warn, "timeout waiting for readiness")
                        .await;
                }
                return;
            }

            match provider.get_endpoint_status(&endpoint_id).await {
                Ok(status) if status.workers_ready >= 1 => {
                    let _ = self.transition_to_ready(&id).await;
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(deployment_id = %id, error = %e, "readiness poll failed, will retry");
                }
            }

            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(Duration::from_secs(self.config.poll_interval_secs)) => {}
            }
        }
    }

    async fn transition_to_ready(&self, id: &str) -> Result<Option<Deployment>, EngineError> {
        let now = Utc::now();
        let Some(_) = self
            .transition_status_any(id, &AWAITS_READINESS, DeploymentStatus::Ready)
            .await?
        else {
            return Ok(None);
        };

        let updated = self
            .store
            .update(
                id,
                DeploymentStatus::Ready,
                Box::new(move |d: &mut Deployment| d.ready_at = Some(now)),
            )
            .await?;

        let _ = self.store.append_log(id, LogLevel::Info, "ready").await;
        self.dispatch_webhook(&updated).await;
        Ok(Some(updated))
    }

    async fn dispatch_webhook(&self, deployment: &Deployment) {
        let Some(endpoint_url) = deployment.endpoint_url.clone() else {
            return;
        };
        let duration_seconds = (deployment.ready_at.unwrap_or_else(Utc::now) - deployment.created_at)
            .num_seconds()
            .max(0);
        let gpu_allocated = deployment.resolved_tier.clone().unwrap_or_default();

        let payload = DeploymentReadyPayload::new(
            deployment.id.clone(),
            endpoint_url,
            deployment.model_id.clone(),
            gpu_allocated,
            duration_seconds,
        );

        let secrets: Vec<&str> = deployment
            .s3
            .as_ref()
            .map(|s| vec![s.secret_access_key.as_str()])
            .unwrap_or_default();

        if let Err(e) = self
            .webhook
            .deliver(&deployment.webhook_url, &payload, &secrets)
            .await
        {
            warn!(deployment_id = %deployment.id, error = %e, "webhook delivery exhausted retries");
            let _ = self
                .store
                .update(
                    &deployment.id,
                    DeploymentStatus::Ready,
                    Box::new(|d: &mut Deployment| d.status = DeploymentStatus::WebhookFailed),
                )
                .await;
            let _ = self
                .store
                .append_log(&deployment.id, LogLevel::Error, &format!("webhook delivery failed: {e}"))
                .await;
        }
    }

    /// Tries `update(id, candidate, set status = target)` for each
    /// candidate in order, returning the first success. All candidates
    /// mismatching means the deployment is already past this point — a
    /// no-op, not an error (spec.md §4.8 idempotence).
    async fn transition_status_any(
        &self,
        id: &str,
        candidates: &[DeploymentStatus],
        target: DeploymentStatus,
    ) -> Result<Option<Deployment>, EngineError> {
        for &status in candidates {
            let result = self
                .store
                .update(id, status, Box::new(move |d: &mut Deployment| d.status = target))
                .await;
            match result {
                Ok(updated) => return Ok(Some(updated)),
                Err(StoreError::StatusMismatch { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    async fn fail(&self, id: &str, expected: DeploymentStatus, kind: &str, message: &str) {
        let kind_owned = kind.to_string();
        let message_owned = message.to_string();
        let result = self
            .store
            .update(
                id,
                expected,
                Box::new(move |d: &mut Deployment| {
                    d.status = DeploymentStatus::Failed;
                    d.error = Some(DeploymentError {
                        kind: kind_owned,
                        message: message_owned,
                    });
                }),
            )
            .await;
        if result.is_ok() {
            let _ = self
                .store
                .append_log(id, LogLevel::Error, &format!("failed: {message}"))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use visgate_hf::HfValidator;
    use visgate_provider::{Endpoint, EndpointStatus};
    use visgate_store::InMemoryStore;
    use visgate_types::CacheScope;

    struct NeverCalledProvider;

    #[async_trait]
    impl Provider for NeverCalledProvider {
        async fn create_endpoint(&self, _req: CreateEndpointRequest) -> Result<Endpoint, ProviderError> {
            panic!("not exercised by these tests")
        }
        async fn delete_endpoint(&self, _endpoint_id: &str) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn list_endpoints(&self) -> Result<Vec<Endpoint>, ProviderError> {
            Ok(vec![])
        }
        async fn get_endpoint_status(&self, _endpoint_id: &str) -> Result<EndpointStatus, ProviderError> {
            panic!("not exercised by these tests")
        }
    }

    struct FakeFactory;

    impl ProviderFactory for FakeFactory {
        fn build(&self, _api_key: &str) -> Result<Arc<dyn Provider>, ProviderError> {
            Ok(Arc::new(NeverCalledProvider))
        }
    }

    fn test_engine() -> (Engine, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let engine = Engine::new(
            store.clone(),
            Arc::new(FakeFactory),
            HfValidator::new(reqwest::Client::new()),
            WebhookDispatcher::new().unwrap(),
            EngineConfig {
                internal_webhook_base_url: "https://gateway.example.com".to_string(),
                ..EngineConfig::default()
            },
        );
        (engine, store)
    }

    fn ready_deployment(id: &str) -> Deployment {
        let now = Utc::now();
        Deployment {
            id: id.to_string(),
            owner_hash: "owner".to_string(),
            model_id: "stabilityai/sd-turbo".to_string(),
            provider_hint: None,
            model_name_alias: None,
            requested_tier: None,
            resolved_tier: Some("NVIDIA A10".to_string()),
            min_vram_gb: Some(8),
            endpoint_id: None,
            endpoint_url: Some("https://api.runpod.ai/v2/ep_1".to_string()),
            webhook_url: "https://caller.example.com/hook".to_string(),
            cache_scope: CacheScope::Off,
            s3: None,
            status: DeploymentStatus::Ready,
            error: None,
            created_at: now,
            updated_at: now,
            ready_at: Some(now),
            attempts: vec![],
        }
    }

    #[tokio::test]
    async fn deleting_an_already_ready_deployment_transitions_to_deleted() {
        let (engine, store) = test_engine();
        let deployment = ready_deployment("visgate-2026-aaaa1111");
        store.create(deployment.clone()).await.unwrap();

        engine.delete_deployment(&deployment.id, "provider-key").await.unwrap();

        let fetched = store.get_any(&deployment.id).await.unwrap();
        assert_eq!(fetched.status, DeploymentStatus::Deleted);
    }

    #[tokio::test]
    async fn deleting_twice_is_idempotent() {
        let (engine, store) = test_engine();
        let deployment = ready_deployment("visgate-2026-bbbb2222");
        store.create(deployment.clone()).await.unwrap();

        engine.delete_deployment(&deployment.id, "provider-key").await.unwrap();
        engine.delete_deployment(&deployment.id, "provider-key").await.unwrap();

        let fetched = store.get_any(&deployment.id).await.unwrap();
        assert_eq!(fetched.status, DeploymentStatus::Deleted);
    }

    #[tokio::test]
    async fn ready_callback_on_non_awaiting_deployment_is_a_no_op() {
        let (engine, store) = test_engine();
        let deployment = ready_deployment("visgate-2026-cccc3333");
        store.create(deployment.clone()).await.unwrap();

        engine.handle_ready_callback(&deployment.id).await.unwrap();

        let fetched = store.get_any(&deployment.id).await.unwrap();
        assert_eq!(fetched.status, DeploymentStatus::Ready);
    }

    #[tokio::test]
    async fn deleting_unknown_deployment_is_a_no_op() {
        let (engine, _store) = test_engine();
        engine
            .delete_deployment("visgate-2026-doesnotexist", "provider-key")
            .await
            .unwrap();
    }
}
