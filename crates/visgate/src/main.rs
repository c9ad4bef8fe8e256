//! VisGate entry point: wires the Store, Provider factory, HF Validator,
//! Webhook Dispatcher and Lifecycle Engine together behind the HTTP
//! surface, the same top-to-bottom assembly style as
//! `pm::bin::status_sync::main`.

mod config;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use visgate_api::{run_server, ApiState};
use visgate_engine::{Engine, EngineConfig};
use visgate_hf::HfValidator;
use visgate_provider::RunPodFactory;
use visgate_store::{FirestoreStore, InMemoryStore, Store};
use visgate_webhook::WebhookDispatcher;

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env();

    tracing_subscriber::fmt().with_env_filter(config.log_level.clone()).init();

    info!(
        bind_addr = %config.bind_addr,
        use_firestore = config.use_firestore(),
        "starting VisGate"
    );

    let store: Arc<dyn Store> = if config.use_firestore() {
        Arc::new(FirestoreStore::new(
            config.gcp_project_id.clone(),
            config.gcp_access_token.clone(),
        )?)
    } else {
        info!("using in-memory store");
        Arc::new(InMemoryStore::new())
    };

    let provider_factory = Arc::new(RunPodFactory::new(
        config.runpod_template_id.clone(),
        config.docker_image.clone(),
    ));

    let hf = HfValidator::new(reqwest::Client::new());
    let webhook = WebhookDispatcher::new()?;

    let engine_config = EngineConfig {
        docker_image: config.docker_image.clone(),
        scaling: config.scaling.clone(),
        internal_webhook_base_url: config.internal_webhook_base_url.clone(),
        internal_webhook_secret: config.internal_webhook_secret.clone(),
        ..EngineConfig::default()
    };

    let engine = Arc::new(Engine::new(
        store.clone(),
        provider_factory,
        hf,
        webhook,
        engine_config.clone(),
    ));

    let state = Arc::new(ApiState::new(store, engine, engine_config));
    run_server(state, &config.bind_addr).await?;

    Ok(())
}
