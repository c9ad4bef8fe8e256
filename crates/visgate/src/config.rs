//! Environment-driven configuration (spec.md §6.3), read the same way
//! `pm::bin::status_sync::Config::from_env` builds its config: a flat
//! struct assembled from `std::env::var` with explicit defaults, no
//! config-file or `clap::Parser` layer since nothing here is meant to be
//! typed on a command line.

use visgate_provider::WorkerScalingConfig;

pub struct AppConfig {
    pub gcp_project_id: String,
    pub use_memory_repo: bool,
    pub gcp_access_token: String,
    pub runpod_template_id: String,
    pub docker_image: String,
    pub scaling: WorkerScalingConfig,
    pub internal_webhook_base_url: String,
    pub internal_webhook_secret: Option<String>,
    pub bind_addr: String,
    pub log_level: String,
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl AppConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            gcp_project_id: std::env::var("GCP_PROJECT_ID").unwrap_or_default(),
            use_memory_repo: std::env::var("USE_MEMORY_REPO")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            // No in-process OAuth flow: the operator is expected to mint a
            // short-lived token (e.g. via a metadata-server sidecar) and
            // inject it here. See DESIGN.md.
            gcp_access_token: std::env::var("GCP_ACCESS_TOKEN").unwrap_or_default(),
            runpod_template_id: std::env::var("RUNPOD_TEMPLATE_ID").unwrap_or_default(),
            docker_image: std::env::var("DOCKER_IMAGE").unwrap_or_default(),
            scaling: WorkerScalingConfig {
                workers_min: env_u32("RUNPOD_WORKERS_MIN", 0),
                workers_max: env_u32("RUNPOD_WORKERS_MAX", 3),
                idle_timeout_seconds: env_u32("RUNPOD_IDLE_TIMEOUT_SECONDS", 120),
                scaler_type: std::env::var("RUNPOD_SCALER_TYPE").unwrap_or_else(|_| "QUEUE_DELAY".to_string()),
                scaler_value: env_u32("RUNPOD_SCALER_VALUE", 1),
            },
            internal_webhook_base_url: std::env::var("INTERNAL_WEBHOOK_BASE_URL").unwrap_or_default(),
            internal_webhook_secret: std::env::var("INTERNAL_WEBHOOK_SECRET").ok(),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    #[must_use]
    pub fn use_firestore(&self) -> bool {
        !self.use_memory_repo && !self.gcp_project_id.is_empty()
    }
}
