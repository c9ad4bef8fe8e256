//! Plain-data configuration consumed by the engine (spec.md §6.3). The
//! `visgate` binary is responsible for reading these from the process
//! environment; this crate only holds the resolved values.

use visgate_provider::WorkerScalingConfig;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub docker_image: String,
    pub scaling: WorkerScalingConfig,
    /// Base URL the engine builds `VISGATE_WEBHOOK` callback URLs from,
    /// e.g. `https://gateway.example.com`.
    pub internal_webhook_base_url: String,
    /// Shared-secret header value the inbound callback endpoint checks,
    /// if configured.
    pub internal_webhook_secret: Option<String>,
    /// Per-phase budget from `creating_endpoint` entry (spec.md §5).
    pub phase_timeout_secs: u64,
    /// Readiness poll interval (spec.md §4.9, default 5s).
    pub poll_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            docker_image: String::new(),
            scaling: WorkerScalingConfig::default(),
            internal_webhook_base_url: String::new(),
            internal_webhook_secret: None,
            phase_timeout_secs: 20 * 60,
            poll_interval_secs: 5,
        }
    }
}
