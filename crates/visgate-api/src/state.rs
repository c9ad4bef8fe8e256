//! Shared handler state (spec.md §6), the `visgate-api` analogue of the
//! teacher's `ServerState`/`PlatformServerState`.

use std::sync::Arc;

use visgate_engine::{Engine, EngineConfig};
use visgate_store::Store;

use crate::rate_limit::RateLimiter;

pub struct ApiState {
    pub store: Arc<dyn Store>,
    pub engine: Arc<Engine>,
    pub config: EngineConfig,
    pub rate_limiter: RateLimiter,
    /// Default page size for `GET /v1/deployments/{id}` log history.
    pub default_log_limit: usize,
}

impl ApiState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, engine: Arc<Engine>, config: EngineConfig) -> Self {
        Self {
            store,
            engine,
            config,
            rate_limiter: RateLimiter::new(100, 60),
            default_log_limit: 100,
        }
    }
}
