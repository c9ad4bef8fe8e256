//! Lifecycle Engine (spec.md §4.8) with an embedded Readiness Monitor
//! (§4.9): the component that actually drives a deployment from
//! `validating` through to `ready` (or a terminal failure).

pub mod config;
pub mod engine;

pub use config::EngineConfig;
pub use engine::{Engine, EngineError};
