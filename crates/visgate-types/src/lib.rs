//! Shared domain types and error taxonomy for the VisGate deployment
//! gateway.
//!
//! Every other VisGate crate depends on this one for `Deployment`,
//! `LogEntry`, `ModelSpec`/`GpuSpec`, and the `ApiError` taxonomy, so that
//! no crate has to duplicate them or introduce a dependency cycle.

pub mod catalog;
pub mod deployment;
pub mod error;
pub mod ids;
pub mod mask;

pub use catalog::{GpuSpec, ModelSpec};
pub use deployment::{
    CacheScope, Deployment, DeploymentError, DeploymentStatus, GpuAttempt, LogEntry, LogLevel,
    S3Credentials,
};
pub use error::ApiError;
pub use ids::{new_deployment_id, owner_hash};
pub use mask::redact_secrets;
