//! Provider Adapter (spec.md §4.5): a stable interface over the concrete
//! serverless-GPU backend, RunPod.

pub mod runpod;
pub mod traits;

pub use runpod::{RunPod, RunPodFactory};
pub use traits::{
    CreateEndpointRequest, Endpoint, EndpointStatus, Provider, ProviderError, ProviderFactory,
    WorkerEnvVars, WorkerScalingConfig,
};
