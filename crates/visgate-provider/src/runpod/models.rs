//! RunPod serverless endpoint API wire types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct CreateEndpointBody {
    pub name: String,
    #[serde(rename = "templateId")]
    pub template_id: String,
    #[serde(rename = "imageName")]
    pub image_name: String,
    #[serde(rename = "gpuIds")]
    pub gpu_ids: String,
    #[serde(rename = "workersMin")]
    pub workers_min: u32,
    #[serde(rename = "workersMax")]
    pub workers_max: u32,
    #[serde(rename = "idleTimeout")]
    pub idle_timeout: u32,
    #[serde(rename = "scalerType")]
    pub scaler_type: String,
    #[serde(rename = "scalerValue")]
    pub scaler_value: u32,
    pub env: Vec<EnvPair>,
}

#[derive(Debug, Serialize)]
pub struct EnvPair {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct EndpointResource {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct EndpointHealthResponse {
    #[serde(default)]
    pub workers: WorkerCounts,
    #[serde(default)]
    pub jobs: Option<JobCounts>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkerCounts {
    #[serde(default)]
    pub running: u32,
    #[serde(default)]
    pub ready: u32,
    #[serde(default)]
    pub idle: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobCounts {
    #[serde(default)]
    pub failed: u32,
}
