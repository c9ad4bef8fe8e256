//! RunPod serverless endpoint client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use super::models::{CreateEndpointBody, EndpointHealthResponse, EndpointResource, EnvPair};
use crate::traits::{
    CreateEndpointRequest, Endpoint, EndpointStatus, Provider, ProviderError, ProviderFactory,
};
use async_trait::async_trait;

const API_BASE_URL: &str = "https://rest.runpod.io/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Substrings RunPod is known to put in an error body when no worker of
/// the requested GPU type can currently be scheduled. Matched against the
/// lowercased response body, never the status code alone, since RunPod
/// returns plain 400s for both capacity and validation failures.
const CAPACITY_MARKERS: &[&str] = &[
    "no instances available",
    "insufficient capacity",
    "no capacity",
    "out of stock",
];

/// RunPod serverless endpoint provider.
#[derive(Clone)]
pub struct RunPod {
    client: Client,
    api_key: String,
    template_id: String,
    docker_image: String,
}

impl RunPod {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        template_id: impl Into<String>,
        docker_image: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Generic(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            template_id: template_id.into(),
            docker_image: docker_image.into(),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let url = format!("{API_BASE_URL}{path}");
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Generic(e.to_string()))?;

        self.handle_response(response).await
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ProviderError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        let url = format!("{API_BASE_URL}{path}");
        debug!(url = %url, "POST request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Generic(e.to_string()))?;

        self.handle_response(response).await
    }

    async fn delete(&self, path: &str) -> Result<(), ProviderError> {
        let url = format!("{API_BASE_URL}{path}");
        debug!(url = %url, "DELETE request");

        let response = self
            .client
            .delete(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Generic(e.to_string()))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(classify(status, &text))
        }
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Generic(e.to_string()))?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "failed to parse RunPod response");
                ProviderError::Generic(e.to_string())
            })
        } else {
            Err(classify(status, &text))
        }
    }
}

/// Split a non-2xx response into capacity vs. everything else.
fn classify(status: StatusCode, body: &str) -> ProviderError {
    let lowered = body.to_ascii_lowercase();
    if CAPACITY_MARKERS.iter().any(|m| lowered.contains(m)) {
        return ProviderError::Capacity(body.to_string());
    }
    ProviderError::Generic(format!("{status}: {body}"))
}

#[async_trait]
impl Provider for RunPod {
    async fn create_endpoint(&self, req: CreateEndpointRequest) -> Result<Endpoint, ProviderError> {
        info!(name = %req.name, gpu_tier = %req.gpu_tier_id, "creating RunPod endpoint");

        let mut env = vec![EnvPair {
            key: "HF_MODEL_ID".to_string(),
            value: req.env_vars.hf_model_id,
        }];
        if let Some(token) = req.env_vars.hf_token {
            env.push(EnvPair {
                key: "HF_TOKEN".to_string(),
                value: token,
            });
        }
        if let Some(webhook) = req.env_vars.visgate_webhook {
            env.push(EnvPair {
                key: "VISGATE_WEBHOOK".to_string(),
                value: webhook,
            });
        }
        if let Some(v) = req.env_vars.aws_access_key_id {
            env.push(EnvPair {
                key: "AWS_ACCESS_KEY_ID".to_string(),
                value: v,
            });
        }
        if let Some(v) = req.env_vars.aws_secret_access_key {
            env.push(EnvPair {
                key: "AWS_SECRET_ACCESS_KEY".to_string(),
                value: v,
            });
        }
        if let Some(v) = req.env_vars.aws_endpoint_url {
            env.push(EnvPair {
                key: "AWS_ENDPOINT_URL".to_string(),
                value: v,
            });
        }
        if let Some(v) = req.env_vars.s3_model_url {
            env.push(EnvPair {
                key: "S3_MODEL_URL".to_string(),
                value: v,
            });
        }

        let body = CreateEndpointBody {
            name: format!("visgate-{}", req.name),
            template_id: self.template_id.clone(),
            image_name: if req.image.is_empty() {
                self.docker_image.clone()
            } else {
                req.image
            },
            gpu_ids: req.gpu_tier_id,
            workers_min: req.scaling.workers_min,
            workers_max: req.scaling.workers_max,
            idle_timeout: req.scaling.idle_timeout_seconds,
            scaler_type: req.scaling.scaler_type,
            scaler_value: req.scaling.scaler_value,
            env,
        };

        let resource: EndpointResource = self.post("/endpoints", &body).await?;
        let endpoint = Endpoint {
            endpoint_url: format!("https://api.runpod.ai/v2/{}", resource.id),
            endpoint_id: resource.id,
        };

        info!(endpoint_id = %endpoint.endpoint_id, "RunPod endpoint created");
        Ok(endpoint)
    }

    async fn delete_endpoint(&self, endpoint_id: &str) -> Result<(), ProviderError> {
        info!(endpoint_id = %endpoint_id, "deleting RunPod endpoint");
        self.delete(&format!("/endpoints/{endpoint_id}")).await
    }

    async fn list_endpoints(&self) -> Result<Vec<Endpoint>, ProviderError> {
        let resources: Vec<EndpointResource> = self.get("/endpoints").await?;
        Ok(resources
            .into_iter()
            .map(|r| Endpoint {
                endpoint_url: format!("https://api.runpod.ai/v2/{}", r.id),
                endpoint_id: r.id,
            })
            .collect())
    }

    async fn get_endpoint_status(&self, endpoint_id: &str) -> Result<EndpointStatus, ProviderError> {
        let health: EndpointHealthResponse = self
            .get(&format!("/endpoints/{endpoint_id}/health"))
            .await?;

        let last_error = health
            .jobs
            .filter(|j| j.failed > 0)
            .map(|j| format!("{} failed job(s) reported", j.failed));

        Ok(EndpointStatus {
            created: true,
            workers_ready: health.workers.ready,
            last_error,
        })
    }
}

/// Builds a [`RunPod`] provider bound to one caller-supplied API key.
pub struct RunPodFactory {
    template_id: String,
    docker_image: String,
}

impl RunPodFactory {
    #[must_use]
    pub fn new(template_id: impl Into<String>, docker_image: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            docker_image: docker_image.into(),
        }
    }
}

impl ProviderFactory for RunPodFactory {
    fn build(&self, api_key: &str) -> Result<Arc<dyn Provider>, ProviderError> {
        let provider = RunPod::new(api_key, self.template_id.clone(), self.docker_image.clone())?;
        Ok(Arc::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_marker_is_detected_case_insensitively() {
        let err = classify(StatusCode::BAD_REQUEST, "No Instances Available for gpuIds");
        assert!(err.is_capacity());
    }

    #[test]
    fn unrelated_400_is_generic() {
        let err = classify(StatusCode::BAD_REQUEST, "templateId is required");
        assert!(!err.is_capacity());
    }

    #[test]
    fn server_error_without_marker_is_generic() {
        let err = classify(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        assert!(!err.is_capacity());
    }
}
