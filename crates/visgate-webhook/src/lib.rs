//! Webhook Dispatcher (spec.md §4.10): delivers the `deployment_ready`
//! notification with bounded retries and secret masking.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use visgate_types::redact_secrets;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TOTAL_TIMEOUT_SECS: u64 = 30;
// spec.md §4.10 names an exponential schedule of 1s, 5s, 25s. Three
// numbers means three gaps, which means four attempts (the initial POST
// plus three retries), not three attempts as the prose summary says.
const MAX_ATTEMPTS: u32 = 4;
const BACKOFF_SCHEDULE: [u64; 3] = [1, 5, 25];

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("webhook delivery failed after {attempts} attempt(s): {message}")]
    DeliveryFailed { attempts: u32, message: String },
}

/// Ready-to-run sample the caller can paste straight into a terminal.
#[derive(Debug, Clone, Serialize)]
pub struct UsageExample {
    pub method: String,
    pub url: String,
    pub auth_header: String,
    pub sample_body: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReadyPayload {
    pub event: String,
    pub deployment_id: String,
    pub status: String,
    pub endpoint_url: String,
    pub model_id: String,
    pub gpu_allocated: String,
    pub duration_seconds: i64,
    pub usage_example: UsageExample,
}

impl DeploymentReadyPayload {
    #[must_use]
    pub fn new(
        deployment_id: impl Into<String>,
        endpoint_url: impl Into<String>,
        model_id: impl Into<String>,
        gpu_allocated: impl Into<String>,
        duration_seconds: i64,
    ) -> Self {
        let endpoint_url = endpoint_url.into();
        let usage_example = UsageExample {
            method: "POST".to_string(),
            url: format!("{endpoint_url}/run"),
            auth_header: "Authorization: Bearer <your-provider-key>".to_string(),
            sample_body: serde_json::json!({ "input": { "prompt": "a photo of a cat" } }),
        };

        Self {
            event: "deployment_ready".to_string(),
            deployment_id: deployment_id.into(),
            status: "ready".to_string(),
            endpoint_url,
            model_id: model_id.into(),
            gpu_allocated: gpu_allocated.into(),
            duration_seconds,
            usage_example,
        }
    }
}

/// Delivers `deployment_ready` notifications to caller-supplied webhook
/// URLs. Stateless; holds only a shared HTTP client, same shape as the
/// teacher's `SlackChannel`.
#[derive(Clone)]
pub struct WebhookDispatcher {
    client: Client,
}

impl WebhookDispatcher {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, WebhookError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .build()
            .map_err(|e| WebhookError::DeliveryFailed {
                attempts: 0,
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Deliver `payload` to `webhook_url`, retrying per spec.md §4.10's
    /// schedule. `secrets` are masked out of anything logged.
    ///
    /// # Errors
    /// Returns `WebhookError::DeliveryFailed` once retries are exhausted
    /// or a terminal (non-retryable) status is returned.
    pub async fn deliver(
        &self,
        webhook_url: &str,
        payload: &DeploymentReadyPayload,
        secrets: &[&str],
    ) -> Result<(), WebhookError> {
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            debug!(
                deployment_id = %payload.deployment_id,
                attempt,
                "delivering deployment_ready webhook"
            );

            match self.client.post(webhook_url).json(payload).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(deployment_id = %payload.deployment_id, "webhook delivered");
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let masked_body = redact_secrets(&body, secrets);
                    last_error = format!("{status}: {masked_body}");

                    if !is_retryable_status(status) {
                        warn!(
                            deployment_id = %payload.deployment_id,
                            status = %status,
                            "webhook returned a terminal error, not retrying"
                        );
                        return Err(WebhookError::DeliveryFailed {
                            attempts: attempt,
                            message: last_error,
                        });
                    }
                }
                Err(e) => {
                    last_error = redact_secrets(&e.to_string(), secrets);
                }
            }

            if let Some(&delay) = BACKOFF_SCHEDULE.get((attempt - 1) as usize) {
                tokio::time::sleep(Duration::from_secs(delay)).await;
            }
        }

        warn!(
            deployment_id = %payload.deployment_id,
            "webhook delivery exhausted all retries"
        );
        Err(WebhookError::DeliveryFailed {
            attempts: MAX_ATTEMPTS,
            message: last_error,
        })
    }
}

impl Default for WebhookDispatcher {
    fn default() -> Self {
        Self::new().expect("reqwest client construction must not fail for a plain timeout config")
    }
}

/// HTTP 5xx and network errors retry; 4xx are terminal except 408/429.
fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_payload() -> DeploymentReadyPayload {
        DeploymentReadyPayload::new(
            "visgate-2026-abcd1234",
            "https://api.runpod.ai/v2/ep_1",
            "stabilityai/sd-turbo",
            "A10",
            42,
        )
    }

    #[tokio::test]
    async fn delivers_successfully_on_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = WebhookDispatcher::new().unwrap();
        dispatcher
            .deliver(&server.uri(), &sample_payload(), &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn terminal_4xx_does_not_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = WebhookDispatcher::new().unwrap();
        let err = dispatcher
            .deliver(&server.uri(), &sample_payload(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::DeliveryFailed { attempts: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_429_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(MAX_ATTEMPTS as u64)
            .mount(&server)
            .await;

        let dispatcher = WebhookDispatcher::new().unwrap();
        let err = dispatcher
            .deliver(&server.uri(), &sample_payload(), &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WebhookError::DeliveryFailed { attempts, .. } if attempts == MAX_ATTEMPTS
        ));
    }

    #[test]
    fn secrets_are_masked_in_error_messages() {
        let masked = redact_secrets("token sk-secret-value leaked", &["sk-secret-value"]);
        assert!(!masked.contains("sk-secret-value"));
    }
}
