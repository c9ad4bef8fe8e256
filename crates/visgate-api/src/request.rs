//! `POST /v1/deployments` request body (spec.md §6.1).

use chrono::Utc;
use serde::Deserialize;
use visgate_types::{new_deployment_id, owner_hash, ApiError, CacheScope, Deployment, DeploymentStatus, S3Credentials};

#[derive(Debug, Deserialize)]
pub struct CreateDeploymentRequest {
    pub hf_model_id: Option<String>,
    pub model_name: Option<String>,
    pub provider: Option<String>,
    pub user_webhook_url: String,
    pub gpu_tier: Option<String>,
    pub hf_token: Option<String>,
    #[serde(default)]
    pub cache_scope: Option<CacheScope>,
    pub user_s3_url: Option<String>,
    pub user_aws_access_key_id: Option<String>,
    pub user_aws_secret_access_key: Option<String>,
    pub user_aws_endpoint_url: Option<String>,
}

impl CreateDeploymentRequest {
    /// Validates the exactly-one-of-`hf_model_id`/`model_name` and
    /// `cache_scope == private` ⇒ S3-fields-required rules from spec.md
    /// §6.1, then builds the `Deployment` the engine will drive.
    ///
    /// `model_name` is treated as a direct alias for the HF model id (no
    /// separate name→id resolver is specified) — the HF Validator still
    /// runs against whatever value ends up in `model_id`, so a bad alias
    /// surfaces as the same `ModelNotFoundError` a bad `hf_model_id` would.
    pub fn into_deployment(self, owner_key: &str) -> Result<Deployment, ApiError> {
        let mut model_name_alias = None;
        let model_id = match (self.hf_model_id, self.model_name) {
            (Some(id), None) => id,
            (None, Some(name)) => {
                model_name_alias = Some(name.clone());
                name
            }
            (Some(_), Some(_)) => {
                return Err(ApiError::Validation(
                    "exactly one of hf_model_id or model_name is required, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(ApiError::Validation(
                    "exactly one of hf_model_id or model_name is required".to_string(),
                ))
            }
        };

        if self.user_webhook_url.trim().is_empty() {
            return Err(ApiError::Validation("user_webhook_url is required".to_string()));
        }

        let cache_scope = self.cache_scope.unwrap_or_default();
        let s3_fields = [
            self.user_s3_url.as_ref(),
            self.user_aws_access_key_id.as_ref(),
            self.user_aws_secret_access_key.as_ref(),
        ];
        let any_s3_field_set = s3_fields.iter().any(|f| f.is_some());

        let s3 = match cache_scope {
            CacheScope::Private => {
                let (Some(model_url), Some(access_key_id), Some(secret_access_key)) = (
                    self.user_s3_url,
                    self.user_aws_access_key_id,
                    self.user_aws_secret_access_key,
                ) else {
                    return Err(ApiError::Validation(
                        "cache_scope=private requires user_s3_url, user_aws_access_key_id and user_aws_secret_access_key"
                            .to_string(),
                    ));
                };
                Some(S3Credentials {
                    endpoint_url: self.user_aws_endpoint_url.unwrap_or_default(),
                    model_url,
                    access_key_id,
                    secret_access_key,
                })
            }
            CacheScope::Off | CacheScope::Shared if any_s3_field_set => {
                return Err(ApiError::Validation(
                    "S3 fields are only valid when cache_scope=private".to_string(),
                ));
            }
            CacheScope::Off | CacheScope::Shared => None,
        };

        let now = Utc::now();
        Ok(Deployment {
            id: new_deployment_id(),
            owner_hash: owner_hash(owner_key),
            model_id,
            provider_hint: self.provider,
            model_name_alias,
            requested_tier: self.gpu_tier,
            resolved_tier: None,
            min_vram_gb: None,
            endpoint_id: None,
            endpoint_url: None,
            webhook_url: self.user_webhook_url,
            cache_scope,
            s3,
            status: DeploymentStatus::Validating,
            error: None,
            created_at: now,
            updated_at: now,
            ready_at: None,
            attempts: vec![],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> CreateDeploymentRequest {
        CreateDeploymentRequest {
            hf_model_id: Some("stabilityai/sd-turbo".to_string()),
            model_name: None,
            provider: None,
            user_webhook_url: "https://caller.example.com/hook".to_string(),
            gpu_tier: None,
            hf_token: None,
            cache_scope: None,
            user_s3_url: None,
            user_aws_access_key_id: None,
            user_aws_secret_access_key: None,
            user_aws_endpoint_url: None,
        }
    }

    #[test]
    fn requires_exactly_one_of_hf_model_id_or_model_name() {
        let mut both = base_request();
        both.model_name = Some("sd-turbo".to_string());
        assert!(matches!(both.into_deployment("key").unwrap_err(), ApiError::Validation(_)));

        let mut neither = base_request();
        neither.hf_model_id = None;
        assert!(matches!(neither.into_deployment("key").unwrap_err(), ApiError::Validation(_)));
    }

    #[test]
    fn private_cache_scope_requires_s3_fields() {
        let mut req = base_request();
        req.cache_scope = Some(CacheScope::Private);
        assert!(matches!(req.into_deployment("key").unwrap_err(), ApiError::Validation(_)));
    }

    #[test]
    fn private_cache_scope_with_full_s3_fields_succeeds() {
        let mut req = base_request();
        req.cache_scope = Some(CacheScope::Private);
        req.user_s3_url = Some("s3://bucket/model".to_string());
        req.user_aws_access_key_id = Some("AKIA".to_string());
        req.user_aws_secret_access_key = Some("secret".to_string());

        let deployment = req.into_deployment("key").unwrap();
        assert!(deployment.s3.is_some());
    }

    #[test]
    fn s3_fields_without_private_cache_scope_are_rejected() {
        let mut req = base_request();
        req.user_s3_url = Some("s3://bucket/model".to_string());
        assert!(matches!(req.into_deployment("key").unwrap_err(), ApiError::Validation(_)));
    }
}
