//! Maps the transport-agnostic `ApiError` taxonomy (spec.md §7) to HTTP
//! responses. `ApiError` itself carries no HTTP knowledge, matching the
//! teacher's `GpuProviderError`/`CloudProviderError`; the mapping lives at
//! this adapter edge only, as `platform_alert_handler` does for `healer`.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use visgate_types::ApiError;

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Newtype so `IntoResponse` can be implemented here without hitting the
/// orphan rule (`ApiError` lives in `visgate-types`, `IntoResponse` in
/// `axum`; neither is local to this crate).
pub struct ApiErrorResponse(pub ApiError);

impl From<ApiError> for ApiErrorResponse {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::DeploymentNotFound => StatusCode::NOT_FOUND,
            ApiError::ModelNotFound(_) | ApiError::ModelGated(_) | ApiError::UnsupportedGpu(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::InsufficientGpu(_)
            | ApiError::ProviderCapacity(_)
            | ApiError::Provider(_)
            | ApiError::UnsupportedModel(_)
            | ApiError::Store(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::WebhookDelivery(_) => StatusCode::BAD_GATEWAY,
            ApiError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
        };

        let body = ErrorBody {
            error: self.0.kind(),
            message: self.0.to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimit { retry_after_secs } = &self.0 {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}
