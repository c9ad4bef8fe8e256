//! Provider-key extraction (spec.md §6.1): `Authorization: Bearer <key>`
//! or `X-Provider-Api-Key`.

use axum::http::HeaderMap;
use visgate_types::ApiError;

pub fn extract_provider_key(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized("authorization header is not valid UTF-8".to_string()))?;
        if let Some(key) = value.strip_prefix("Bearer ") {
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }
        return Err(ApiError::Unauthorized("malformed Authorization header".to_string()));
    }

    if let Some(value) = headers.get("X-Provider-Api-Key") {
        let key = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized("X-Provider-Api-Key header is not valid UTF-8".to_string()))?;
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }

    Err(ApiError::Unauthorized("missing provider key".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer sk-abc"));
        assert_eq!(extract_provider_key(&headers).unwrap(), "sk-abc");
    }

    #[test]
    fn reads_custom_header_when_no_authorization() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Provider-Api-Key", HeaderValue::from_static("sk-xyz"));
        assert_eq!(extract_provider_key(&headers).unwrap(), "sk-xyz");
    }

    #[test]
    fn missing_both_is_unauthorized() {
        let headers = HeaderMap::new();
        assert!(matches!(extract_provider_key(&headers), Err(ApiError::Unauthorized(_))));
    }
}
