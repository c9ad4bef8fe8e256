//! Deployment id generation and owner-hash proof of ownership.

use chrono::Utc;
use sha2::{Digest, Sha256};

/// SHA-256 digest of a caller-supplied provider key, hex-encoded. This is
/// the only form of the key ever persisted — the raw key is request-scoped
/// and never stored (spec.md §1 non-goals).
#[must_use]
pub fn owner_hash(provider_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new deployment id: `visgate-<year>-<8 hex chars>`.
#[must_use]
pub fn new_deployment_id() -> String {
    let year = Utc::now().format("%Y");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("visgate-{year}-{}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_hash_is_64_hex_chars() {
        let hash = owner_hash("sk-test-key");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn owner_hash_is_deterministic() {
        assert_eq!(owner_hash("same-key"), owner_hash("same-key"));
        assert_ne!(owner_hash("key-a"), owner_hash("key-b"));
    }

    #[test]
    fn deployment_id_has_expected_shape() {
        let id = new_deployment_id();
        assert!(id.starts_with("visgate-"));
        let rest = id.strip_prefix("visgate-").unwrap();
        let (year, suffix) = rest.split_once('-').unwrap();
        assert_eq!(year.len(), 4);
        assert_eq!(suffix.len(), 8);
    }
}
