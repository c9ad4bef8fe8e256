//! Secret redaction, centralized.
//!
//! Every place that logs a deployment, or serializes one into a webhook
//! body, goes through [`redact_secrets`] first so no ad-hoc formatter can
//! leak a provider key or HF token.

/// Replace the given secret values with a fixed placeholder wherever they
/// appear in `text`. Empty secrets are skipped (an empty needle would
/// otherwise match everywhere).
#[must_use]
pub fn redact_secrets(text: &str, secrets: &[&str]) -> String {
    let mut redacted = text.to_string();
    for secret in secrets {
        if secret.is_empty() {
            continue;
        }
        redacted = redacted.replace(*secret, "***REDACTED***");
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_every_occurrence() {
        let text = "key=sk-live-abc123 and again sk-live-abc123 at the end";
        let out = redact_secrets(text, &["sk-live-abc123"]);
        assert!(!out.contains("sk-live-abc123"));
        assert_eq!(out.matches("***REDACTED***").count(), 2);
    }

    #[test]
    fn ignores_empty_secret() {
        let text = "unchanged";
        assert_eq!(redact_secrets(text, &[""]), "unchanged");
    }
}
