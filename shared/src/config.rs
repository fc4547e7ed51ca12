//! Environment configuration helpers shared by every service binary

use std::str::FromStr;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Read `name`, falling back to `default` when unset or empty
pub fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parse `name`, falling back to `default` when unset or unparsable
pub fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a boolean flag (`1`, `true`, `yes`, `on`)
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Require a secret env var: must be set and non-empty outside `development`.
///
/// In `development` a missing or empty value is replaced by a labelled
/// placeholder, never by the empty string.
pub fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
    resolve_secret(name, std::env::var(name).ok(), environment)
}

fn resolve_secret(name: &str, value: Option<String>, environment: &str) -> Result<String, BoxError> {
    match value.filter(|v| !v.is_empty()) {
        Some(v) => Ok(v),
        None if environment == "development" => {
            tracing::warn!("{name} not set or empty, using development placeholder");
            Ok(format!("dev-{name}-not-for-production-0123456789"))
        }
        None => Err(format!("{name} must be set and non-empty in {environment} environment").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_fallback() {
        assert_eq!(env_parse("SHARED_TEST_UNSET_NUMBER", 3u32), 3);
    }

    #[test]
    fn test_env_or_fallback() {
        assert_eq!(env_or("SHARED_TEST_UNSET_STRING", "PHP"), "PHP");
    }

    #[test]
    fn test_require_secret_development_placeholder() {
        let secret = require_secret("SHARED_TEST_UNSET_SECRET", "development").unwrap();
        assert!(secret.starts_with("dev-SHARED_TEST_UNSET_SECRET"));
        assert!(secret.len() >= 32);
    }

    #[test]
    fn test_require_secret_production_refuses() {
        assert!(require_secret("SHARED_TEST_UNSET_SECRET", "production").is_err());
    }

    #[test]
    fn test_empty_secret_is_never_used() {
        let secret = resolve_secret("JWT_SECRET", Some(String::new()), "development").unwrap();
        assert_eq!(secret, "dev-JWT_SECRET-not-for-production-0123456789");

        assert!(resolve_secret("JWT_SECRET", Some(String::new()), "production").is_err());
        assert_eq!(
            resolve_secret("JWT_SECRET", Some("s3cret".into()), "production").unwrap(),
            "s3cret"
        );
    }
}
