//! Credential resolution for provider API keys.
//!
//! A credential may be given directly in configuration or through an
//! environment variable; direct values win. A missing credential is not an
//! error here — providers without one report themselves unconfigured and
//! the pipeline routes around them.

use secrecy::SecretString;

/// Resolves an optional secret from a direct value, then an environment
/// variable. Empty values are treated as absent.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    env_var: Option<&str>,
) -> Option<SecretString> {
    if let Some(value) = direct {
        if !value.is_empty() {
            return Some(SecretString::from(value.to_string()));
        }
    }

    if let Some(name) = env_var {
        if let Ok(value) = std::env::var(name) {
            if !value.is_empty() {
                return Some(SecretString::from(value));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    #[test]
    fn test_direct_value_wins() {
        let secret = resolve_secret_optional(Some("direct-key"), None).unwrap();
        assert_eq!(secret.expose_secret(), "direct-key");
    }

    #[test]
    fn test_empty_direct_value_is_absent() {
        assert!(resolve_secret_optional(Some(""), None).is_none());
    }

    #[test]
    #[serial]
    fn test_env_var_fallback() {
        std::env::set_var("FORMSCAN_TEST_SECRET", "from-env");
        let secret = resolve_secret_optional(None, Some("FORMSCAN_TEST_SECRET")).unwrap();
        assert_eq!(secret.expose_secret(), "from-env");
        std::env::remove_var("FORMSCAN_TEST_SECRET");
    }

    #[test]
    #[serial]
    fn test_direct_beats_env_var() {
        std::env::set_var("FORMSCAN_TEST_SECRET", "from-env");
        let secret =
            resolve_secret_optional(Some("direct"), Some("FORMSCAN_TEST_SECRET")).unwrap();
        assert_eq!(secret.expose_secret(), "direct");
        std::env::remove_var("FORMSCAN_TEST_SECRET");
    }

    #[test]
    #[serial]
    fn test_no_source_is_none() {
        std::env::remove_var("FORMSCAN_TEST_SECRET");
        assert!(resolve_secret_optional(None, Some("FORMSCAN_TEST_SECRET")).is_none());
        assert!(resolve_secret_optional(None, None).is_none());
    }
}
