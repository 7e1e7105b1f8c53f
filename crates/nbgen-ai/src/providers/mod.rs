//! Completion endpoint clients

pub mod openrouter;

use crate::{Error, Result};

/// Environment variable holding the OpenRouter credential
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Get an API key from a provided value or the environment.
///
/// Blank values count as absent.
pub fn get_api_key(provided: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(key) = provided.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    std::env::var(env_var)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or(Error::AuthenticationMissing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provided_key_wins() {
        let key = get_api_key(Some("sk-test"), "NBGEN_TEST_UNSET_VAR_1").unwrap();
        assert_eq!(key, "sk-test");
    }

    #[test]
    fn test_missing_key() {
        let err = get_api_key(None, "NBGEN_TEST_UNSET_VAR_2").unwrap_err();
        assert!(matches!(err, Error::AuthenticationMissing));
    }

    #[test]
    fn test_blank_key_is_missing() {
        let err = get_api_key(Some("   "), "NBGEN_TEST_UNSET_VAR_3").unwrap_err();
        assert!(matches!(err, Error::AuthenticationMissing));
    }
}
