use regex::Regex;
use std::sync::LazyLock;

use crate::response::ApiError;

static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9:_.@\-]{1,256}$").expect("valid key pattern"));

/// Checks keys arriving over HTTP before they reach the store.
pub struct KeyValidator;

impl KeyValidator {
    /// Trim and validate a rate limit key.
    ///
    /// Keys are 1 to 256 characters drawn from letters, digits and `:_.@-`,
    /// which covers login names, e-mail addresses, IPv4/IPv6 addresses and
    /// namespaced keys such as `login:alice`.
    pub fn validate_key(key: &str) -> Result<String, ApiError> {
        let key = key.trim();

        if key.is_empty() {
            return Err(ApiError::InvalidKey(
                "Rate limit key cannot be empty".to_string(),
            ));
        }

        if !KEY_PATTERN.is_match(key) {
            return Err(ApiError::InvalidKey(
                "Rate limit key must be at most 256 characters of letters, digits and ':_.@-'"
                    .to_string(),
            ));
        }

        Ok(key.to_string())
    }
}
