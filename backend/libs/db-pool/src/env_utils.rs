//! Environment variable parsing helpers
//!
//! Missing or malformed values fall back to the supplied default so that
//! configuration loaders never need `unwrap()`.

use std::str::FromStr;

/// Parse an environment variable, falling back to `default` when it is
/// missing or cannot be parsed.
pub fn parse_env_with_default<T: FromStr>(key: &str, default: T) -> T {
    parse_env_optional(key).unwrap_or(default)
}

/// Parse an environment variable, returning `None` when missing or invalid.
pub fn parse_env_optional<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Read a string variable, treating blank values as unset.
pub fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn test_parse_env_with_default() {
        let result: u32 = parse_env_with_default("DB_POOL_TEST_MISSING_XYZ", 42);
        assert_eq!(result, 42);

        std::env::set_var("DB_POOL_TEST_PORT", "8080");
        let result: u16 = parse_env_with_default("DB_POOL_TEST_PORT", 3000);
        assert_eq!(result, 8080);
        std::env::remove_var("DB_POOL_TEST_PORT");
    }

    #[test]
    #[serial_test::serial]
    fn test_invalid_value_uses_default() {
        std::env::set_var("DB_POOL_TEST_BAD", "not-a-number");
        let result: u32 = parse_env_with_default("DB_POOL_TEST_BAD", 7);
        assert_eq!(result, 7);
        std::env::remove_var("DB_POOL_TEST_BAD");
    }

    #[test]
    #[serial_test::serial]
    fn test_non_empty_env() {
        std::env::set_var("DB_POOL_TEST_BLANK", "   ");
        assert_eq!(non_empty_env("DB_POOL_TEST_BLANK"), None);

        std::env::set_var("DB_POOL_TEST_BLANK", " value ");
        assert_eq!(non_empty_env("DB_POOL_TEST_BLANK"), Some("value".to_string()));
        std::env::remove_var("DB_POOL_TEST_BLANK");
    }
}
