//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;
use crate::languages::DEFAULT_LANGUAGE;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash.
    pub base_url: String,
    /// Language preselected before the first upload.
    pub default_language: String,
    /// Per-request timeout. `None` lets requests run to completion.
    pub request_timeout: Option<Duration>,
    /// Drop the current summary as soon as a new upload starts, instead of
    /// waiting for the new upload to succeed.
    pub clear_summary_on_resubmit: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_language: DEFAULT_LANGUAGE.to_string(),
            request_timeout: None,
            clear_summary_on_resubmit: true,
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at `base_url`, other fields defaulted.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            ..Self::default()
        }
    }

    /// Build the config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = lookup("SCHEME_ASSIST_API_BASE_URL")
            .or_else(|| lookup("VITE_API_BASE_URL"))
            .filter(|s| !s.trim().is_empty())
            .map(|s| normalize_base_url(&s))
            .unwrap_or(defaults.base_url);

        let default_language = lookup("SCHEME_ASSIST_LANGUAGE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.default_language);

        let request_timeout = match lookup("SCHEME_ASSIST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "SCHEME_ASSIST_TIMEOUT_SECS".to_string(),
                    message: format!("expected a whole number of seconds, got {raw:?}"),
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => defaults.request_timeout,
        };

        let clear_summary_on_resubmit = match lookup("SCHEME_ASSIST_CLEAR_ON_RESUBMIT") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "SCHEME_ASSIST_CLEAR_ON_RESUBMIT".to_string(),
                message: format!("expected true/false, got {raw:?}"),
            })?,
            None => defaults.clear_summary_on_resubmit,
        };

        Ok(Self {
            base_url,
            default_language,
            request_timeout,
            clear_summary_on_resubmit,
        })
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.default_language, "en");
        assert!(config.request_timeout.is_none());
        assert!(config.clear_summary_on_resubmit);
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let config = ClientConfig::from_lookup(lookup_from(&[(
            "SCHEME_ASSIST_API_BASE_URL",
            "https://schemes.example.org/api/",
        )]))
        .unwrap();
        assert_eq!(config.base_url, "https://schemes.example.org/api");
    }

    #[test]
    fn vite_variable_is_a_fallback() {
        let config = ClientConfig::from_lookup(lookup_from(&[(
            "VITE_API_BASE_URL",
            "http://10.0.0.5:9000",
        )]))
        .unwrap();
        assert_eq!(config.base_url, "http://10.0.0.5:9000");

        let config = ClientConfig::from_lookup(lookup_from(&[
            ("VITE_API_BASE_URL", "http://10.0.0.5:9000"),
            ("SCHEME_ASSIST_API_BASE_URL", "http://primary:8000"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://primary:8000");
    }

    #[test]
    fn timeout_and_clear_flag_parse() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("SCHEME_ASSIST_TIMEOUT_SECS", "30"),
            ("SCHEME_ASSIST_CLEAR_ON_RESUBMIT", "off"),
            ("SCHEME_ASSIST_LANGUAGE", "hi"),
        ]))
        .unwrap();
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert!(!config.clear_summary_on_resubmit);
        assert_eq!(config.default_language, "hi");
    }

    #[test]
    fn zero_timeout_means_none() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[("SCHEME_ASSIST_TIMEOUT_SECS", "0")])).unwrap();
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn invalid_values_rejected() {
        let err = ClientConfig::from_lookup(lookup_from(&[("SCHEME_ASSIST_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("SCHEME_ASSIST_TIMEOUT_SECS"));

        let err = ClientConfig::from_lookup(lookup_from(&[(
            "SCHEME_ASSIST_CLEAR_ON_RESUBMIT",
            "maybe",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("SCHEME_ASSIST_CLEAR_ON_RESUBMIT"));
    }
}
