//! Client configuration.
//!
//! Defaults target a backend on `localhost`. A JSON file may override any
//! field, and `NOOK_*` environment variables override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/users";
pub const DEFAULT_DEBOUNCE_MS: u64 = 1_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

pub const ENV_API_URL: &str = "NOOK_API_URL";
pub const ENV_DEBOUNCE_MS: &str = "NOOK_DEBOUNCE_MS";
pub const ENV_TIMEOUT_SECS: &str = "NOOK_TIMEOUT_SECS";
pub const ENV_DATA_DIR: &str = "NOOK_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the user API, without a trailing slash
    pub api_base_url: String,
    /// Quiet period before local changes are pushed
    pub debounce_ms: u64,
    pub request_timeout_secs: u64,
    /// Where the local cache and session token live
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            data_dir: None,
        }
    }
}

impl ClientConfig {
    /// Parse a JSON config document; unknown fields are rejected.
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::Config(format!("invalid config JSON: {error}")))?;
        config.validated()
    }

    /// Load a config file, or the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let payload = std::fs::read_to_string(path)?;
        Self::from_json(&payload)
    }

    /// Apply `NOOK_*` overrides from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| normalize_text_option(lookup(key));

        if let Some(url) = lookup(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(raw) = lookup(ENV_DEBOUNCE_MS) {
            self.debounce_ms = parse_number(ENV_DEBOUNCE_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = parse_number(ENV_TIMEOUT_SECS, &raw)?;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        self.validated()
    }

    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validated(mut self) -> Result<Self> {
        self.api_base_url = normalize_http_url(&self.api_base_url, "api_base_url")?;
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| Error::Config(format!("{key} must be a whole number, got '{raw}'")))
}

fn normalize_http_url(raw: &str, field: &str) -> Result<String> {
    let value = normalize_text_option(Some(raw.to_string()))
        .ok_or_else(|| Error::Config(format!("config field '{field}' is required")))?;
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(format!(
            "config field '{field}' must include http:// or https://"
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_target_localhost() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.debounce(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn from_json_fills_missing_fields_and_normalizes_url() {
        let config =
            ClientConfig::from_json(r#"{ "api_base_url": " https://api.example.com/users/ " }"#)
                .unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com/users");
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn from_json_rejects_unknown_fields() {
        let error = ClientConfig::from_json(r#"{ "supabase_url": "x" }"#).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn from_json_rejects_urls_without_scheme() {
        let error = ClientConfig::from_json(r#"{ "api_base_url": "localhost:8080" }"#).unwrap_err();
        assert!(error.to_string().contains("http://"));
    }

    #[test]
    fn env_overrides_file_values() {
        let config = ClientConfig::default()
            .with_overrides(env(&[
                (ENV_API_URL, "https://notes.example.com/users"),
                (ENV_DEBOUNCE_MS, "250"),
                (ENV_DATA_DIR, "/tmp/nook"),
                (ENV_TIMEOUT_SECS, "  "),
            ]))
            .unwrap();
        assert_eq!(config.api_base_url, "https://notes.example.com/users");
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/nook")));
    }

    #[test]
    fn env_rejects_bad_numbers() {
        let error = ClientConfig::default()
            .with_overrides(env(&[(ENV_DEBOUNCE_MS, "soon")]))
            .unwrap_err();
        assert!(error.to_string().contains(ENV_DEBOUNCE_MS));

        let error = ClientConfig::default()
            .with_overrides(env(&[(ENV_TIMEOUT_SECS, "0")]))
            .unwrap_err();
        assert!(error.to_string().contains("request_timeout_secs"));
    }

    #[test]
    fn load_falls_back_to_defaults_when_missing() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("config.json");
        assert_eq!(ClientConfig::load(&missing).unwrap(), ClientConfig::default());

        std::fs::write(&missing, r#"{ "debounce_ms": 50 }"#).unwrap();
        assert_eq!(ClientConfig::load(&missing).unwrap().debounce_ms, 50);
    }
}
