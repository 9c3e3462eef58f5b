use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::reminder::ReminderConfig;

/// Default sidecar HTTP endpoint
pub const DEFAULT_HTTP_ENDPOINT: &str = "http://127.0.0.1:3500";

/// Default time to wait for a sidecar response
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How to reach the sidecar and how to talk to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SidecarConfig {
    pub http_endpoint: String,
    pub api_token: Option<String>,
    /// Limit on each sidecar exchange; zero waits indefinitely
    #[serde(with = "duration_text")]
    pub timeout: Duration,
    pub reminders: ReminderConfig,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            http_endpoint: DEFAULT_HTTP_ENDPOINT.to_string(),
            api_token: None,
            timeout: DEFAULT_TIMEOUT,
            reminders: ReminderConfig::default(),
        }
    }
}

impl SidecarConfig {
    /// Defaults overridden by the sidecar's environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!("Loaded sidecar config from {}", path.display());
        Ok(config)
    }

    /// Apply `DAPR_HTTP_ENDPOINT`, `DAPR_HTTP_PORT` and `DAPR_API_TOKEN`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup("DAPR_HTTP_ENDPOINT") {
            self.http_endpoint = endpoint;
        }

        if let Some(port) = lookup("DAPR_HTTP_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.set_port(port),
                Err(_) => warn!("Ignoring invalid DAPR_HTTP_PORT value '{}'", port),
            }
        }

        if let Some(token) = lookup("DAPR_API_TOKEN") {
            if !token.is_empty() {
                self.api_token = Some(token);
            }
        }
    }

    fn set_port(&mut self, port: u16) {
        match Url::parse(&self.http_endpoint) {
            Ok(mut url) => {
                if url.set_port(Some(port)).is_ok() {
                    self.http_endpoint = url.to_string().trim_end_matches('/').to_string();
                } else {
                    warn!("Cannot set port on endpoint {}", self.http_endpoint);
                }
            }
            Err(e) => warn!("Cannot set port on endpoint {}: {}", self.http_endpoint, e),
        }
    }
}

/// Durations as human readable text ("30s", "1m 30s")
mod duration_text {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::{DurationFormat, ZeroPeriodPolicy};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SidecarConfig::default();
        assert_eq!(config.http_endpoint, "http://127.0.0.1:3500");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.reminders.zero_period, ZeroPeriodPolicy::Reject);
    }

    #[test]
    fn test_config_serialization() {
        let config = SidecarConfig {
            api_token: Some("secret".to_string()),
            timeout: Duration::from_millis(1500),
            ..SidecarConfig::default()
        };
        let serialized = toml::to_string_pretty(&config).unwrap();
        assert!(serialized.contains("timeout = \"1s 500ms\""));

        let deserialized: SidecarConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_config_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("sidecar.toml");

        let config_content = r#"
http_endpoint = "http://10.0.0.5:3600"
timeout = "5s"

[reminders]
duration_format = "iso8601"
zero_period = "fire-once"
"#;

        std::fs::write(&config_file, config_content).unwrap();
        let config = SidecarConfig::load_from_file(&config_file).unwrap();

        assert_eq!(config.http_endpoint, "http://10.0.0.5:3600");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.api_token, None);
        assert_eq!(config.reminders.duration_format, DurationFormat::Iso8601);
        assert_eq!(config.reminders.zero_period, ZeroPeriodPolicy::FireOnce);
    }

    #[test]
    fn test_missing_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = SidecarConfig::load_from_file(&temp_dir.path().join("absent.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DAPR_HTTP_ENDPOINT", "http://sidecar.local:3500"),
            ("DAPR_HTTP_PORT", "50001"),
            ("DAPR_API_TOKEN", "token"),
        ]
        .into_iter()
        .collect();

        let mut config = SidecarConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|value| value.to_string()));

        assert_eq!(config.http_endpoint, "http://sidecar.local:50001");
        assert_eq!(config.api_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let mut config = SidecarConfig::default();
        config.apply_overrides(|name| (name == "DAPR_HTTP_PORT").then(|| "nope".to_string()));
        assert_eq!(config.http_endpoint, DEFAULT_HTTP_ENDPOINT);
    }
}
