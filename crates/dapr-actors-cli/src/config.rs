use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use dapr_actors::SidecarConfig;

/// CLI configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sidecar: SidecarConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub colors: bool,
    /// Pretty-print JSON responses
    pub pretty_json: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            colors: true,
            pretty_json: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from the standard location, then apply environment
    /// overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(config_dir) = Self::config_dir() {
            let config_file = config_dir.join("config.toml");
            if config_file.exists() {
                debug!("Loading config from {}", config_file.display());
                config = Self::load_from_file(&config_file).with_context(|| {
                    format!("Failed to load config from {}", config_file.display())
                })?;
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.sidecar.apply_env_overrides();

        if let Ok(level) = std::env::var("DAPR_ACTORS_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(colors) = std::env::var("DAPR_ACTORS_COLORS") {
            self.output.colors = colors.parse().unwrap_or(true);
        }
    }

    /// Get the config directory for this user
    pub fn config_dir() -> Result<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".config"))
                    .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))
            })
            .map(|dir| dir.join("dapr-actors"))
    }

    /// Log level as a tracing level, falling back to `warn`
    pub fn log_level(&self) -> tracing::Level {
        self.logging.level.parse().unwrap_or(tracing::Level::WARN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dapr_actors::DurationFormat;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sidecar.http_endpoint, "http://127.0.0.1:3500");
        assert_eq!(config.logging.level, "warn");
        assert!(config.output.colors);
    }

    #[test]
    fn test_config_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");

        let config_content = r#"
[sidecar]
http_endpoint = "http://192.168.1.100:3500"
timeout = "10s"

[sidecar.reminders]
duration_format = "iso8601"

[output]
colors = false

[logging]
level = "debug"
"#;

        std::fs::write(&config_file, config_content).unwrap();
        let config = Config::load_from_file(&config_file).unwrap();

        assert_eq!(config.sidecar.http_endpoint, "http://192.168.1.100:3500");
        assert_eq!(config.sidecar.timeout, Duration::from_secs(10));
        assert_eq!(
            config.sidecar.reminders.duration_format,
            DurationFormat::Iso8601
        );
        assert!(!config.output.colors);
        assert!(config.output.pretty_json);
        assert_eq!(config.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_invalid_log_level_falls_back() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert_eq!(config.log_level(), tracing::Level::WARN);
    }
}
