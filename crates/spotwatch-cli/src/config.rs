//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use spotwatch_core::{AfterFire, DEFAULT_BASE_URL, DetectorKind, WatchConfig};

/// Global configuration for spotwatch
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub metadata: MetadataConfig,
    pub poll: PollConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub base_url: String,
    pub mode: DetectorKind,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            mode: DetectorKind::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub timeout_ms: u64,
    /// Stop polling after the first termination notice
    pub stop_on_fire: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            timeout_ms: 3000,
            stop_on_fire: true,
        }
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub mode: Option<DetectorKind>,
    pub interval_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    expand_env_var(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("environment variable in {s} is not set")))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./spotwatch.toml (current directory)
    /// 2. ~/.config/spotwatch/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("spotwatch.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "spotwatch") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(base_url) = overrides.base_url {
            self.metadata.base_url = base_url;
        }
        if let Some(mode) = overrides.mode {
            self.metadata.mode = mode;
        }
        if let Some(interval_ms) = overrides.interval_ms {
            self.poll.interval_ms = interval_ms;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.poll.timeout_ms = timeout_ms;
        }
    }

    /// The request timeout must be non-zero and shorter than the poll interval.
    pub fn validate(&self) -> Result<()> {
        let PollConfig {
            interval_ms,
            timeout_ms,
            ..
        } = self.poll;
        if timeout_ms == 0 {
            anyhow::bail!("poll.timeout_ms must be greater than 0");
        }
        if timeout_ms >= interval_ms {
            anyhow::bail!(
                "poll.timeout_ms ({timeout_ms}) must be shorter than poll.interval_ms ({interval_ms})"
            );
        }
        if !self.metadata.base_url.starts_with("http://")
            && !self.metadata.base_url.starts_with("https://")
        {
            anyhow::bail!(
                "metadata.base_url must be an http(s) URL, got {}",
                self.metadata.base_url
            );
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.poll.timeout_ms)
    }

    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            kind: self.metadata.mode,
            base_url: self.metadata.base_url.clone(),
            interval: self.interval(),
            timeout: self.timeout(),
            after_fire: if self.poll.stop_on_fire {
                AfterFire::Stop
            } else {
                AfterFire::Continue
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.metadata.base_url, "http://169.254.169.254");
        assert_eq!(config.metadata.mode, DetectorKind::InstanceAction);
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn expand_env_var_simple() {
        std::env::set_var("SPOTWATCH_TEST_URL", "http://127.0.0.1:1338");
        assert_eq!(
            expand_env_var("${SPOTWATCH_TEST_URL}"),
            Some("http://127.0.0.1:1338".to_string())
        );
        std::env::remove_var("SPOTWATCH_TEST_URL");
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal"), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${NONEXISTENT_VAR_12345}"), None);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[metadata]
base_url = "http://localhost:1338"
mode = "termination-time"

[poll]
interval_ms = 2000
timeout_ms = 500
stop_on_fire = false
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.metadata.base_url, "http://localhost:1338");
        assert_eq!(config.metadata.mode, DetectorKind::TerminationTime);

        let watch = config.watch_config();
        assert_eq!(watch.interval, Duration::from_secs(2));
        assert_eq!(watch.timeout, Duration::from_millis(500));
        assert_eq!(watch.after_fire, AfterFire::Continue);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: Config = toml::from_str("[poll]\ninterval_ms = 10000\n").unwrap();
        assert_eq!(config.poll.interval_ms, 10000);
        assert_eq!(config.poll.timeout_ms, 3000);
        assert!(config.poll.stop_on_fire);
        assert_eq!(config.metadata.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn unknown_mode_rejected() {
        assert!(toml::from_str::<Config>("[metadata]\nmode = \"rebalance\"\n").is_err());
    }

    #[test]
    fn overrides_win() {
        let mut config = Config::default();
        config.apply(Overrides {
            base_url: Some("http://10.0.0.1".to_string()),
            mode: Some(DetectorKind::TerminationTime),
            interval_ms: Some(1000),
            timeout_ms: None,
        });
        assert_eq!(config.metadata.base_url, "http://10.0.0.1");
        assert_eq!(config.metadata.mode, DetectorKind::TerminationTime);
        assert_eq!(config.poll.interval_ms, 1000);
        assert_eq!(config.poll.timeout_ms, 3000);
    }

    #[test]
    fn timeout_must_be_shorter_than_interval() {
        let mut config = Config::default();
        config.poll.timeout_ms = 5000;
        assert!(config.validate().is_err());
        config.poll.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.poll.timeout_ms = 4999;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn base_url_must_be_http() {
        let mut config = Config::default();
        config.metadata.base_url = "169.254.169.254".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[metadata]\nmode = \"termination-time\"").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.metadata.mode, DetectorKind::TerminationTime);
    }

    #[test]
    fn from_file_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config file"));
    }
}
