use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_root_path")]
    pub root_path: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Files processed between two commits.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
    /// Extraction pool size, 0 means one thread per CPU.
    #[serde(default)]
    pub worker_threads: usize,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

fn default_root_path() -> String {
    ".".to_string()
}

fn default_db_path() -> String {
    "catalog.db".to_string()
}

fn default_batch_size() -> usize {
    200
}

fn default_probe_timeout_secs() -> u64 {
    3
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            db_path: default_db_path(),
            batch_size: default_batch_size(),
            probe_timeout_secs: default_probe_timeout_secs(),
            ffprobe_path: default_ffprobe_path(),
            worker_threads: 0,
            ignore_patterns: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Message(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.root_path.trim().is_empty() {
            return Err(ConfigError::Message("root_path is empty".to_string()));
        }
        Ok(())
    }
}

/// Reads `Config.*` from the working directory (optional), then
/// `CATALOG_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("CATALOG")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    let config = builder.try_deserialize::<AppConfig>()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 200);
        assert_eq!(config.probe_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = AppConfig {
            batch_size: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_source_fills_defaults() {
        let config = Config::builder()
            .set_override("root_path", "/data/photos")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<AppConfig>()
            .unwrap();
        assert_eq!(config.root_path, "/data/photos");
        assert_eq!(config.db_path, "catalog.db");
        assert_eq!(config.ffprobe_path, "ffprobe");
        assert!(config.ignore_patterns.is_empty());
    }
}
