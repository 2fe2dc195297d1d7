//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Largest id list a single `in` query may carry on the hosted store.
pub const DEFAULT_IN_QUERY_LIMIT: usize = 10;

/// Newsdesk configuration, stored as JSON at `~/.newsdesk/config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Chunk size used when fetching documents by a list of ids.
    #[serde(default = "default_in_query_limit")]
    pub in_query_limit: usize,
    /// JSON fixture used to seed the in-memory backend.
    #[serde(default)]
    pub fixture_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_in_query_limit() -> usize {
    DEFAULT_IN_QUERY_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            in_query_limit: DEFAULT_IN_QUERY_LIMIT,
            fixture_path: None,
        }
    }
}

impl Config {
    /// Load configuration from `paths`, falling back to defaults when the
    /// file does not exist. `NEWSDESK_LOG_LEVEL` overrides the log level.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to `paths`.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("NEWSDESK_LOG_LEVEL") {
            if !log_level.trim().is_empty() {
                self.log_level = log_level;
            }
        }
    }

    fn validate(&self) -> CoreResult<()> {
        if self.in_query_limit == 0 {
            return Err(CoreError::Config(
                "in_query_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.in_query_limit, 10);
        assert!(config.fixture_path.is_none());
    }

    #[test]
    fn test_config_load_from_file_fills_missing_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{ "log_level": "debug" }"#).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.in_query_limit, DEFAULT_IN_QUERY_LIMIT);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config {
            log_level: "trace".to_string(),
            in_query_limit: 30,
            fixture_path: Some(dir.path().join("fixture.json")),
        };
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.in_query_limit, DEFAULT_IN_QUERY_LIMIT);
    }

    #[test]
    fn test_zero_in_query_limit_is_rejected() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        std::fs::write(paths.config_file(), r#"{ "in_query_limit": 0 }"#).unwrap();

        let err = Config::load(&paths).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_malformed_file_is_json_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Config::load_from_file(&path),
            Err(CoreError::Json(_))
        ));
    }
}
