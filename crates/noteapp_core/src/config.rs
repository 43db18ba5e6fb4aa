//! Core configuration.
//!
//! # Responsibility
//! - Describe where the database and logs live and how live queries buffer.
//! - Load and validate configuration from JSON.
//!
//! # Invariants
//! - A validated config has non-zero buffers, a supported log level and an
//!   absolute `log_dir` when one is set.

use crate::live::bus::DEFAULT_CHANGE_BUS_CAPACITY;
use crate::logging::{default_log_level, normalize_level};
use crate::repo::note_repository::DEFAULT_LIVE_QUERY_BUFFER;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings consumed by `NoteApp::open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite file. `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Rolling log directory. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub change_bus_capacity: usize,
    pub live_query_buffer: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            change_bus_capacity: DEFAULT_CHANGE_BUS_CAPACITY,
            live_query_buffer: DEFAULT_LIVE_QUERY_BUFFER,
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON document. Missing keys take defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(ConfigError::Invalid)?;
        if self.change_bus_capacity == 0 {
            return Err(ConfigError::Invalid(
                "change_bus_capacity must be greater than zero".to_string(),
            ));
        }
        if self.live_query_buffer == 0 {
            return Err(ConfigError::Invalid(
                "live_query_buffer must be greater than zero".to_string(),
            ));
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert!(config.db_path.is_none());
    }

    #[test]
    fn explicit_values_are_kept() {
        let config = CoreConfig::from_json_str(
            r#"{"db_path":"notes.db","log_level":"warn","live_query_buffer":4}"#,
        )
        .unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("notes.db")));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.live_query_buffer, 4);
        assert_eq!(config.change_bus_capacity, DEFAULT_CHANGE_BUS_CAPACITY);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = CoreConfig::from_json_str(r#"{"theme":"dark"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = CoreConfig::from_json_str(r#"{"log_level":"loud"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = CoreConfig::from_json_str(r#"{"change_bus_capacity":0}"#).unwrap_err();
        assert!(err.to_string().contains("change_bus_capacity"));

        let err = CoreConfig::from_json_str(r#"{"log_dir":"relative/logs"}"#).unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn from_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoreConfig::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
