//! Configuration for pipeline execution and logging.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpflowConfig {
    /// Executor settings.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl OpflowConfig {
    /// Parses a configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid or a value is out of range.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Checks that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.execution.validate()
    }
}

/// Executor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Maximum number of ops running at the same time.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Stop scheduling new ops after the first failure.
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,
    /// Execution mode reported in events.
    #[serde(default = "default_execution_mode")]
    pub execution_mode: String,
}

fn default_max_concurrency() -> usize {
    8
}

fn default_fail_fast() -> bool {
    true
}

fn default_execution_mode() -> String {
    "production".to_string()
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            fail_fast: default_fail_fast(),
            execution_mode: default_execution_mode(),
        }
    }
}

impl ExecutionConfig {
    /// Creates an execution configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the concurrency limit.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Sets fail-fast behavior.
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Sets the execution mode.
    #[must_use]
    pub fn with_execution_mode(mut self, mode: impl Into<String>) -> Self {
        self.execution_mode = mode.into();
        self
    }

    /// Checks that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_concurrency` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "execution.max_concurrency".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Sets the filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Enables JSON output.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = OpflowConfig::default();
        assert_eq!(config.execution.max_concurrency, 8);
        assert!(config.execution.fail_fast);
        assert_eq!(config.execution.execution_mode, "production");
        assert_eq!(config.logging.filter, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = OpflowConfig::from_json_str("{}").unwrap();
        assert_eq!(config, OpflowConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = OpflowConfig::from_json_str(
            r#"{"execution": {"fail_fast": false}, "logging": {"json": true}}"#,
        )
        .unwrap();

        assert!(!config.execution.fail_fast);
        assert_eq!(config.execution.max_concurrency, 8);
        assert!(config.logging.json);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = OpflowConfig::from_json_str(r#"{"execution": {"max_concurrency": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "execution.max_concurrency"));
    }

    #[test]
    fn test_malformed_document() {
        let err = OpflowConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"execution": {{"max_concurrency": 2, "execution_mode": "test"}}}}"#)
            .unwrap();

        let config = OpflowConfig::from_file(file.path()).unwrap();
        assert_eq!(config.execution.max_concurrency, 2);
        assert_eq!(config.execution.execution_mode, "test");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = OpflowConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_builder_setters() {
        let config = ExecutionConfig::new()
            .with_max_concurrency(1)
            .with_fail_fast(false)
            .with_execution_mode("development");
        assert!(config.validate().is_ok());
        assert_eq!(config.max_concurrency, 1);

        let logging = LoggingConfig::default().with_filter("opflow=debug").with_json(true);
        assert_eq!(logging.filter, "opflow=debug");
        assert!(logging.json);
    }
}
