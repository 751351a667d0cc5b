//! Bridge configuration types and defaults.
//!
//! This module defines the configuration options for the bridge, including
//! registry capacity, binding name limits, dropped-call policy and logging.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of binding slots
pub const DEFAULT_CAPACITY: usize = 32;

/// Default maximum binding name length in bytes
pub const DEFAULT_MAX_NAME_LEN: usize = 63;

/// Upper bound on registry capacity
pub const MAX_CAPACITY: usize = 4096;

/// Default worker threads for handler offload
pub const DEFAULT_OFFLOAD_THREADS: usize = 2;

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "webview_bridge=info";

/// What to do with a binding name longer than `max_name_len`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamePolicy {
    /// Cut the name at the last char boundary that fits
    #[default]
    Truncate,
    /// Fail registration with `NameTooLong`
    Reject,
}

/// Configuration for the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Number of binding slots (default: 32)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Maximum binding name length in bytes (default: 63)
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,

    /// Over-long name handling (default: truncate)
    #[serde(default)]
    pub name_policy: NamePolicy,

    /// Reject the JS promise of a dropped call instead of leaving it pending (default: true)
    #[serde(default = "default_true")]
    pub reject_dropped_calls: bool,

    /// Worker threads for `OffloadQueue` (default: 2)
    #[serde(default = "default_offload_threads")]
    pub offload_threads: usize,

    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Append diagnostic events to this file instead of stderr
    #[serde(default)]
    pub debug_log_path: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            name_policy: NamePolicy::Truncate,
            reject_dropped_calls: true,
            offload_threads: DEFAULT_OFFLOAD_THREADS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            debug_log_path: None,
        }
    }
}

impl BridgeConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the registry capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the maximum name length
    pub fn with_max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len;
        self
    }

    /// Set the over-long name policy
    pub fn with_name_policy(mut self, policy: NamePolicy) -> Self {
        self.name_policy = policy;
        self
    }

    /// Enable or disable rejection of dropped calls
    pub fn with_reject_dropped_calls(mut self, reject: bool) -> Self {
        self.reject_dropped_calls = reject;
        self
    }

    /// Set offload worker threads
    pub fn with_offload_threads(mut self, threads: usize) -> Self {
        self.offload_threads = threads;
        self
    }

    /// Set the fallback log filter
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Set the diagnostic log file
    pub fn with_debug_log(mut self, path: PathBuf) -> Self {
        self.debug_log_path = Some(path);
        self
    }

    /// Parse a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(ConfigError::InvalidValue {
                field: "capacity".into(),
                reason: format!("must be between 1 and {}", MAX_CAPACITY),
            });
        }

        if self.max_name_len == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_name_len".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.offload_threads == 0 {
            return Err(ConfigError::InvalidValue {
                field: "offload_threads".into(),
                reason: "must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The field name
        field: String,
        /// The reason it's invalid
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Default value functions for serde
fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_max_name_len() -> usize {
    DEFAULT_MAX_NAME_LEN
}

fn default_offload_threads() -> usize {
    DEFAULT_OFFLOAD_THREADS
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.max_name_len, DEFAULT_MAX_NAME_LEN);
        assert_eq!(config.name_policy, NamePolicy::Truncate);
        assert!(config.reject_dropped_calls);
        assert!(config.debug_log_path.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = BridgeConfig::new()
            .with_capacity(4)
            .with_name_policy(NamePolicy::Reject)
            .with_reject_dropped_calls(false);

        assert_eq!(config.capacity, 4);
        assert_eq!(config.name_policy, NamePolicy::Reject);
        assert!(!config.reject_dropped_calls);
    }

    #[test]
    fn test_config_validation() {
        assert!(BridgeConfig::new().with_capacity(0).validate().is_err());
        assert!(BridgeConfig::new()
            .with_capacity(MAX_CAPACITY + 1)
            .validate()
            .is_err());
        assert!(BridgeConfig::new().with_max_name_len(0).validate().is_err());
        assert!(BridgeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = BridgeConfig::from_json_str(r#"{"capacity": 8, "namePolicy": "reject"}"#)
            .unwrap();
        assert_eq!(config.capacity, 8);
        assert_eq!(config.name_policy, NamePolicy::Reject);
        assert_eq!(config.max_name_len, DEFAULT_MAX_NAME_LEN);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_invalid_json_value_rejected() {
        let err = BridgeConfig::from_json_str(r#"{"capacity": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"maxNameLen": 16, "rejectDroppedCalls": false}}"#).unwrap();

        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_name_len, 16);
        assert!(!config.reject_dropped_calls);
    }

    #[test]
    fn test_missing_file() {
        let err = BridgeConfig::from_file("/nonexistent/bridge.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
