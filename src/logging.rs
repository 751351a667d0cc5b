//! Tracing subscriber setup.
//!
//! The host calls [`init`] once at startup. `RUST_LOG` wins over the
//! configured filter. With `debug_log_path` set, events are appended to that
//! file without ANSI colors; otherwise they go to stderr.

use crate::config::{BridgeConfig, ConfigError};
use crate::error::{BridgeError, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber for `config`.
///
/// Fails if a subscriber is already set or the filter does not parse.
pub fn init(config: &BridgeConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter).map_err(|e| {
            ConfigError::InvalidValue {
                field: "log_filter".into(),
                reason: e.to_string(),
            }
        })?,
    };

    let installed = match &config.debug_log_path {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    installed.map_err(|e| BridgeError::InvalidState(format!("tracing already initialized: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_filter_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = BridgeConfig::new().with_log_filter("webview_bridge=notalevel");
        assert!(matches!(init(&config), Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_debug_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.log");
        let config = BridgeConfig::new()
            .with_log_filter("webview_bridge=debug")
            .with_debug_log(path.clone());

        init(&config).unwrap();
        tracing::warn!(target: "webview_bridge", "debug log line");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("debug log line"));
        assert!(matches!(init(&config), Err(BridgeError::InvalidState(_))));
    }
}
