/// Configuration utilities - loading, overrides, and access helpers
///
/// This module provides utility functions for working with the configuration system:
/// - Loading configuration from disk (missing file means defaults)
/// - Environment and command-line overrides
/// - Validation of the resolved configuration
use std::path::Path;

use super::schemas::Config;
use super::ConfigError;
use crate::arguments;
use crate::logger::{self, LogTag};

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Read a configuration file, falling back to defaults when it does not exist
pub fn read_config_file(path: &str) -> Result<Config, ConfigError> {
    if !Path::new(path).exists() {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path),
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;

    toml::from_str::<Config>(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}

/// Apply environment overrides (PORT, MOCK_MODE)
///
/// `lookup` abstracts the environment so tests do not touch process state.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT").filter(|p| !p.is_empty()) {
        config.server.port = port.parse().map_err(|_| ConfigError::Invalid {
            field: "PORT".to_string(),
            reason: format!("'{}' is not a valid port", port),
        })?;
    }

    if let Some(mode) = lookup("MOCK_MODE") {
        config.traffic.mode = mode;
    }

    Ok(())
}

/// Apply command-line overrides (--host, --port, --mock-mode)
pub fn apply_arg_overrides(config: &mut Config) {
    if let Some(host) = arguments::host_override() {
        config.server.host = host;
    }
    if let Some(port) = arguments::port_override() {
        config.server.port = port;
    }
    if let Some(mode) = arguments::mock_mode_override() {
        config.traffic.mode = mode;
    }
}

/// Resolve and validate the configuration
///
/// Order of precedence: command line > environment > file > defaults.
/// The result is handed to `AppState`, which owns it for the process lifetime.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = arguments::config_path_override().unwrap_or_else(|| CONFIG_FILE_PATH.to_string());

    let mut config = read_config_file(&path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    apply_arg_overrides(&mut config);
    config.validate()?;

    logger::debug(
        LogTag::Config,
        &format!("Configuration loaded from '{}'", path),
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let cfg = read_config_file(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn test_reads_file_and_reports_parse_errors() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        writeln!(good, "[chat]\nmax_messages = 10").unwrap();
        let cfg = read_config_file(good.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.chat.max_messages, 10);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "[chat\nmax_messages = ").unwrap();
        let err = read_config_file(bad.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg, |key| match key {
            "PORT" => Some("9100".to_string()),
            "MOCK_MODE" => Some("stress".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.traffic.mode, "stress");

        let err = apply_env_overrides(&mut cfg, |key| {
            (key == "PORT").then(|| "not-a-port".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_load_config_is_repeatable() {
        let first = load_config().unwrap();
        let second = load_config().unwrap();
        assert_eq!(first.chat.max_messages, second.chat.max_messages);
        assert_eq!(first.websocket.max_frame_bytes, second.websocket.max_frame_bytes);
    }
}
