/// Logger configuration derived from command-line flags
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments::{get_arg_value, get_cmd_args, has_arg};

/// Runtime logger settings
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Maximum level shown (Error..Verbose)
    pub min_level: LogLevel,

    /// Tags with debug output enabled (debug keys)
    pub debug_tags: HashSet<String>,

    /// All debug output enabled (--debug-all)
    pub debug_all: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Debug,
            debug_tags: HashSet::new(),
            debug_all: false,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Get a copy of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

/// Replace the logger configuration
pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

/// Threshold from `--log-level <level>`, then `--verbose` / `--quiet`
///
/// An unparseable `--log-level` value is ignored.
fn resolve_min_level(level_arg: Option<&str>, verbose: bool, quiet: bool) -> LogLevel {
    if let Some(level) = level_arg.and_then(LogLevel::parse) {
        return level;
    }
    if verbose {
        LogLevel::Verbose
    } else if quiet {
        LogLevel::Warning
    } else {
        LogLevel::Debug
    }
}

/// Build the logger configuration from the global argument vector
pub fn init_from_args() {
    let debug_tags = get_cmd_args()
        .iter()
        .filter_map(|arg| arg.strip_prefix("--debug-"))
        .filter(|key| *key != "all")
        .map(str::to_string)
        .collect();

    let min_level = resolve_min_level(
        get_arg_value("--log-level").as_deref(),
        has_arg("--verbose"),
        has_arg("--quiet"),
    );

    set_logger_config(LoggerConfig {
        min_level,
        debug_tags,
        debug_all: has_arg("--debug-all"),
    });
}

pub(super) fn is_debug_enabled_for_tag(config: &LoggerConfig, tag: &LogTag) -> bool {
    config.debug_all || config.debug_tags.contains(tag.to_debug_key())
}
