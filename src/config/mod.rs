//! Configuration system
//!
//! Structures are declared once with `config_struct!`, loaded from TOML,
//! overridden from environment and command line, then validated.

pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::{
    ChatConfig, Config, RateLimitConfig, ServerConfig, TrafficConfig, WebSocketConfig,
};
pub use utils::{
    apply_arg_overrides, apply_env_overrides, load_config, read_config_file, CONFIG_FILE_PATH,
};

use thiserror::Error;

/// Configuration failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config field '{field}': {reason}")]
    Invalid { field: String, reason: String },
}
