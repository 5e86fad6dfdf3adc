/// Configuration schemas - all config structures defined once with defaults
///
/// Each struct is defined using the config_struct! macro which provides:
/// - Single-source definition (no repetition)
/// - Embedded defaults
/// - Serde support
use std::time::Duration;

use crate::config_struct;

use super::ConfigError;

// ============================================================================
// SERVER CONFIGURATION
// ============================================================================

config_struct! {
    /// HTTP listener configuration
    pub struct ServerConfig {
        host: String = "0.0.0.0".to_string(),
        port: u16 = 8080,
    }
}

// ============================================================================
// CHAT CONFIGURATION
// ============================================================================

config_struct! {
    /// Message log configuration
    pub struct ChatConfig {
        /// Retention cap; oldest messages are evicted beyond it
        max_messages: usize = 1000,

        /// Maximum message length in characters (after trimming)
        max_text_chars: usize = 500,

        /// Author name used when a submission leaves it empty
        default_author_name: String = "Anonymous".to_string(),
    }
}

// ============================================================================
// WEBSOCKET CONFIGURATION
// ============================================================================

config_struct! {
    /// WebSocket session configuration
    pub struct WebSocketConfig {
        /// Upgrade path
        path: String = "/ws".to_string(),

        /// Live connection ceiling; further upgrades get 503
        max_connections: usize = 50,

        /// Per-connection outbound queue fed by the hub
        outbound_queue_size: usize = 256,

        /// Per-connection queue for direct replies (error events)
        reply_queue_size: usize = 16,

        /// Largest accepted inbound frame; must fit a maximum-length text
        max_frame_bytes: usize = 4096,

        /// Keep-alive ping period
        heartbeat_interval_secs: u64 = 54,

        /// Read deadline; refreshed by any inbound frame including pongs
        idle_timeout_secs: u64 = 60,

        /// Deadline for a single outbound write
        write_timeout_secs: u64 = 10,
    }
}

config_struct! {
    /// Per-connection submission rate limit
    pub struct RateLimitConfig {
        enabled: bool = true,
        max_messages: u32 = 20,
        window_secs: u64 = 60,
    }
}

// ============================================================================
// TRAFFIC CONFIGURATION
// ============================================================================

config_struct! {
    /// Synthetic traffic driver configuration
    pub struct TrafficConfig {
        /// normal | stress | extreme; empty disables the driver
        mode: String = String::new(),
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration
    pub struct Config {
        server: ServerConfig = ServerConfig::default(),
        chat: ChatConfig = ChatConfig::default(),
        websocket: WebSocketConfig = WebSocketConfig::default(),
        rate_limit: RateLimitConfig = RateLimitConfig::default(),
        traffic: TrafficConfig = TrafficConfig::default(),
    }
}

// ============================================================================
// IMPLEMENTATIONS
// ============================================================================

impl ServerConfig {
    /// Get the full bind address (host:port)
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl WebSocketConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Longest JSON encoding of a single text character (`\u001f`)
const MAX_ENCODED_CHAR_BYTES: usize = 6;

/// Room for the envelope keys and the author name around the text
const FRAME_ENVELOPE_BYTES: usize = 1024;

impl Config {
    /// Smallest frame cap that still carries a maximum-length message
    pub fn min_frame_bytes(&self) -> usize {
        self.chat.max_text_chars * MAX_ENCODED_CHAR_BYTES + FRAME_ENVELOPE_BYTES
    }

    /// Validate the whole configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &str, reason: &str) -> ConfigError {
            ConfigError::Invalid {
                field: field.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.server.host.is_empty() {
            return Err(invalid("server.host", "cannot be empty"));
        }
        if self.server.port == 0 {
            return Err(invalid("server.port", "cannot be 0"));
        }

        if self.chat.max_messages == 0 {
            return Err(invalid("chat.max_messages", "must be > 0"));
        }
        if self.chat.max_text_chars == 0 {
            return Err(invalid("chat.max_text_chars", "must be > 0"));
        }

        let ws = &self.websocket;
        if !ws.path.starts_with('/') {
            return Err(invalid("websocket.path", "must start with '/'"));
        }
        if ws.max_connections == 0 {
            return Err(invalid("websocket.max_connections", "must be > 0"));
        }
        if ws.outbound_queue_size == 0 || ws.reply_queue_size == 0 {
            return Err(invalid("websocket.*_queue_size", "must be > 0"));
        }
        if ws.max_frame_bytes < self.min_frame_bytes() {
            return Err(ConfigError::Invalid {
                field: "websocket.max_frame_bytes".to_string(),
                reason: format!(
                    "must be at least {} bytes to carry a {}-character message",
                    self.min_frame_bytes(),
                    self.chat.max_text_chars
                ),
            });
        }
        if ws.heartbeat_interval_secs == 0 {
            return Err(invalid("websocket.heartbeat_interval_secs", "must be > 0"));
        }
        if ws.heartbeat_interval_secs >= ws.idle_timeout_secs {
            return Err(invalid(
                "websocket.heartbeat_interval_secs",
                "must be below idle_timeout_secs",
            ));
        }

        if self.rate_limit.enabled {
            if self.rate_limit.max_messages == 0 {
                return Err(invalid("rate_limit.max_messages", "must be > 0 when enabled"));
            }
            if self.rate_limit.window_secs == 0 {
                return Err(invalid("rate_limit.window_secs", "must be > 0 when enabled"));
            }
        }

        Ok(())
    }
}
