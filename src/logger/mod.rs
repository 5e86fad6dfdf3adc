//! Structured logging for the chat server
//!
//! This module provides a small, ergonomic logging API with:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-area debug control via --debug-<area> flags
//! - Colored console output plus an optional plain-text file sink
//!
//! ## Usage
//!
//! ```rust
//! use livechat::logger::{self, LogTag};
//!
//! logger::error(LogTag::Session, "Write to socket failed");
//! logger::warning(LogTag::Hub, "Evicted slow consumer");
//! logger::info(LogTag::System, "Server listening");
//! logger::debug(LogTag::Store, "Toggled reaction"); // Only if --debug-store
//! ```
//!
//! ## Initialization
//!
//! Call once at startup, before any other logging:
//! ```rust
//! livechat::logger::init();
//! ```

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, init_from_args, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Reads debug/verbosity flags from the command line and opens the file sink
/// when `--log-file <path>` was given.
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level
///
/// Only shown when the matching --debug-<area> flag is present.
///
/// # Example
/// ```rust
/// use livechat::logger::{self, LogTag};
///
/// // Only shown with --debug-hub
/// logger::debug(LogTag::Hub, "fan-out complete");
/// ```
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (only with --verbose)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush pending file writes
///
/// Call during shutdown so the tail of the log reaches disk.
pub fn flush() {
    file::flush_file_logging();
}
