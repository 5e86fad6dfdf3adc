/// Centralized argument handling for the chat server
///
/// Command-line arguments are captured once into a global vector so any module
/// can check debug flags without threading them through constructors.
///
/// Features:
/// - Centralized CMD_ARGS storage with thread-safe access
/// - Debug flag checking functions per subsystem
/// - Overridable argument vector for tests and tool binaries
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by binaries and tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
/// Returns a vector clone to avoid holding the mutex lock
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => {
            // Fallback to env::args if mutex is poisoned
            env::args().collect()
        }
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
/// Returns None if the flag is not found or has no value
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

fn debug_flag(name: &str) -> bool {
    has_arg("--debug-all") || has_arg(&format!("--debug-{}", name))
}

/// Hub registry / broadcast debug mode
pub fn is_debug_hub_enabled() -> bool {
    debug_flag("hub")
}

/// Store mutation debug mode
pub fn is_debug_store_enabled() -> bool {
    debug_flag("store")
}

/// Per-connection session debug mode
pub fn is_debug_session_enabled() -> bool {
    debug_flag("session")
}

/// HTTP routes and admission debug mode
pub fn is_debug_webserver_enabled() -> bool {
    debug_flag("webserver")
}

/// Synthetic traffic driver debug mode
pub fn is_debug_traffic_enabled() -> bool {
    debug_flag("traffic")
}

// =============================================================================
// VALUE ARGUMENTS
// =============================================================================

/// Explicit config file path (--config <path>)
pub fn config_path_override() -> Option<String> {
    get_arg_value("--config")
}

/// Listen port override (--port <port>)
pub fn port_override() -> Option<u16> {
    get_arg_value("--port").and_then(|p| p.parse().ok())
}

/// Listen host override (--host <host>)
pub fn host_override() -> Option<String> {
    get_arg_value("--host")
}

/// Synthetic traffic mode override (--mock-mode <mode>)
pub fn mock_mode_override() -> Option<String> {
    get_arg_value("--mock-mode")
}

/// Log file path (--log-file <path>)
pub fn log_file_path() -> Option<String> {
    get_arg_value("--log-file")
}

pub mod patterns {
    use super::has_arg;

    pub fn is_help_requested() -> bool {
        has_arg("--help") || has_arg("-h")
    }
}

/// Print usage information
#[allow(clippy::print_stdout)]
pub fn print_help() {
    println!("livechat - real-time chat broadcast server");
    println!();
    println!("USAGE:");
    println!("    livechat [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <path>       Config file (default: data/config.toml)");
    println!("    --host <host>         Listen host");
    println!("    --port <port>         Listen port (env: PORT)");
    println!("    --mock-mode <mode>    Synthetic traffic: normal | stress | extreme (env: MOCK_MODE)");
    println!("    --log-file <path>     Also write logs to this file");
    println!("    --log-level <level>   error | warning | info | debug | verbose");
    println!("    --quiet               Only warnings and errors");
    println!("    --verbose             Enable verbose logs");
    println!("    --debug-<area>        Debug logs for hub, store, session, webserver, traffic, all");
    println!("    -h, --help            Print this help");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_arg_value() {
        set_cmd_args(vec![
            "livechat".to_string(),
            "--port".to_string(),
            "9001".to_string(),
            "--mock-mode".to_string(),
        ]);

        assert_eq!(port_override(), Some(9001));
        assert!(has_arg("--mock-mode"));
        // Flag without a trailing value
        assert_eq!(mock_mode_override(), None);
        assert_eq!(get_arg_value("--missing"), None);

        set_cmd_args(vec!["livechat".to_string()]);
    }
}
