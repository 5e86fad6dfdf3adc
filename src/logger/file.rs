/// Optional plain-text log sink (--log-file <path>)
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::arguments::log_file_path;

static LOG_FILE: OnceCell<Mutex<BufWriter<File>>> = OnceCell::new();

/// Open the log file if one was requested on the command line
pub fn init_file_logging() {
    let Some(path) = log_file_path() else {
        return;
    };

    if let Some(parent) = Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            let _ = LOG_FILE.set(Mutex::new(BufWriter::new(file)));
        }
        Err(e) => {
            let _ = writeln!(std::io::stderr(), "Failed to open log file '{}': {}", path, e);
        }
    }
}

/// Append one line to the log file (no-op without a sink)
pub fn write_to_file(line: &str) {
    if let Some(writer) = LOG_FILE.get() {
        let _ = writeln!(writer.lock(), "{}", line);
    }
}

/// Flush buffered lines to disk
pub fn flush_file_logging() {
    if let Some(writer) = LOG_FILE.get() {
        let _ = writer.lock().flush();
    }
}
