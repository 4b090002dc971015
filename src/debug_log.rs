//! Debug logging module for go-splitter.
//!
//! Logs debug messages to a file when the GO_SPLITTER_DEBUG_LOG environment
//! variable is set.

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::time::Instant;

use crate::constants::DEBUG_LOG_ENV;

static DEBUG_FILE: OnceLock<Mutex<Option<std::fs::File>>> = OnceLock::new();
static STARTED: OnceLock<Instant> = OnceLock::new();

/// Initialize debug logging if enabled
pub fn init() {
    STARTED.get_or_init(Instant::now);
    if let Ok(log_path) = std::env::var(DEBUG_LOG_ENV) {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .ok();

        let is_enabled = file.is_some();
        DEBUG_FILE.get_or_init(|| Mutex::new(file));

        if is_enabled {
            eprintln!("Debug logging enabled: {}", log_path);
        }
    } else {
        DEBUG_FILE.get_or_init(|| Mutex::new(None));
    }
}

/// Log a debug message if debug logging is enabled
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::debug_log::log_message(&format!($($arg)*))
    };
}

/// Internal function to write to debug log, prefixed with the time since
/// `init`
pub fn log_message(msg: &str) {
    let Some(file_mutex) = DEBUG_FILE.get() else {
        return;
    };
    let elapsed = STARTED.get().map_or(0.0, |t| t.elapsed().as_secs_f64());
    if let Ok(mut guard) = file_mutex.lock() {
        if let Some(ref mut file) = *guard {
            let _ = writeln!(file, "[+{:>9.3}s] {}", elapsed, msg);
            let _ = file.flush();
        }
    }
}

/// Check if debug logging is enabled
pub fn is_enabled() -> bool {
    DEBUG_FILE
        .get()
        .and_then(|m| m.lock().ok().map(|g| g.is_some()))
        .unwrap_or(false)
}
