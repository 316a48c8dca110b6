//! Data directory and event logger shared by the menu and the plugins

use std::path::PathBuf;

use anyhow::{Context, Result};
use prometeo_core::{LogEvent, LoggingService};

/// Environment variable overriding the data directory
pub const PROMETEO_DIR_ENV: &str = "PROMETEO_DIR";

/// Get the data directory from the environment or default to ~/.prometeo
pub fn get_prometeo_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(PROMETEO_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".prometeo"))
}

/// Open the event log in the data directory
///
/// Returns None if logging fails to initialize (logging never blocks the app)
pub fn get_logger(dir: &std::path::Path) -> Option<LoggingService> {
    std::fs::create_dir_all(dir).ok()?;
    LoggingService::new(dir, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: Option<&LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}
