//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};

/// Prefix shown before every typed prompt
pub const INPUT_PREFIX: &str = "--> ";

const BANNER: &str = r"
     ____                           _                ____ _     ___
    |  _ \ _ __ ___  _ __ ___   ___| |_ ___  ___    / ___| |   |_ _|
    | |_) | '__/ _ \| '_ ` _ \ / _ \ __/ _ \/ _ \  | |   | |    | |
    |  __/| | | (_) | | | | | |  __/ ||  __/ (_) | | |___| |___ | |
    |_|   |_|  \___/|_| |_| |_|\___|\__\___|\___/   \____|_____|___|
";

/// Severity of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn prefix(&self) -> &'static str {
        match self {
            Level::Info => "INFO::",
            Level::Success => "OK::",
            Level::Warning => "WARNING::",
            Level::Error => "ERROR::",
        }
    }
}

/// Status line with its level prefix. Only the prefix is colored, and only
/// while `colored` has colors enabled.
pub fn format_line(level: Level, msg: &str) -> String {
    let prefix = level.prefix();
    let prefix = match level {
        Level::Info => prefix.bright_white(),
        Level::Success => prefix.green(),
        Level::Warning => prefix.yellow(),
        Level::Error => prefix.bright_red(),
    };
    format!("{}{}", prefix, msg)
}

pub fn banner() -> String {
    BANNER.red().to_string()
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format a unix timestamp in milliseconds as UTC time
pub fn format_timestamp(timestamp_ms: i64) -> String {
    use chrono::{TimeZone, Utc};
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}
