//! Service layer
//!
//! Services that sit beside the banking client rather than behind it.

pub mod logging;

pub use logging::{LogEntry, LogEvent, LoggingService, LOG_DB_FILE};
