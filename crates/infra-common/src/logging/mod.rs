//! Logging setup and structured log contexts

pub mod context;
pub mod setup;

pub use context::{with_context, LogContext};
pub use setup::{parse_log_level, setup_logging, try_setup_logging, LoggingConfig};
