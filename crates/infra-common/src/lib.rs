//! Common infrastructure for the RMMS stack
//!
//! This crate carries the ambient pieces every other RMMS crate leans on:
//!
//! - [`logging`]: subscriber setup (plain or JSON output, env-filter driven) and
//!   [`LogContext`](logging::LogContext), a small helper for building spans that
//!   carry a component, an operation and arbitrary key/value context.
//! - [`errors`]: the error type returned by the setup helpers.

pub mod errors;
pub mod logging;

pub use errors::{Error, Result};
pub use logging::{LogContext, LoggingConfig};
