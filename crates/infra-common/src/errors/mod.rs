//! Error types for infra-common

pub mod types;

pub use types::{Error, Result};
