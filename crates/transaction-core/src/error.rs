//! Error types for the transaction engine
//!
//! Two families live here:
//!
//! - [`TransactionError`]: why a single transaction attempt failed. These never
//!   escape a worker; their `Display` text is recorded as the attempt's
//!   `error_message` and [`TransactionError::is_retryable`] feeds the dispatcher's
//!   retry decision.
//! - [`ServiceError`]: failures of the request surface itself (service stopped,
//!   malformed request, bad configuration).
//!
//! Collaborator errors ([`StoreError`](crate::store::StoreError),
//! [`CodecError`](crate::pdu::CodecError),
//! [`TransportError`](crate::http::TransportError)) are defined next to their traits.

use thiserror::Error;

use crate::pdu::CodecError;
use crate::store::StoreError;

/// Result type for transaction steps
pub type TransactionResult<T> = std::result::Result<T, TransactionError>;

/// Result type for dispatcher and glue operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Failure causes of a transaction attempt
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// The stored PDU could not be read
    #[error("failed to load {what}: {reason}")]
    Load { what: &'static str, reason: String },

    /// The PDU could not be encoded
    #[error("failed to create PDU data: {0}")]
    Compose(String),

    /// Carrier configuration has no MMSC endpoint
    #[error("no MMSC endpoint configured")]
    NoEndpoint,

    /// Every POST attempt ended without a response
    #[error("no response from MMSC after retries")]
    TransportExhausted { attempts: u32 },

    /// The notification's content could not be fetched
    #[error("failed to download MMS content: {0}")]
    Download(String),

    /// The notification carries no content location
    #[error("no content location in notification")]
    MissingContentLocation,

    /// Downloaded or received bytes are not the expected PDU
    #[error("failed to parse {what}: {reason}")]
    Parse { what: &'static str, reason: String },

    /// The message store rejected a write
    #[error("failed to persist {what}: {reason}")]
    Persist { what: &'static str, reason: String },

    /// The send budget ran out at a step boundary
    #[error("transaction timeout")]
    Timeout,

    /// The attempt was cancelled
    #[error("transaction cancelled")]
    Cancelled,

    /// `process()` was called on an attempt that is already running
    #[error("transaction already started")]
    AlreadyStarted,

    /// The worker panicked
    #[error("transaction worker aborted: {0}")]
    Worker(String),
}

impl TransactionError {
    /// Whether the dispatcher may schedule another attempt.
    ///
    /// A missing endpoint or an unencodable PDU fails the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransactionError::Load { .. }
            | TransactionError::TransportExhausted { .. }
            | TransactionError::Download(_)
            | TransactionError::Parse { .. }
            | TransactionError::Persist { .. }
            | TransactionError::Timeout
            | TransactionError::Worker(_) => true,
            TransactionError::Compose(_)
            | TransactionError::NoEndpoint
            | TransactionError::MissingContentLocation
            | TransactionError::Cancelled
            | TransactionError::AlreadyStarted => false,
        }
    }

    /// Short category name for structured logs
    pub fn category(&self) -> &'static str {
        match self {
            TransactionError::Load { .. } => "load",
            TransactionError::Compose(_) => "compose",
            TransactionError::NoEndpoint => "no_endpoint",
            TransactionError::TransportExhausted { .. } | TransactionError::Download(_) => "transport",
            TransactionError::MissingContentLocation | TransactionError::Parse { .. } => "parse",
            TransactionError::Persist { .. } => "persist",
            TransactionError::Timeout => "timeout",
            TransactionError::Cancelled => "cancelled",
            TransactionError::AlreadyStarted | TransactionError::Worker(_) => "internal",
        }
    }
}

/// Errors from the dispatcher and the send/receive glue
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The dispatcher loop is no longer running
    #[error("transaction service is stopped")]
    Stopped,

    /// A raw request named a transaction kind the engine does not implement
    #[error("unknown transaction kind: {0}")]
    UnknownKind(i32),

    /// The request is malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Message store failure
    #[error("message store error: {0}")]
    Store(#[from] StoreError),

    /// PDU codec failure
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ServiceError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}
