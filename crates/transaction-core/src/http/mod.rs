//! HTTP transport to the MMSC
//!
//! Transactions only need two calls: POST an encoded PDU and GET a content
//! location. A transport reports "no response" (`Ok(None)`) for non-200
//! answers; `Err` is reserved for requests that never completed. Callers treat
//! both as a failed attempt.

pub mod reqwest_transport;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use reqwest_transport::ReqwestTransport;

/// Errors raised by an HTTP transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Moves PDUs to and from the MMSC
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST `body` to `url`. `token` identifies the caller's network session.
    async fn post(
        &self,
        url: &str,
        body: Bytes,
        content_type: &str,
        token: u64,
    ) -> TransportResult<Option<Bytes>>;

    /// GET the content at `url`
    async fn get(&self, url: &str) -> TransportResult<Option<Bytes>>;
}
