//! Message store collaborator
//!
//! The engine reads PDUs from and files them into a message store addressed by
//! opaque [`MessageRef`] locations. The store owns mailbox bookkeeping; the
//! engine only asks it to `load`, `persist`, `move_to`, `delete` and `update`.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::mailbox::{Mailbox, MessageRef};
use crate::pdu::{MessageClass, Pdu, Priority, ResponseStatus};

pub use memory::{MemoryMessageStore, StoredMessage};

/// Errors reported by a message store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("no message at {0}")]
    NotFound(MessageRef),

    #[error("cannot move message from {from} to {to}")]
    InvalidTransition { from: Mailbox, to: Mailbox },

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        StoreError::Backend(msg.into())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Header fields written back onto a stored message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageUpdate {
    pub response_status: Option<ResponseStatus>,
    pub date: Option<DateTime<Utc>>,
    pub expiry: Option<u64>,
    pub priority: Option<Priority>,
    pub delivery_report: Option<bool>,
    pub read_report: Option<bool>,
    pub message_class: Option<MessageClass>,
}

impl MessageUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response_status(mut self, status: ResponseStatus) -> Self {
        self.response_status = Some(status);
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_expiry(mut self, seconds: u64) -> Self {
        self.expiry = Some(seconds);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_reports(mut self, delivery: bool, read: bool) -> Self {
        self.delivery_report = Some(delivery);
        self.read_report = Some(read);
        self
    }

    pub fn with_message_class(mut self, class: MessageClass) -> Self {
        self.message_class = Some(class);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Copy the PDU-level fields onto a stored send request.
    ///
    /// Other PDU kinds carry none of these headers and are left untouched.
    pub fn apply_to(&self, pdu: &mut Pdu) {
        if let Pdu::SendRequest(req) = pdu {
            if let Some(date) = self.date {
                req.date = Some(date);
            }
            if let Some(expiry) = self.expiry {
                req.expiry = Some(expiry);
            }
            if let Some(priority) = self.priority {
                req.priority = priority;
            }
            if let Some(delivery) = self.delivery_report {
                req.delivery_report = delivery;
            }
            if let Some(read) = self.read_report {
                req.read_report = read;
            }
            if let Some(class) = self.message_class {
                req.message_class = class;
            }
        }
    }
}

/// Persistent storage for MMS messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Load the PDU stored at `location`; `Ok(None)` when the row holds no PDU
    async fn load(&self, location: &MessageRef) -> StoreResult<Option<Pdu>>;

    /// Store a PDU in `mailbox`, returning its new location
    async fn persist(&self, pdu: &Pdu, mailbox: Mailbox, as_text: bool) -> StoreResult<MessageRef>;

    /// Refile a message, returning its location afterwards
    async fn move_to(&self, location: &MessageRef, dest: Mailbox) -> StoreResult<MessageRef>;

    /// Remove a message
    async fn delete(&self, location: &MessageRef) -> StoreResult<()>;

    /// Write header fields onto a stored message
    async fn update(&self, location: &MessageRef, update: &MessageUpdate) -> StoreResult<()>;
}
