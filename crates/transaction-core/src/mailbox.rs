//! Message locations and mailbox folders

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque location of a stored message (a store URI such as `content://mms/12`).
///
/// The engine never interprets the string; it only hands it back to the
/// [`MessageStore`](crate::store::MessageStore).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRef(String);

impl MessageRef {
    /// Wrap a store location
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// The raw location string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the location is empty
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MessageRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for MessageRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Logical folder of a stored message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mailbox {
    Draft,
    Outbox,
    Sent,
    Failed,
    Inbox,
    NotificationPlaceholder,
}

impl Mailbox {
    /// Folder identifier used by the store
    pub fn as_str(&self) -> &'static str {
        match self {
            Mailbox::Draft => "DRAFTS",
            Mailbox::Outbox => "OUTBOX",
            Mailbox::Sent => "SENT",
            Mailbox::Failed => "FAILED",
            Mailbox::Inbox => "INBOX",
            Mailbox::NotificationPlaceholder => "NOTIFICATION_PLACEHOLDER",
        }
    }

    /// Whether a `move` from `self` to `dest` is a legal filing step.
    ///
    /// A placeholder becomes an inbox message only through persist + delete,
    /// so no move leaves or enters `NotificationPlaceholder`.
    pub fn can_move_to(&self, dest: Mailbox) -> bool {
        if *self == dest {
            return true;
        }
        matches!(
            (self, dest),
            (Mailbox::Draft, Mailbox::Outbox)
                | (Mailbox::Outbox, Mailbox::Sent)
                | (Mailbox::Outbox, Mailbox::Failed)
                | (Mailbox::Failed, Mailbox::Outbox)
        )
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
