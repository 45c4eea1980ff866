use std::time::Duration;

use crate::transaction::{TransactionKey, TransactionState};

/// Observable dispatcher activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    /// A worker was spawned for attempt `attempt` (1-based)
    Started { key: TransactionKey, attempt: u32 },

    /// A submission was dropped because the key is already in flight
    Duplicate { key: TransactionKey },

    /// Attempt failed and another one will start after `delay`
    RetryScheduled {
        key: TransactionKey,
        retry_count: u32,
        delay: Duration,
    },

    /// The transaction left the dispatcher with this terminal state
    Finished { key: TransactionKey, state: TransactionState },

    /// No transaction is in flight
    Idle,
}

impl ServiceEvent {
    pub fn key(&self) -> Option<&TransactionKey> {
        match self {
            ServiceEvent::Started { key, .. }
            | ServiceEvent::Duplicate { key }
            | ServiceEvent::RetryScheduled { key, .. }
            | ServiceEvent::Finished { key, .. } => Some(key),
            ServiceEvent::Idle => None,
        }
    }
}
