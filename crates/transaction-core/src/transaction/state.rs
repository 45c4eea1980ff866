use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::mailbox::MessageRef;

/// Lifecycle phase of one transaction attempt.
///
/// `Initialized` → `Processing` → one of `Success`, `Failed`, `Cancelled`.
/// The last three are terminal: once reached, the phase never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionPhase {
    Initialized,
    Processing,
    Success,
    Failed,
    Cancelled,
}

impl TransactionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionPhase::Success | TransactionPhase::Failed | TransactionPhase::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionPhase::Initialized => "INITIALIZED",
            TransactionPhase::Processing => "PROCESSING",
            TransactionPhase::Success => "SUCCESS",
            TransactionPhase::Failed => "FAILED",
            TransactionPhase::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TransactionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle record of one transaction attempt
///
/// `result_location` is set exactly when the phase is `Success`. A successful
/// attempt may still carry a non-fatal note in `error_message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionState {
    phase: TransactionPhase,
    error_message: Option<String>,
    result_location: Option<MessageRef>,
    last_updated: DateTime<Utc>,
}

impl Default for TransactionState {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionState {
    pub fn new() -> Self {
        Self {
            phase: TransactionPhase::Initialized,
            error_message: None,
            result_location: None,
            last_updated: Utc::now(),
        }
    }

    pub fn phase(&self) -> TransactionPhase {
        self.phase
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn result_location(&self) -> Option<&MessageRef> {
        self.result_location.as_ref()
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn is_completed(&self) -> bool {
        self.phase.is_terminal()
    }

    /// `Initialized` → `Processing`. Returns `false` if the attempt already started or ended.
    pub fn begin_processing(&mut self) -> bool {
        if self.phase != TransactionPhase::Initialized {
            return false;
        }
        self.set_phase(TransactionPhase::Processing);
        true
    }

    /// Enter `Success` with the resulting message location and an optional note
    pub fn succeed(&mut self, location: MessageRef, note: Option<String>) -> bool {
        if self.is_completed() {
            return false;
        }
        self.result_location = Some(location);
        self.error_message = note;
        self.set_phase(TransactionPhase::Success);
        true
    }

    /// Enter `Failed` with a reason
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.is_completed() {
            return false;
        }
        self.result_location = None;
        self.error_message = Some(message.into());
        self.set_phase(TransactionPhase::Failed);
        true
    }

    /// Enter `Cancelled`
    pub fn cancel(&mut self) -> bool {
        if self.is_completed() {
            return false;
        }
        self.result_location = None;
        self.set_phase(TransactionPhase::Cancelled);
        true
    }

    fn set_phase(&mut self, phase: TransactionPhase) {
        trace!(from = %self.phase, to = %phase, "Transaction phase change");
        self.phase = phase;
        self.last_updated = Utc::now();
    }
}

/// A [`TransactionState`] shared between the worker that writes it and the
/// dispatcher and callers that read it
#[derive(Debug, Clone, Default)]
pub struct SharedTransactionState {
    inner: Arc<RwLock<TransactionState>>,
}

impl SharedTransactionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> TransactionState {
        self.inner.read().clone()
    }

    pub fn phase(&self) -> TransactionPhase {
        self.inner.read().phase()
    }

    pub fn is_completed(&self) -> bool {
        self.inner.read().is_completed()
    }

    pub fn begin_processing(&self) -> bool {
        self.inner.write().begin_processing()
    }

    pub fn succeed(&self, location: MessageRef, note: Option<String>) -> bool {
        self.inner.write().succeed(location, note)
    }

    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.inner.write().fail(message)
    }

    pub fn cancel(&self) -> bool {
        self.inner.write().cancel()
    }
}
