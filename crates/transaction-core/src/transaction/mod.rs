//! # Transactions
//!
//! A transaction ties one stored message to one protocol exchange with the MMSC
//! and tracks it through a [`TransactionState`]. Two kinds exist:
//!
//! | Kind | Input mailbox | Protocol | Success mailbox |
//! |------|---------------|----------|-----------------|
//! | [`TransactionKind::Send`] | OUTBOX | POST M-Send.req, read M-Send.conf | SENT |
//! | [`TransactionKind::Notification`] | NOTIFICATION_PLACEHOLDER | GET content, parse M-Retrieve.conf | INBOX |
//!
//! The protocol logic is a closed set, so it is a tagged union
//! ([`TransactionLogic`]) matched in one place rather than a trait object.
//!
//! ## Lifecycle
//!
//! [`Transaction::process`] spawns the attempt on its own tokio task and returns
//! at once. The worker owns all state writes; everyone else reads snapshots.
//! When the worker reaches a terminal phase it reports a
//! [`TransactionCompletion`] (when running under the
//! [`TransactionService`](crate::service::TransactionService)); nothing decides
//! on retry or cleanup by peeking at the state right after `process()`.
//!
//! A retry reuses the same `Transaction` with a fresh attempt id and a fresh
//! state, so completions from an earlier attempt can be told apart.

mod context;
mod notification;
mod runner;
mod send;
mod state;

pub use context::{TransactionContext, TransactionContextBuilder};
pub use notification::NotificationTransaction;
pub use send::SendTransaction;
pub use state::{SharedTransactionState, TransactionPhase, TransactionState};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult, TransactionError, TransactionResult};
use crate::mailbox::MessageRef;

/// The two transaction kinds.
///
/// Integer codes match what glue layers pass around: `1` = send, `2` = notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Send,
    Notification,
}

impl TransactionKind {
    pub fn code(&self) -> i32 {
        match self {
            TransactionKind::Send => 1,
            TransactionKind::Notification => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(TransactionKind::Send),
            2 => Some(TransactionKind::Notification),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Send => "send",
            TransactionKind::Notification => "notification",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an in-flight transaction: message location plus kind.
///
/// The dispatcher allows at most one active transaction per key. A send and a
/// notification for the same location have different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionKey {
    pub location: MessageRef,
    pub kind: TransactionKind,
}

impl TransactionKey {
    pub fn new(location: impl Into<MessageRef>, kind: TransactionKind) -> Self {
        Self {
            location: location.into(),
            kind,
        }
    }

    pub fn send(location: impl Into<MessageRef>) -> Self {
        Self::new(location, TransactionKind::Send)
    }

    pub fn notification(location: impl Into<MessageRef>) -> Self {
        Self::new(location, TransactionKind::Notification)
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.location, self.kind.code())
    }
}

/// A request to run one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub location: MessageRef,
    pub kind: TransactionKind,
    /// Opaque transport token handed to the HTTP transport on POST
    pub token: u64,
}

impl TransactionRequest {
    pub fn new(location: impl Into<MessageRef>, kind: TransactionKind, token: u64) -> Self {
        Self {
            location: location.into(),
            kind,
            token,
        }
    }

    pub fn send(location: impl Into<MessageRef>, token: u64) -> Self {
        Self::new(location, TransactionKind::Send, token)
    }

    pub fn notification(location: impl Into<MessageRef>) -> Self {
        Self::new(location, TransactionKind::Notification, 0)
    }

    /// Build a request from an integer kind code; unknown codes are rejected
    pub fn from_raw(location: impl Into<MessageRef>, kind_code: i32, token: u64) -> ServiceResult<Self> {
        let kind = TransactionKind::from_code(kind_code).ok_or(ServiceError::UnknownKind(kind_code))?;
        Ok(Self::new(location, kind, token))
    }

    pub fn key(&self) -> TransactionKey {
        TransactionKey::new(self.location.clone(), self.kind)
    }
}

/// What a successful run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Location of the resulting message
    pub location: MessageRef,
    /// Non-fatal note recorded as the state's error message
    pub note: Option<String>,
}

/// Protocol logic of a transaction, one variant per kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionLogic {
    Send(SendTransaction),
    Notification(NotificationTransaction),
}

impl TransactionLogic {
    pub fn for_request(request: &TransactionRequest) -> Self {
        match request.kind {
            TransactionKind::Send => {
                TransactionLogic::Send(SendTransaction::new(request.location.clone(), request.token))
            }
            TransactionKind::Notification => {
                TransactionLogic::Notification(NotificationTransaction::new(request.location.clone()))
            }
        }
    }

    pub fn kind(&self) -> TransactionKind {
        match self {
            TransactionLogic::Send(_) => TransactionKind::Send,
            TransactionLogic::Notification(_) => TransactionKind::Notification,
        }
    }

    pub async fn run(&self, ctx: &TransactionContext) -> TransactionResult<Outcome> {
        match self {
            TransactionLogic::Send(send) => send.run(ctx).await,
            TransactionLogic::Notification(notification) => notification.run(ctx).await,
        }
    }
}

/// Report a worker sends when its attempt reaches a terminal phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCompletion {
    pub key: TransactionKey,
    /// Attempt id the report belongs to
    pub id: Uuid,
    pub phase: TransactionPhase,
    /// Whether the failure cause allows another attempt
    pub retryable: bool,
}

/// One transaction: a key, its protocol logic, a lifecycle and a retry count
pub struct Transaction {
    key: TransactionKey,
    id: Uuid,
    retry_count: u32,
    max_retries: u32,
    state: SharedTransactionState,
    logic: TransactionLogic,
    worker: Option<JoinHandle<()>>,
    started: bool,
}

impl Transaction {
    pub fn new(request: TransactionRequest, max_retries: u32) -> Self {
        Self {
            key: request.key(),
            id: Uuid::new_v4(),
            retry_count: 0,
            max_retries,
            state: SharedTransactionState::new(),
            logic: TransactionLogic::for_request(&request),
            worker: None,
            started: false,
        }
    }

    pub fn key(&self) -> &TransactionKey {
        &self.key
    }

    pub fn location(&self) -> &MessageRef {
        &self.key.location
    }

    pub fn kind(&self) -> TransactionKind {
        self.key.kind
    }

    /// Id of the current attempt
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// 1-based number of the current attempt
    pub fn attempt(&self) -> u32 {
        self.retry_count + 1
    }

    /// True while fewer than `max_retries` retries have been scheduled
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub fn state(&self) -> TransactionState {
        self.state.snapshot()
    }

    pub fn shared_state(&self) -> SharedTransactionState {
        self.state.clone()
    }

    pub fn is_completed(&self) -> bool {
        self.state.is_completed()
    }

    /// Start the attempt on its own task. Returns immediately.
    ///
    /// Calling it a second time for the same attempt is an error.
    pub fn process(&mut self, ctx: &TransactionContext) -> TransactionResult<()> {
        self.spawn_worker(ctx, None, None)
    }

    pub(crate) fn spawn_worker(
        &mut self,
        ctx: &TransactionContext,
        permits: Option<Arc<Semaphore>>,
        completions: Option<mpsc::UnboundedSender<TransactionCompletion>>,
    ) -> TransactionResult<()> {
        if self.started {
            warn!(key = %self.key, "process() called on a transaction that already started");
            return Err(TransactionError::AlreadyStarted);
        }
        self.started = true;

        let worker = runner::Worker {
            key: self.key.clone(),
            id: self.id,
            attempt: self.attempt(),
            logic: self.logic.clone(),
            state: self.state.clone(),
            ctx: ctx.clone(),
            permits,
            completions,
        };
        debug!(key = %self.key, attempt = self.attempt(), "Spawning transaction worker");
        self.worker = Some(tokio::spawn(worker.run()));
        Ok(())
    }

    /// Force the attempt into `Failed`
    pub fn mark_failed(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        error!(key = %self.key, reason = %reason, "Transaction marked failed");
        self.state.fail(reason)
    }

    /// Abort the worker, then enter `Cancelled`.
    ///
    /// Store writes the worker already made stay in place. Returns `false` when
    /// the attempt had already reached a terminal phase.
    pub fn cancel(&mut self) -> bool {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        let cancelled = self.state.cancel();
        if cancelled {
            debug!(key = %self.key, "Transaction cancelled");
        }
        cancelled
    }

    /// Wait for the current worker to finish
    pub async fn wait(&mut self) {
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                if !e.is_cancelled() {
                    warn!(key = %self.key, error = %e, "Transaction worker ended abnormally");
                }
            }
        }
    }

    /// Count one more retry. Returns the new retry count, or `None` when the
    /// bound is reached.
    pub(crate) fn schedule_retry(&mut self) -> Option<u32> {
        if !self.can_retry() {
            return None;
        }
        self.retry_count += 1;
        Some(self.retry_count)
    }

    /// Prepare a fresh attempt: new id, new state, not yet started
    pub(crate) fn reset_for_retry(&mut self) {
        self.id = Uuid::new_v4();
        self.state = SharedTransactionState::new();
        self.worker = None;
        self.started = false;
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("retry_count", &self.retry_count)
            .field("phase", &self.state.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        assert_eq!(TransactionKind::from_code(1), Some(TransactionKind::Send));
        assert_eq!(TransactionKind::from_code(2), Some(TransactionKind::Notification));
        assert_eq!(TransactionKind::from_code(0), None);
        assert_eq!(TransactionKind::Notification.code(), 2);
    }

    #[test]
    fn test_key_identity() {
        let send = TransactionKey::send("content://mms/4");
        let notification = TransactionKey::notification("content://mms/4");
        assert_ne!(send, notification);
        assert_eq!(send, TransactionRequest::send("content://mms/4", 99).key());
        assert_eq!(send.to_string(), "content://mms/4_1");
    }

    #[test]
    fn test_from_raw_rejects_unknown_kind() {
        let err = TransactionRequest::from_raw("content://mms/1", 7, 0).unwrap_err();
        assert!(matches!(err, ServiceError::UnknownKind(7)));

        let request = TransactionRequest::from_raw("content://mms/1", 2, 0).unwrap();
        assert_eq!(request.kind, TransactionKind::Notification);
    }

    #[test]
    fn test_retry_bound() {
        let mut tx = Transaction::new(TransactionRequest::send("content://mms/1", 0), 3);
        let first = tx.id();
        for expected in 1..=3 {
            assert!(tx.can_retry());
            assert_eq!(tx.schedule_retry(), Some(expected));
            tx.reset_for_retry();
        }
        assert!(!tx.can_retry());
        assert_eq!(tx.schedule_retry(), None);
        assert_eq!(tx.retry_count(), 3);
        assert_eq!(tx.attempt(), 4);
        assert_ne!(tx.id(), first);
    }

    #[test]
    fn test_mark_failed_and_cancel_without_worker() {
        let mut tx = Transaction::new(TransactionRequest::notification("content://mms/2"), 3);
        assert!(tx.mark_failed("load failed"));
        assert!(tx.is_completed());
        assert!(!tx.cancel());
        assert_eq!(tx.state().phase(), TransactionPhase::Failed);
        assert_eq!(tx.state().error_message(), Some("load failed"));
    }
}
