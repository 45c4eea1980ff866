//! # Transaction service
//!
//! [`TransactionService`] owns every in-flight [`Transaction`]. It guarantees
//! at most one active transaction per [`TransactionKey`], spawns a worker per
//! attempt (bounded by a semaphore), and runs the outer retry layer: a failed,
//! retryable attempt is started again after `base × 2^(n-1)` for retry `n`,
//! until the transaction's retry bound is reached.
//!
//! All scheduling decisions happen on one dispatcher task, driven by explicit
//! completion reports from the workers. Handles are cheap to clone; dropping the
//! last one stops the dispatcher and cancels whatever is still running.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rmms_transaction_core::{
//!     HttpTransportConfig, MemoryMessageStore, ReqwestTransport, StaticCarrierConfig,
//!     TransactionContext, TransactionRequest, TransactionService,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let carrier = StaticCarrierConfig::new("http://mmsc.example.com/mms");
//! let ctx = TransactionContext::builder()
//!     .store(Arc::new(MemoryMessageStore::new()))
//!     .http(Arc::new(ReqwestTransport::for_carrier(HttpTransportConfig::default(), &carrier)?))
//!     .carrier(Arc::new(carrier))
//!     .build()?;
//!
//! let service = TransactionService::start(ctx)?;
//! let key = service.submit(TransactionRequest::send("content://mms/12", 1))?;
//! println!("{:?}", service.state_of(&key));
//! # Ok(())
//! # }
//! ```

mod dispatcher;
mod events;

pub use events::ServiceEvent;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::transaction::{Transaction, TransactionContext, TransactionKey, TransactionRequest, TransactionState};
use dispatcher::{Command, Dispatcher};

pub(crate) struct Shared {
    ctx: TransactionContext,
    active: DashMap<TransactionKey, Transaction>,
    finished: DashMap<TransactionKey, TransactionState>,
    events: broadcast::Sender<ServiceEvent>,
    running: AtomicBool,
    permits: Arc<Semaphore>,
}

impl Shared {
    fn emit(&self, event: ServiceEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Handle to the transaction dispatcher
#[derive(Clone)]
pub struct TransactionService {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
    dispatcher: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl TransactionService {
    /// Spawn the dispatcher. Must be called from within a tokio runtime.
    pub fn start(ctx: TransactionContext) -> ServiceResult<Self> {
        ctx.config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ServiceError::configuration("transaction service must start inside a tokio runtime"))?;

        let (events, _) = broadcast::channel(ctx.config.event_capacity);
        let permits = Arc::new(Semaphore::new(ctx.config.max_concurrent_transactions));
        let shared = Arc::new(Shared {
            ctx,
            active: DashMap::new(),
            finished: DashMap::new(),
            events,
            running: AtomicBool::new(true),
            permits,
        });

        let (commands, commands_rx) = mpsc::unbounded_channel();
        let handle = runtime.spawn(Dispatcher::new(shared.clone(), commands_rx).run());
        info!(
            max_concurrent = shared.ctx.config.max_concurrent_transactions,
            max_retries = shared.ctx.config.max_retries,
            "Transaction service started"
        );

        Ok(Self {
            shared,
            commands,
            dispatcher: Arc::new(Mutex::new(Some(handle))),
        })
    }

    /// Queue a transaction. Returns immediately.
    ///
    /// A request whose key is already in flight is dropped (a
    /// [`ServiceEvent::Duplicate`] is emitted) and still reported as accepted.
    /// Progress is observed through [`state_of`](Self::state_of), the event
    /// stream, or the message store.
    pub fn submit(&self, request: TransactionRequest) -> ServiceResult<TransactionKey> {
        if !self.is_running() {
            return Err(ServiceError::Stopped);
        }
        if request.location.is_empty() {
            return Err(ServiceError::invalid_request("message location is empty"));
        }

        let key = request.key();
        match self.shared.active.entry(key.clone()) {
            Entry::Occupied(_) => {
                debug!(key = %key, "Transaction already in flight, dropping duplicate");
                self.shared.emit(ServiceEvent::Duplicate { key: key.clone() });
                return Ok(key);
            }
            Entry::Vacant(slot) => {
                slot.insert(Transaction::new(request, self.shared.ctx.config.max_retries));
            }
        }
        self.shared.finished.remove(&key);

        if self.commands.send(Command::Start(key.clone())).is_err() {
            self.shared.active.remove(&key);
            return Err(ServiceError::Stopped);
        }
        debug!(key = %key, "Transaction queued");
        Ok(key)
    }

    /// Cancel an in-flight transaction. Returns `false` if none was active.
    pub async fn cancel(&self, key: &TransactionKey) -> ServiceResult<bool> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Cancel(key.clone(), reply))
            .map_err(|_| ServiceError::Stopped)?;
        response.await.map_err(|_| ServiceError::Stopped)
    }

    /// Cancel everything in flight and stop the dispatcher
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Shutdown(reply)).is_ok() {
            let _ = done.await;
        }

        let handle = self.dispatcher.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Dispatcher task ended abnormally");
            }
        }
    }

    /// Current state of an active transaction, else the last terminal state
    /// recorded for the key
    pub fn state_of(&self, key: &TransactionKey) -> Option<TransactionState> {
        if let Some(tx) = self.shared.active.get(key) {
            return Some(tx.state());
        }
        self.shared.finished.get(key).map(|state| state.clone())
    }

    /// Retry count of an active transaction
    pub fn retry_count(&self, key: &TransactionKey) -> Option<u32> {
        self.shared.active.get(key).map(|tx| tx.retry_count())
    }

    pub fn active_count(&self) -> usize {
        self.shared.active.len()
    }

    pub fn active_keys(&self) -> Vec<TransactionKey> {
        self.shared.active.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn is_idle(&self) -> bool {
        self.shared.active.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.shared.events.subscribe()
    }

    pub fn context(&self) -> &TransactionContext {
        &self.shared.ctx
    }
}

impl std::fmt::Debug for TransactionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionService")
            .field("running", &self.is_running())
            .field("active", &self.active_count())
            .finish()
    }
}
