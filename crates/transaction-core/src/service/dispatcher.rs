//! The dispatcher loop.
//!
//! One task consumes three channels and makes every scheduling decision:
//!
//! - `commands`: start, cancel and shutdown requests from service handles
//! - `completions`: terminal reports from transaction workers
//! - `followups`: due retries and finished FAILED filings from helper tasks
//!
//! Only the `commands` senders live outside the loop, so the loop notices when
//! the last service handle is dropped.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ServiceEvent, Shared};
use crate::mailbox::Mailbox;
use crate::transaction::{TransactionCompletion, TransactionKey, TransactionKind, TransactionPhase};

/// Terminal states kept for `state_of` after a transaction retires
pub(crate) const FINISHED_CAPACITY: usize = 1024;

#[derive(Debug)]
pub(crate) enum Command {
    Start(TransactionKey),
    Cancel(TransactionKey, oneshot::Sender<bool>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug)]
enum Followup {
    RetryDue { key: TransactionKey, id: Uuid },
    Filed { key: TransactionKey, id: Uuid },
}

pub(crate) struct Dispatcher {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedReceiver<Command>,
    completions_tx: mpsc::UnboundedSender<TransactionCompletion>,
    completions: mpsc::UnboundedReceiver<TransactionCompletion>,
    followups_tx: mpsc::UnboundedSender<Followup>,
    followups: mpsc::UnboundedReceiver<Followup>,
    stop: bool,
}

impl Dispatcher {
    pub(crate) fn new(shared: Arc<Shared>, commands: mpsc::UnboundedReceiver<Command>) -> Self {
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (followups_tx, followups) = mpsc::unbounded_channel();
        Self {
            shared,
            commands,
            completions_tx,
            completions,
            followups_tx,
            followups,
            stop: false,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!("Transaction dispatcher started");
        let mut shutdown_reply = None;

        while !self.stop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Start(key)) => self.start(&key),
                    Some(Command::Cancel(key, reply)) => {
                        let _ = reply.send(self.cancel(&key));
                    }
                    Some(Command::Shutdown(reply)) => {
                        info!("Transaction dispatcher shutting down");
                        self.cancel_all();
                        shutdown_reply = Some(reply);
                        self.stop = true;
                    }
                    None => {
                        debug!("All service handles dropped, stopping dispatcher");
                        self.cancel_all();
                        self.stop = true;
                    }
                },
                Some(completion) = self.completions.recv() => self.on_completion(completion),
                Some(followup) = self.followups.recv() => self.on_followup(followup),
            }
        }

        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.permits.close();

        // Starts that raced with the stop never get a worker
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Start(key) => {
                    self.shared.active.remove(&key);
                }
                Command::Cancel(_, reply) => {
                    let _ = reply.send(false);
                }
                Command::Shutdown(reply) => {
                    let _ = reply.send(());
                }
            }
        }

        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
        debug!("Transaction dispatcher stopped");
    }

    fn start(&mut self, key: &TransactionKey) {
        let Some(mut tx) = self.shared.active.get_mut(key) else {
            debug!(key = %key, "Start for unknown transaction ignored");
            return;
        };

        match tx.spawn_worker(
            &self.shared.ctx,
            Some(self.shared.permits.clone()),
            Some(self.completions_tx.clone()),
        ) {
            Ok(()) => {
                let attempt = tx.attempt();
                drop(tx);
                self.shared.emit(ServiceEvent::Started { key: key.clone(), attempt });
            }
            Err(e) => debug!(key = %key, error = %e, "Start ignored"),
        }
    }

    fn on_completion(&mut self, completion: TransactionCompletion) {
        let TransactionCompletion { key, id, phase, retryable } = completion;

        let retry = {
            let Some(mut tx) = self.shared.active.get_mut(&key) else {
                debug!(key = %key, "Completion for retired transaction ignored");
                return;
            };
            if tx.id() != id {
                debug!(key = %key, "Stale completion ignored");
                return;
            }
            debug!(key = %key, phase = %phase, retryable, retry_count = tx.retry_count(), "Transaction completed");

            if phase == TransactionPhase::Failed && retryable {
                tx.schedule_retry()
            } else {
                None
            }
        };

        if let Some(retry_count) = retry {
            let delay = self.shared.ctx.config.retry_delay(retry_count);
            info!(key = %key, retry_count, delay_ms = delay.as_millis() as u64, "Scheduling transaction retry");
            self.shared.emit(ServiceEvent::RetryScheduled {
                key: key.clone(),
                retry_count,
                delay,
            });
            self.schedule_followup(delay, Followup::RetryDue { key, id });
            return;
        }

        if key.kind == TransactionKind::Send
            && phase == TransactionPhase::Failed
            && self.shared.ctx.config.file_failed_sends
        {
            self.file_failed_send(key, id);
        } else {
            self.retire(&key);
        }
    }

    fn on_followup(&mut self, followup: Followup) {
        match followup {
            Followup::RetryDue { key, id } => {
                let restarted = match self.shared.active.get_mut(&key) {
                    Some(mut tx) if tx.id() == id => {
                        tx.reset_for_retry();
                        let spawned = tx.spawn_worker(
                            &self.shared.ctx,
                            Some(self.shared.permits.clone()),
                            Some(self.completions_tx.clone()),
                        );
                        spawned.map(|_| tx.attempt()).ok()
                    }
                    _ => None,
                };
                match restarted {
                    Some(attempt) => self.shared.emit(ServiceEvent::Started { key, attempt }),
                    None => debug!(key = %key, "Retry no longer wanted"),
                }
            }
            Followup::Filed { key, id } => {
                let current = self.shared.active.get(&key).map(|tx| tx.id() == id).unwrap_or(false);
                if current {
                    self.retire(&key);
                }
            }
        }
    }

    /// OUTBOX → FAILED for a send that will not be retried, then retire
    fn file_failed_send(&self, key: TransactionKey, id: Uuid) {
        let store = self.shared.ctx.store.clone();
        let followups = self.followups_tx.clone();
        tokio::spawn(async move {
            match store.move_to(&key.location, Mailbox::Failed).await {
                Ok(failed) => info!(key = %key, failed = %failed, "Failed send filed"),
                Err(e) => warn!(key = %key, error = %e, "Could not file failed send"),
            }
            let _ = followups.send(Followup::Filed { key, id });
        });
    }

    fn schedule_followup(&self, delay: Duration, followup: Followup) {
        let followups = self.followups_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = followups.send(followup);
        });
    }

    fn cancel(&mut self, key: &TransactionKey) -> bool {
        let found = match self.shared.active.get_mut(key) {
            Some(mut tx) => {
                // A transaction waiting on a retry or a filing is already terminal
                if !tx.cancel() {
                    debug!(key = %key, phase = %tx.state().phase(), "Cancelling a completed attempt");
                }
                true
            }
            None => false,
        };
        if found {
            self.retire(key);
        }
        found
    }

    fn cancel_all(&mut self) {
        let keys: Vec<TransactionKey> = self.shared.active.iter().map(|entry| entry.key().clone()).collect();
        if !keys.is_empty() {
            info!(count = keys.len(), "Cancelling in-flight transactions");
        }
        for key in keys {
            self.cancel(&key);
        }
    }

    fn retire(&mut self, key: &TransactionKey) {
        let Some((key, tx)) = self.shared.active.remove(key) else {
            return;
        };
        let state = tx.state();
        debug!(key = %key, phase = %state.phase(), retries = tx.retry_count(), "Transaction retired");

        self.shared.finished.insert(key.clone(), state.clone());
        self.evict_finished();
        self.shared.emit(ServiceEvent::Finished { key, state });

        if self.shared.active.is_empty() {
            self.shared.emit(ServiceEvent::Idle);
            if self.shared.ctx.config.stop_when_idle && !self.stop {
                info!("No transactions in flight, stopping dispatcher");
                self.shared.running.store(false, Ordering::SeqCst);
                self.stop = true;
            }
        }
    }

    fn evict_finished(&self) {
        while self.shared.finished.len() > FINISHED_CAPACITY {
            let oldest = self
                .shared
                .finished
                .iter()
                .min_by_key(|entry| entry.value().last_updated())
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.shared.finished.remove(&key);
                }
                None => break,
            }
        }
    }
}
