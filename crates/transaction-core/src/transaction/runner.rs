//! Worker task that drives one transaction attempt to a terminal phase.
//!
//! The runner is the only writer of the attempt's state. Whatever happens inside
//! the protocol logic (an error, a panic, a shutdown while waiting for a worker
//! slot) the state ends terminal and, when a completion channel is attached, a
//! [`TransactionCompletion`] is sent.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use rmms_infra_common::LogContext;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn, Instrument, Level};
use uuid::Uuid;

use super::{
    SharedTransactionState, TransactionCompletion, TransactionContext, TransactionKey, TransactionLogic,
};
use crate::error::TransactionError;

pub(crate) struct Worker {
    pub key: TransactionKey,
    pub id: Uuid,
    pub attempt: u32,
    pub logic: TransactionLogic,
    pub state: SharedTransactionState,
    pub ctx: TransactionContext,
    pub permits: Option<Arc<Semaphore>>,
    pub completions: Option<mpsc::UnboundedSender<TransactionCompletion>>,
}

impl Worker {
    pub(crate) async fn run(self) {
        let span = LogContext::with_operation("transaction", self.key.kind.as_str())
            .with_field("location", &self.key.location)
            .with_field("attempt", self.attempt)
            .span(Level::INFO);

        self.drive().instrument(span).await
    }

    async fn drive(self) {
        // Held until the attempt is terminal
        let _permit = match self.permits.clone() {
            Some(permits) => match permits.acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.state.fail("transaction service is shutting down");
                    self.report(false);
                    return;
                }
            },
            None => None,
        };

        if !self.state.begin_processing() {
            debug!(phase = %self.state.phase(), "Attempt no longer runnable, skipping");
            self.report(false);
            return;
        }
        debug!("Transaction processing");

        let retryable = match AssertUnwindSafe(self.logic.run(&self.ctx)).catch_unwind().await {
            Ok(Ok(outcome)) => {
                if let Some(note) = &outcome.note {
                    info!(result = %outcome.location, note = %note, "Transaction succeeded with note");
                } else {
                    info!(result = %outcome.location, "Transaction succeeded");
                }
                self.state.succeed(outcome.location, outcome.note);
                false
            }
            Ok(Err(e)) => {
                error!(error = %e, category = e.category(), "Transaction failed");
                self.state.fail(e.to_string());
                e.is_retryable()
            }
            Err(panic) => {
                let e = TransactionError::Worker(panic_message(panic.as_ref()));
                error!(error = %e, "Transaction worker panicked");
                self.state.fail(e.to_string());
                true
            }
        };

        if !self.state.is_completed() {
            warn!("Attempt left non-terminal, forcing failure");
            self.state.fail("transaction ended without a result");
        }

        self.report(retryable);
    }

    fn report(&self, retryable: bool) {
        let Some(completions) = &self.completions else {
            return;
        };
        let completion = TransactionCompletion {
            key: self.key.clone(),
            id: self.id,
            phase: self.state.phase(),
            retryable,
        };
        if completions.send(completion).is_err() {
            debug!("Dispatcher gone, completion dropped");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
