//! Inbound glue: WAP push notifications become placeholders and, when the
//! auto-download policy allows, notification transactions.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::mailbox::{Mailbox, MessageRef};
use crate::pdu::Pdu;
use crate::service::TransactionService;
use crate::transaction::TransactionRequest;

/// Transaction ids remembered for duplicate detection
const RECENT_PUSHES: usize = 32;

/// Handles M-Notification.ind pushes
#[derive(Debug, Clone)]
pub struct PushReceiver {
    service: TransactionService,
    recent: Arc<Mutex<VecDeque<String>>>,
}

impl PushReceiver {
    pub fn new(service: TransactionService) -> Self {
        Self {
            service,
            recent: Arc::new(Mutex::new(VecDeque::with_capacity(RECENT_PUSHES))),
        }
    }

    /// Parse a push, store it as a NOTIFICATION_PLACEHOLDER and queue the download.
    ///
    /// Returns the placeholder location, or `None` when the push repeats a
    /// transaction id seen recently (carriers re-send pushes).
    pub async fn handle_push(&self, data: &[u8]) -> ServiceResult<Option<MessageRef>> {
        let ctx = self.service.context();

        let indication = match ctx.codec.parse(data)? {
            Pdu::NotificationIndication(indication) => indication,
            other => {
                warn!(kind = other.kind_name(), "Push carried an unexpected PDU");
                return Err(ServiceError::invalid_request(format!(
                    "expected m-notification-ind, got {}",
                    other.kind_name()
                )));
            }
        };

        if !self.remember(&indication.transaction_id) {
            debug!(transaction_id = %indication.transaction_id, "Duplicate push dropped");
            return Ok(None);
        }

        let transaction_id = indication.transaction_id.clone();
        let placeholder = match ctx
            .store
            .persist(&Pdu::NotificationIndication(indication), Mailbox::NotificationPlaceholder, false)
            .await
        {
            Ok(placeholder) => placeholder,
            Err(e) => {
                // Nothing was stored, so a re-push must get through
                self.forget(&transaction_id);
                warn!(transaction_id = %transaction_id, error = %e, "Could not store push placeholder");
                return Err(e.into());
            }
        };

        if ctx.policy.allow_auto_download() {
            self.service.submit(TransactionRequest::notification(placeholder.clone()))?;
            info!(transaction_id = %transaction_id, placeholder = %placeholder, "Push received, download queued");
        } else {
            info!(transaction_id = %transaction_id, placeholder = %placeholder, "Push received, waiting for manual download");
        }

        Ok(Some(placeholder))
    }

    /// Record a transaction id; `false` if it was already known
    fn remember(&self, transaction_id: &str) -> bool {
        let mut recent = self.recent.lock();
        if recent.iter().any(|id| id == transaction_id) {
            return false;
        }
        if recent.len() == RECENT_PUSHES {
            recent.pop_front();
        }
        recent.push_back(transaction_id.to_string());
        true
    }

    fn forget(&self, transaction_id: &str) {
        self.recent.lock().retain(|id| id != transaction_id);
    }
}
