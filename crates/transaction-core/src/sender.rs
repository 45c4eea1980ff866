//! Outbound glue: queue a drafted message and hand it to the dispatcher

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::mailbox::{Mailbox, MessageRef};
use crate::pdu::{MessageClass, Priority};
use crate::service::TransactionService;
use crate::store::MessageUpdate;
use crate::transaction::TransactionRequest;

/// Queues DRAFT messages for sending
#[derive(Debug, Clone)]
pub struct MessageSender {
    service: TransactionService,
}

impl MessageSender {
    pub fn new(service: TransactionService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &TransactionService {
        &self.service
    }

    /// Stamp the draft's send headers, move it DRAFT → OUTBOX and submit a
    /// send transaction. Returns the OUTBOX location.
    ///
    /// A stopped service is refused before the draft is touched. If the submit
    /// still fails after the move, the message is filed into FAILED for a
    /// manual re-send.
    pub async fn send_message(&self, location: &MessageRef, token: u64) -> ServiceResult<MessageRef> {
        if !self.service.is_running() {
            return Err(ServiceError::Stopped);
        }
        let ctx = self.service.context();

        let headers = MessageUpdate::new()
            .with_date(Utc::now())
            .with_expiry(ctx.config.default_expiry_secs)
            .with_priority(Priority::Normal)
            .with_reports(false, false)
            .with_message_class(MessageClass::Personal);
        ctx.store.update(location, &headers).await?;
        debug!(location = %location, "Draft headers stamped");

        let outbox = ctx.store.move_to(location, Mailbox::Outbox).await?;
        if let Err(e) = self.service.submit(TransactionRequest::send(outbox.clone(), token)) {
            warn!(outbox = %outbox, error = %e, "Send not queued, filing message as failed");
            if let Err(move_err) = ctx.store.move_to(&outbox, Mailbox::Failed).await {
                warn!(outbox = %outbox, error = %move_err, "Could not file unsent message");
            }
            return Err(e);
        }

        info!(location = %location, outbox = %outbox, token, "Message queued for sending");
        Ok(outbox)
    }
}
