//! Inbound retrieval protocol
//!
//! Turns a NOTIFICATION_PLACEHOLDER row (an M-Notification.ind that arrived by
//! WAP push) into an INBOX message: one GET of the content location, parse as
//! M-Retrieve.conf, persist into INBOX, then delete the placeholder. There is no
//! GET retry loop here; re-queueing is left to the dispatcher.

use tracing::{debug, info, warn};

use super::{Outcome, TransactionContext};
use crate::error::{TransactionError, TransactionResult};
use crate::mailbox::{Mailbox, MessageRef};
use crate::pdu::{NotificationIndication, Pdu, RetrieveConfirmation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTransaction {
    location: MessageRef,
}

impl NotificationTransaction {
    pub fn new(location: MessageRef) -> Self {
        Self { location }
    }

    pub fn location(&self) -> &MessageRef {
        &self.location
    }

    pub async fn run(&self, ctx: &TransactionContext) -> TransactionResult<Outcome> {
        if !ctx.policy.allow_auto_download() {
            info!(location = %self.location, "Auto-download disabled, leaving placeholder for manual retrieval");
            return Ok(Outcome {
                location: self.location.clone(),
                note: Some("auto-download disabled".to_string()),
            });
        }

        let indication = self.load_indication(ctx).await?;
        let content_location = indication
            .content_location
            .filter(|url| !url.trim().is_empty())
            .ok_or(TransactionError::MissingContentLocation)?;

        debug!(location = %self.location, url = %content_location, "Downloading MMS content");
        let content = match ctx.http.get(&content_location).await {
            Ok(Some(bytes)) if !bytes.is_empty() => bytes,
            Ok(_) => return Err(TransactionError::Download("empty response".to_string())),
            Err(e) => return Err(TransactionError::Download(e.to_string())),
        };

        let retrieved = parse_retrieve(ctx, &content)?;
        let as_text = retrieved.is_text_only();

        let inbox = ctx
            .store
            .persist(&Pdu::RetrieveConfirmation(retrieved), Mailbox::Inbox, as_text)
            .await
            .map_err(|e| TransactionError::Persist {
                what: "retrieved message",
                reason: e.to_string(),
            })?;

        let note = match ctx.store.delete(&self.location).await {
            Ok(()) => None,
            Err(e) => {
                warn!(location = %self.location, error = %e, "Failed to delete notification placeholder");
                Some(format!("failed to delete notification placeholder: {}", e))
            }
        };

        info!(location = %self.location, inbox = %inbox, as_text, "MMS downloaded");
        Ok(Outcome { location: inbox, note })
    }

    async fn load_indication(&self, ctx: &TransactionContext) -> TransactionResult<NotificationIndication> {
        match ctx.store.load(&self.location).await {
            Ok(Some(Pdu::NotificationIndication(indication))) => Ok(indication),
            Ok(Some(other)) => Err(TransactionError::Load {
                what: "notification",
                reason: format!("stored PDU is {}", other.kind_name()),
            }),
            Ok(None) => Err(TransactionError::Load {
                what: "notification",
                reason: "no PDU stored".to_string(),
            }),
            Err(e) => Err(TransactionError::Load {
                what: "notification",
                reason: e.to_string(),
            }),
        }
    }
}

fn parse_retrieve(ctx: &TransactionContext, content: &[u8]) -> TransactionResult<RetrieveConfirmation> {
    match ctx.codec.parse(content) {
        Ok(Pdu::RetrieveConfirmation(retrieved)) => Ok(retrieved),
        Ok(other) => Err(TransactionError::Parse {
            what: "retrieve confirmation",
            reason: format!("got {}", other.kind_name()),
        }),
        Err(e) => Err(TransactionError::Parse {
            what: "retrieve confirmation",
            reason: e.to_string(),
        }),
    }
}
