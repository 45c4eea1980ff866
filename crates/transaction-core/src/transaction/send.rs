//! Outbound send protocol
//!
//! A send attempt walks a queued OUTBOX message through these steps, each with
//! its own failure cause:
//!
//! 1. load the stored M-Send.req (a missing PDU is replaced by a minimal one)
//! 2. stamp date, sender, expiry and priority
//! 3. compose the wire bytes
//! 4. resolve the MMSC endpoint
//! 5. POST, retrying no-response outcomes with a linear delay
//! 6. parse the M-Send.conf (a malformed answer still counts as acceptance)
//! 7. record the response status
//! 8. move the message to SENT
//!
//! Steps 1 to 6 share one wall-clock budget, checked between steps. Earlier steps
//! are never rolled back; an attempt that fails leaves the message in OUTBOX.

use bytes::Bytes;
use chrono::Utc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::{Outcome, TransactionContext};
use crate::error::{TransactionError, TransactionResult};
use crate::mailbox::{Mailbox, MessageRef};
use crate::pdu::headers::MMS_CONTENT_TYPE;
use crate::pdu::{Pdu, Priority, SendConfirmation, SendRequest};
use crate::store::MessageUpdate;

/// Send protocol for one OUTBOX message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTransaction {
    location: MessageRef,
    token: u64,
}

impl SendTransaction {
    pub fn new(location: MessageRef, token: u64) -> Self {
        Self { location, token }
    }

    pub fn location(&self) -> &MessageRef {
        &self.location
    }

    pub async fn run(&self, ctx: &TransactionContext) -> TransactionResult<Outcome> {
        let deadline = Instant::now() + ctx.config.send_timeout();

        let mut request = self.load_request(ctx).await?;
        check_deadline(deadline)?;

        self.stamp(&mut request, ctx);

        let body = ctx
            .codec
            .compose(&Pdu::SendRequest(request))
            .map_err(|e| TransactionError::Compose(e.to_string()))?;
        check_deadline(deadline)?;

        let url = ctx.carrier.mmsc_url().ok_or(TransactionError::NoEndpoint)?;

        let response = self.post_with_retries(ctx, &url, body, deadline).await?;
        check_deadline(deadline)?;

        let note = match self.parse_confirmation(ctx, &response) {
            Some(confirmation) => self.record_status(ctx, &confirmation).await,
            None => None,
        };

        self.file_as_sent(ctx, note).await
    }

    async fn load_request(&self, ctx: &TransactionContext) -> TransactionResult<SendRequest> {
        match ctx.store.load(&self.location).await {
            Ok(Some(Pdu::SendRequest(request))) => Ok(request),
            Ok(Some(other)) => Err(TransactionError::Load {
                what: "send request",
                reason: format!("stored PDU is {}", other.kind_name()),
            }),
            Ok(None) => {
                warn!(location = %self.location, "No stored send request, using a minimal default");
                Ok(SendRequest::synthesized())
            }
            Err(e) => Err(TransactionError::Load {
                what: "send request",
                reason: e.to_string(),
            }),
        }
    }

    fn stamp(&self, request: &mut SendRequest, ctx: &TransactionContext) {
        request.date = Some(Utc::now());
        if let Some(line_number) = ctx.carrier.line_number() {
            request.from = Some(line_number);
        }
        request.expiry = Some(ctx.config.default_expiry_secs);
        request.priority = Priority::Normal;
    }

    async fn post_with_retries(
        &self,
        ctx: &TransactionContext,
        url: &str,
        body: Bytes,
        deadline: Instant,
    ) -> TransactionResult<Bytes> {
        let attempts = ctx.config.http_attempts;

        for attempt in 1..=attempts {
            check_deadline(deadline)?;

            match ctx.http.post(url, body.clone(), MMS_CONTENT_TYPE, self.token).await {
                Ok(Some(response)) => {
                    debug!(attempt, bytes = response.len(), "MMSC answered");
                    return Ok(response);
                }
                Ok(None) => warn!(attempt, attempts, "No response from MMSC"),
                Err(e) => warn!(attempt, attempts, error = %e, "POST to MMSC failed"),
            }

            if attempt < attempts {
                let delay = ctx.config.http_retry_delay(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Waiting before next POST");
                sleep(delay).await;
            }
        }

        Err(TransactionError::TransportExhausted { attempts })
    }

    fn parse_confirmation(&self, ctx: &TransactionContext, response: &[u8]) -> Option<SendConfirmation> {
        // Any HTTP answer means the MMSC took the PDU, so a bad payload is only logged
        match ctx.codec.parse(response) {
            Ok(Pdu::SendConfirmation(confirmation)) => Some(confirmation),
            Ok(other) => {
                warn!(location = %self.location, kind = other.kind_name(), "MMSC answered with an unexpected PDU");
                None
            }
            Err(e) => {
                warn!(location = %self.location, error = %e, "Could not parse MMSC answer, treating as accepted");
                None
            }
        }
    }

    async fn record_status(&self, ctx: &TransactionContext, confirmation: &SendConfirmation) -> Option<String> {
        let status = confirmation.response_status;
        let update = MessageUpdate::new().with_response_status(status);
        if let Err(e) = ctx.store.update(&self.location, &update).await {
            warn!(location = %self.location, error = %e, "Failed to record response status");
        }

        if status.is_ok() {
            None
        } else {
            warn!(location = %self.location, status = %status, "MMSC reported a non-OK status");
            Some(format!("MMSC response status {}", status))
        }
    }

    async fn file_as_sent(&self, ctx: &TransactionContext, note: Option<String>) -> TransactionResult<Outcome> {
        match ctx.store.move_to(&self.location, Mailbox::Sent).await {
            Ok(sent) => {
                info!(location = %self.location, sent = %sent, "Message sent");
                Ok(Outcome { location: sent, note })
            }
            Err(e) => {
                // The MMSC already accepted the PDU; only local filing failed
                warn!(location = %self.location, error = %e, "Sent, but could not move message to SENT");
                let filing = format!("sent, but failed to move message to sent folder: {}", e);
                let note = match note {
                    Some(note) => format!("{}; {}", note, filing),
                    None => filing,
                };
                Ok(Outcome {
                    location: self.location.clone(),
                    note: Some(note),
                })
            }
        }
    }
}

fn check_deadline(deadline: Instant) -> TransactionResult<()> {
    if Instant::now() >= deadline {
        return Err(TransactionError::Timeout);
    }
    Ok(())
}
