use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use super::SendingStrategy;
use crate::mailbox::MessageRef;
use crate::sender::MessageSender;

/// Sends through this crate's transaction engine
pub struct TransactionEngineStrategy {
    sender: MessageSender,
}

impl TransactionEngineStrategy {
    pub fn new(sender: MessageSender) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl SendingStrategy for TransactionEngineStrategy {
    fn name(&self) -> &'static str {
        "transaction_engine"
    }

    fn is_available(&self) -> bool {
        self.sender.service().is_running()
    }

    /// Queues the draft; success means the send transaction was accepted,
    /// not that the MMSC has confirmed it.
    async fn send(&self, location: &MessageRef, _address: &str, _subject: Option<&str>) -> bool {
        // Recipients and subject already live in the stored draft
        let token = Utc::now().timestamp_millis() as u64;
        match self.sender.send_message(location, token).await {
            Ok(_) => true,
            Err(e) => {
                warn!(location = %location, error = %e, "Transaction engine could not queue message");
                false
            }
        }
    }
}
