use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::SendingStrategy;
use crate::mailbox::{Mailbox, MessageRef};
use crate::store::MessageStore;

/// Announcement picked up by a legacy platform sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacySendRequest {
    pub location: MessageRef,
    pub address: String,
    pub subject: Option<String>,
}

/// Queues the message in OUTBOX and broadcasts a [`LegacySendRequest`].
///
/// Only available while something listens on the broadcast channel.
pub struct LegacyBroadcastStrategy {
    store: Arc<dyn MessageStore>,
    requests: broadcast::Sender<LegacySendRequest>,
}

impl LegacyBroadcastStrategy {
    pub fn new(store: Arc<dyn MessageStore>, requests: broadcast::Sender<LegacySendRequest>) -> Self {
        Self { store, requests }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LegacySendRequest> {
        self.requests.subscribe()
    }
}

#[async_trait]
impl SendingStrategy for LegacyBroadcastStrategy {
    fn name(&self) -> &'static str {
        "legacy_broadcast"
    }

    fn is_available(&self) -> bool {
        self.requests.receiver_count() > 0
    }

    async fn send(&self, location: &MessageRef, address: &str, subject: Option<&str>) -> bool {
        let outbox = match self.store.move_to(location, Mailbox::Outbox).await {
            Ok(outbox) => outbox,
            Err(e) => {
                warn!(location = %location, error = %e, "Could not queue message for legacy send");
                return false;
            }
        };

        let request = LegacySendRequest {
            location: outbox,
            address: address.to_string(),
            subject: subject.map(str::to_string),
        };
        match self.requests.send(request) {
            Ok(listeners) => {
                debug!(location = %location, listeners, "Legacy send broadcast");
                true
            }
            Err(_) => {
                warn!(location = %location, "No legacy sender listening");
                false
            }
        }
    }
}
