use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::SendingStrategy;
use crate::mailbox::MessageRef;

/// Native send API of the host platform
#[async_trait]
pub trait PlatformMmsApi: Send + Sync {
    /// Whether the platform exposes the API on this device
    fn is_supported(&self) -> bool;

    async fn send_multimedia_message(
        &self,
        location: &MessageRef,
        address: &str,
        subject: Option<&str>,
    ) -> anyhow::Result<()>;
}

/// Sends through [`PlatformMmsApi`]
pub struct DirectApiStrategy {
    api: Arc<dyn PlatformMmsApi>,
}

impl DirectApiStrategy {
    pub fn new(api: Arc<dyn PlatformMmsApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SendingStrategy for DirectApiStrategy {
    fn name(&self) -> &'static str {
        "direct_api"
    }

    fn is_available(&self) -> bool {
        self.api.is_supported()
    }

    async fn send(&self, location: &MessageRef, address: &str, subject: Option<&str>) -> bool {
        match self.api.send_multimedia_message(location, address, subject).await {
            Ok(()) => true,
            Err(e) => {
                warn!(location = %location, error = %e, "Platform MMS API rejected the send");
                false
            }
        }
    }
}
