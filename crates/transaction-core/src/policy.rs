//! Auto-download policy collaborator

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Decides whether incoming MMS content is fetched without user action
pub trait AutoDownloadPolicy: Send + Sync {
    fn allow_auto_download(&self) -> bool;
}

/// Runtime-togglable policy; clones share the flag
#[derive(Debug, Clone)]
pub struct AutoDownloadSettings {
    enabled: Arc<AtomicBool>,
}

impl AutoDownloadSettings {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl Default for AutoDownloadSettings {
    fn default() -> Self {
        Self::new(true)
    }
}

impl AutoDownloadPolicy for AutoDownloadSettings {
    fn allow_auto_download(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}
