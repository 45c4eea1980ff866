//! # Sending strategies
//!
//! A platform may offer several ways to get an MMS out: a native send API, an
//! older store-and-broadcast flow, or this crate's own transaction engine.
//! [`SendingStrategySelector`] holds them in a fixed priority order and tries
//! each available one until a send succeeds.
//!
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use rmms_transaction_core::strategy::{SendingStrategy, SendingStrategySelector};
//! use rmms_transaction_core::{MessageRef, SelectorConfig};
//!
//! struct Offline;
//!
//! #[async_trait]
//! impl SendingStrategy for Offline {
//!     fn name(&self) -> &'static str { "offline" }
//!     fn is_available(&self) -> bool { false }
//!     async fn send(&self, _: &MessageRef, _: &str, _: Option<&str>) -> bool { false }
//! }
//!
//! let selector = SendingStrategySelector::new(SelectorConfig::default())
//!     .with_strategy(Arc::new(Offline));
//! assert_eq!(selector.capabilities().strategy, None);
//! ```

mod direct;
mod engine;
mod legacy;

pub use direct::{DirectApiStrategy, PlatformMmsApi};
pub use engine::TransactionEngineStrategy;
pub use legacy::{LegacyBroadcastStrategy, LegacySendRequest};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SelectorConfig;
use crate::mailbox::MessageRef;

/// One way of sending a stored message
#[async_trait]
pub trait SendingStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap availability check; unavailable strategies are skipped
    fn is_available(&self) -> bool;

    /// Send the message at `location` to `address`; `true` on success
    async fn send(&self, location: &MessageRef, address: &str, subject: Option<&str>) -> bool;
}

/// Diagnostic summary of what the selector can do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityInfo {
    /// First available strategy, the one a send will try first
    pub strategy: Option<String>,
    pub available_strategies: Vec<String>,
    pub group_mms: bool,
    pub delivery_reports: bool,
    pub read_reports: bool,
    pub rich_content: bool,
    pub large_messages: bool,
    pub special_permissions: bool,
    pub operation_timeout: Duration,
}

/// Ordered fallback over [`SendingStrategy`] implementations
pub struct SendingStrategySelector {
    strategies: Vec<Arc<dyn SendingStrategy>>,
    config: SelectorConfig,
}

impl SendingStrategySelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self {
            strategies: Vec::new(),
            config,
        }
    }

    /// Append a strategy; earlier strategies take priority
    pub fn with_strategy(mut self, strategy: Arc<dyn SendingStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Try each available strategy in order.
    ///
    /// A strategy that fails, or exceeds the operation timeout, hands over to the
    /// next one. Returns `false` only after every strategy was skipped or failed.
    pub async fn send(&self, location: &MessageRef, address: &str, subject: Option<&str>) -> bool {
        let timeout = self.config.operation_timeout();

        for strategy in &self.strategies {
            let name = strategy.name();
            if !strategy.is_available() {
                debug!(strategy = name, "Strategy unavailable, skipping");
                continue;
            }

            debug!(strategy = name, location = %location, "Trying sending strategy");
            match tokio::time::timeout(timeout, strategy.send(location, address, subject)).await {
                Ok(true) => {
                    info!(strategy = name, location = %location, "Message sent");
                    return true;
                }
                Ok(false) => warn!(strategy = name, location = %location, "Strategy failed, falling back"),
                Err(_) => warn!(
                    strategy = name,
                    location = %location,
                    timeout_ms = timeout.as_millis() as u64,
                    "Strategy timed out, falling back"
                ),
            }
        }

        warn!(location = %location, "All sending strategies exhausted");
        false
    }

    pub fn capabilities(&self) -> CapabilityInfo {
        let available: Vec<String> = self
            .strategies
            .iter()
            .filter(|s| s.is_available())
            .map(|s| s.name().to_string())
            .collect();
        let features = self.config.features;

        CapabilityInfo {
            strategy: available.first().cloned(),
            available_strategies: available,
            group_mms: features.group_mms,
            delivery_reports: features.delivery_reports,
            read_reports: features.read_reports,
            rich_content: features.rich_content,
            large_messages: features.large_messages,
            special_permissions: features.special_permissions,
            operation_timeout: self.config.operation_timeout(),
        }
    }
}

impl std::fmt::Debug for SendingStrategySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendingStrategySelector")
            .field("strategies", &self.strategy_names())
            .field("config", &self.config)
            .finish()
    }
}
