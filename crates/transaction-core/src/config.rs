//! Configuration for the transaction engine
//!
//! All retry bounds, delays and budgets the engine uses live here so that
//! embedders and tests can tighten or relax them. Every struct deserializes with
//! `#[serde(default)]`, so a partial JSON document only overrides what it names.
//!
//! ```rust
//! use rmms_transaction_core::TransactionConfig;
//! use std::time::Duration;
//!
//! let config = TransactionConfig::from_json_str(r#"{ "max_retries": 2, "file_failed_sends": false }"#).unwrap();
//! assert_eq!(config.max_retries, 2);
//! assert_eq!(config.http_attempts, 3);
//! assert_eq!(config.retry_delay(2), Duration::from_millis(2000));
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Upper bound accepted for either retry layer
pub const MAX_RETRY_LIMIT: u32 = 10;

/// Retry, timeout and concurrency settings for transactions and the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Whole-transaction retries the dispatcher may schedule
    pub max_retries: u32,

    /// POST attempts a send transaction makes before giving up
    pub http_attempts: u32,

    /// Linear step between POST attempts (attempt × step)
    pub http_retry_step_ms: u64,

    /// Base of the dispatcher's exponential backoff
    pub retry_base_delay_ms: u64,

    /// Wall-clock budget of one send attempt
    pub send_timeout_ms: u64,

    /// Relative expiry stamped onto outgoing requests
    pub default_expiry_secs: u64,

    /// Transactions allowed to run at once
    pub max_concurrent_transactions: usize,

    /// File sends that end in failure into the FAILED mailbox
    pub file_failed_sends: bool,

    /// Stop the dispatcher loop once no transaction is in flight
    pub stop_when_idle: bool,

    /// Capacity of the service event channel
    pub event_capacity: usize,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            http_attempts: 3,
            http_retry_step_ms: 2_000,
            retry_base_delay_ms: 1_000,
            send_timeout_ms: 300_000,
            default_expiry_secs: 7 * 24 * 60 * 60,
            max_concurrent_transactions: 8,
            file_failed_sends: true,
            stop_when_idle: false,
            event_capacity: 128,
        }
    }
}

impl TransactionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) JSON document and validate it
    pub fn from_json_str(json: &str) -> ServiceResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ServiceError::configuration(format!("invalid transaction config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_http_attempts(mut self, attempts: u32) -> Self {
        self.http_attempts = attempts;
        self
    }

    /// Durations are kept in whole milliseconds
    pub fn with_http_retry_step(mut self, step: Duration) -> Self {
        self.http_retry_step_ms = millis(step);
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay_ms = millis(delay);
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout_ms = millis(timeout);
        self
    }

    pub fn with_max_concurrent_transactions(mut self, max: usize) -> Self {
        self.max_concurrent_transactions = max;
        self
    }

    pub fn with_file_failed_sends(mut self, enabled: bool) -> Self {
        self.file_failed_sends = enabled;
        self
    }

    pub fn with_stop_when_idle(mut self, enabled: bool) -> Self {
        self.stop_when_idle = enabled;
        self
    }

    /// Reject settings that would stall the engine or allow retry storms
    pub fn validate(&self) -> ServiceResult<()> {
        if self.http_attempts == 0 {
            return Err(ServiceError::configuration("http_attempts must be at least 1"));
        }
        if self.http_attempts > MAX_RETRY_LIMIT {
            return Err(ServiceError::configuration(format!(
                "http_attempts must not exceed {}",
                MAX_RETRY_LIMIT
            )));
        }
        if self.max_retries > MAX_RETRY_LIMIT {
            return Err(ServiceError::configuration(format!(
                "max_retries must not exceed {}",
                MAX_RETRY_LIMIT
            )));
        }
        if self.max_concurrent_transactions == 0 {
            return Err(ServiceError::configuration(
                "max_concurrent_transactions must be at least 1",
            ));
        }
        if self.event_capacity == 0 {
            return Err(ServiceError::configuration("event_capacity must be at least 1"));
        }
        if self.send_timeout_ms == 0 {
            return Err(ServiceError::configuration("send_timeout_ms must be at least 1"));
        }
        Ok(())
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Pause after failed POST attempt `attempt` (1-based): linear in the attempt number
    pub fn http_retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.http_retry_step_ms.saturating_mul(u64::from(attempt)))
    }

    /// Dispatcher backoff before retry number `retry_count` (1-based): `base × 2^(n-1)`
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1).min(31);
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(1u64 << exponent))
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Settings for the reqwest-based MMSC transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpTransportConfig {
    pub post_timeout_secs: u64,
    pub get_timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
    /// Proxy URL (`http://host:port`) the MMSC must be reached through
    pub proxy: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            post_timeout_secs: 60,
            get_timeout_secs: 30,
            user_agent: format!("rmms/{}", env!("CARGO_PKG_VERSION")),
            accept_language: "en-US".to_string(),
            proxy: None,
        }
    }
}

impl HttpTransportConfig {
    pub fn with_proxy(mut self, host: &str, port: u16) -> Self {
        self.proxy = Some(format!("http://{}:{}", host, port));
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn post_timeout(&self) -> Duration {
        Duration::from_secs(self.post_timeout_secs)
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_secs(self.get_timeout_secs)
    }
}

/// Capabilities reported by the strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub group_mms: bool,
    pub delivery_reports: bool,
    pub read_reports: bool,
    pub rich_content: bool,
    pub large_messages: bool,
    pub special_permissions: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            group_mms: true,
            delivery_reports: true,
            read_reports: true,
            rich_content: true,
            large_messages: true,
            special_permissions: false,
        }
    }
}

/// Settings for the sending-strategy selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Ceiling on a single strategy's send call
    pub operation_timeout_ms: u64,
    pub features: FeatureFlags,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: 90_000,
            features: FeatureFlags::default(),
        }
    }
}

impl SelectorConfig {
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_ms = millis(timeout);
        self
    }

    pub fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults() {
        let config = TransactionConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.http_attempts, 3);
        assert_eq!(config.default_expiry_secs, 604_800);
        assert_eq!(config.send_timeout(), Duration::from_secs(300));
        assert_ok!(config.validate());
    }

    #[test]
    fn test_http_delay_is_linear() {
        let config = TransactionConfig::default();
        assert_eq!(config.http_retry_delay(1), Duration::from_millis(2_000));
        assert_eq!(config.http_retry_delay(2), Duration::from_millis(4_000));
    }

    #[test]
    fn test_dispatcher_delay_is_exponential() {
        let config = TransactionConfig::default();
        assert_eq!(config.retry_delay(1), Duration::from_secs(1));
        assert_eq!(config.retry_delay(2), Duration::from_secs(2));
        assert_eq!(config.retry_delay(3), Duration::from_secs(4));
    }

    #[test]
    fn test_validate_rejects_storms() {
        assert_err!(TransactionConfig::default().with_http_attempts(0).validate());
        assert_err!(TransactionConfig::default().with_max_retries(11).validate());
        assert_err!(TransactionConfig::default()
            .with_max_concurrent_transactions(0)
            .validate());
        assert_ok!(TransactionConfig::default().with_max_retries(0).validate());
    }

    #[test]
    fn test_sub_second_durations_are_kept() {
        let config = TransactionConfig::default()
            .with_send_timeout(Duration::from_millis(500))
            .with_http_retry_step(Duration::from_millis(250))
            .with_retry_base_delay(Duration::from_millis(100));
        assert_ok!(config.validate());
        assert_eq!(config.send_timeout(), Duration::from_millis(500));
        assert_eq!(config.http_retry_delay(2), Duration::from_millis(500));
        assert_eq!(config.retry_delay(3), Duration::from_millis(400));

        let selector = SelectorConfig::default().with_operation_timeout(Duration::from_millis(1_500));
        assert_eq!(selector.operation_timeout(), Duration::from_millis(1_500));

        assert_err!(TransactionConfig::default()
            .with_send_timeout(Duration::from_micros(900))
            .validate());
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(matches!(
            TransactionConfig::from_json_str(r#"{ "http_attempts": 0 }"#),
            Err(ServiceError::Configuration(_))
        ));
        assert_err!(TransactionConfig::from_json_str("not json"));
    }

    #[test]
    fn test_selector_and_transport_defaults() {
        let selector = SelectorConfig::default();
        assert_eq!(selector.operation_timeout(), Duration::from_secs(90));
        assert!(selector.features.group_mms);
        assert!(!selector.features.special_permissions);

        let http = HttpTransportConfig::default().with_proxy("10.0.0.1", 8080);
        assert_eq!(http.proxy.as_deref(), Some("http://10.0.0.1:8080"));
        assert_eq!(http.post_timeout(), Duration::from_secs(60));
        assert_eq!(http.get_timeout(), Duration::from_secs(30));
    }
}
