use std::sync::Arc;

use crate::carrier::CarrierConfig;
use crate::config::TransactionConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::http::HttpTransport;
use crate::pdu::{PduCodec, WapPduCodec};
use crate::policy::{AutoDownloadPolicy, AutoDownloadSettings};
use crate::store::MessageStore;

/// Collaborators and settings every transaction runs against.
///
/// Cloning is cheap; all collaborators sit behind `Arc`.
#[derive(Clone)]
pub struct TransactionContext {
    pub store: Arc<dyn MessageStore>,
    pub codec: Arc<dyn PduCodec>,
    pub http: Arc<dyn HttpTransport>,
    pub carrier: Arc<dyn CarrierConfig>,
    pub policy: Arc<dyn AutoDownloadPolicy>,
    pub config: TransactionConfig,
}

impl TransactionContext {
    pub fn builder() -> TransactionContextBuilder {
        TransactionContextBuilder::default()
    }
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TransactionContext`]
///
/// Store, transport and carrier have no sensible defaults and must be set. The
/// codec defaults to [`WapPduCodec`], the policy to auto-download enabled and the
/// config to [`TransactionConfig::default`].
#[derive(Default)]
pub struct TransactionContextBuilder {
    store: Option<Arc<dyn MessageStore>>,
    codec: Option<Arc<dyn PduCodec>>,
    http: Option<Arc<dyn HttpTransport>>,
    carrier: Option<Arc<dyn CarrierConfig>>,
    policy: Option<Arc<dyn AutoDownloadPolicy>>,
    config: Option<TransactionConfig>,
}

impl TransactionContextBuilder {
    pub fn store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn PduCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn http(mut self, http: Arc<dyn HttpTransport>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn carrier(mut self, carrier: Arc<dyn CarrierConfig>) -> Self {
        self.carrier = Some(carrier);
        self
    }

    pub fn policy(mut self, policy: Arc<dyn AutoDownloadPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn config(mut self, config: TransactionConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> ServiceResult<TransactionContext> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(TransactionContext {
            store: self
                .store
                .ok_or_else(|| ServiceError::configuration("message store is required"))?,
            codec: self.codec.unwrap_or_else(|| Arc::new(WapPduCodec::new())),
            http: self
                .http
                .ok_or_else(|| ServiceError::configuration("HTTP transport is required"))?,
            carrier: self
                .carrier
                .ok_or_else(|| ServiceError::configuration("carrier configuration is required"))?,
            policy: self
                .policy
                .unwrap_or_else(|| Arc::new(AutoDownloadSettings::default())),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::StaticCarrierConfig;
    use crate::config::HttpTransportConfig;
    use crate::http::ReqwestTransport;
    use crate::store::MemoryMessageStore;

    #[test]
    fn test_builder_requires_collaborators() {
        let err = TransactionContext::builder().build().unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(msg) if msg.contains("message store")));
    }

    #[test]
    fn test_builder_defaults() {
        let ctx = TransactionContext::builder()
            .store(Arc::new(MemoryMessageStore::new()))
            .http(Arc::new(ReqwestTransport::new(HttpTransportConfig::default()).unwrap()))
            .carrier(Arc::new(StaticCarrierConfig::new("http://mmsc.example.com/mms")))
            .build()
            .unwrap();
        assert!(ctx.policy.allow_auto_download());
        assert_eq!(ctx.config, TransactionConfig::default());
    }

    #[test]
    fn test_builder_validates_config() {
        let result = TransactionContext::builder()
            .config(TransactionConfig::default().with_http_attempts(0))
            .build();
        assert!(matches!(result, Err(ServiceError::Configuration(_))));
    }
}
