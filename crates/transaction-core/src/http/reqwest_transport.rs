use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::{RequestBuilder, StatusCode};
use tracing::{debug, warn};

use super::{HttpTransport, TransportError, TransportResult};
use crate::carrier::CarrierConfig;
use crate::config::HttpTransportConfig;
use crate::pdu::headers::MMS_CONTENT_TYPE;

/// [`HttpTransport`] backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: HttpTransportConfig,
}

impl ReqwestTransport {
    pub fn new(config: HttpTransportConfig) -> TransportResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::http(proxy.as_str())
                .map_err(|e| TransportError::Client(format!("proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Build a transport that goes through the carrier's MMS proxy, if it has one
    pub fn for_carrier(config: HttpTransportConfig, carrier: &dyn CarrierConfig) -> TransportResult<Self> {
        let config = match carrier.mms_proxy() {
            Some((host, port)) => config.with_proxy(&host, port),
            None => config,
        };
        Self::new(config)
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    fn with_common_headers(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(ACCEPT, MMS_CONTENT_TYPE)
            .header(USER_AGENT, self.config.user_agent.as_str())
            .header(ACCEPT_LANGUAGE, self.config.accept_language.as_str())
    }

    async fn execute(&self, method: &'static str, url: &str, request: RequestBuilder) -> TransportResult<Option<Bytes>> {
        let response = request.send().await.map_err(|e| {
            warn!(method, url, error = %e, "MMSC request failed");
            TransportError::Request(e.to_string())
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(method, url, status = %status, "MMSC answered with a non-OK status");
            return Ok(None);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        debug!(method, url, bytes = body.len(), "MMSC response received");
        Ok(Some(body))
    }
}

fn check_url(url: &str) -> TransportResult<()> {
    if url.trim().is_empty() {
        return Err(TransportError::InvalidUrl("empty URL".to_string()));
    }
    reqwest::Url::parse(url)
        .map(|_| ())
        .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", url, e)))
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(
        &self,
        url: &str,
        body: Bytes,
        content_type: &str,
        token: u64,
    ) -> TransportResult<Option<Bytes>> {
        check_url(url)?;
        debug!(url, token, bytes = body.len(), "POST to MMSC");

        let request = self
            .client
            .post(url)
            .timeout(self.config.post_timeout())
            .header(CONTENT_TYPE, content_type)
            .body(body);
        self.execute("POST", url, self.with_common_headers(request)).await
    }

    async fn get(&self, url: &str) -> TransportResult<Option<Bytes>> {
        check_url(url)?;
        debug!(url, "GET from MMSC");

        let request = self.client.get(url).timeout(self.config.get_timeout());
        self.execute("GET", url, self.with_common_headers(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn test_url_validation() {
        assert!(matches!(check_url(""), Err(TransportError::InvalidUrl(_))));
        assert!(matches!(check_url("not a url"), Err(TransportError::InvalidUrl(_))));
        assert_ok!(check_url("http://mmsc.example.com/mms"));
    }
}
