//! Carrier configuration collaborator

use serde::{Deserialize, Serialize};

/// Carrier settings a send transaction needs
///
/// Endpoint discovery (APN databases and the like) lives outside the engine;
/// implementations only report what is already known.
pub trait CarrierConfig: Send + Sync {
    /// MMSC endpoint; `None` when the carrier has not been provisioned
    fn mmsc_url(&self) -> Option<String>;

    /// MMS proxy host and port
    fn mms_proxy(&self) -> Option<(String, u16)>;

    /// Phone number of this line, stamped as the sender
    fn line_number(&self) -> Option<String>;
}

/// Fixed carrier settings, typically loaded from a config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticCarrierConfig {
    pub mmsc_url: Option<String>,
    pub proxy_host: Option<String>,
    pub proxy_port: Option<u16>,
    pub line_number: Option<String>,
}

impl StaticCarrierConfig {
    pub fn new(mmsc_url: impl Into<String>) -> Self {
        Self {
            mmsc_url: Some(mmsc_url.into()),
            ..Default::default()
        }
    }

    /// A carrier with no MMSC endpoint
    pub fn unprovisioned() -> Self {
        Self::default()
    }

    pub fn with_proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy_host = Some(host.into());
        self.proxy_port = Some(port);
        self
    }

    pub fn with_line_number(mut self, number: impl Into<String>) -> Self {
        self.line_number = Some(number.into());
        self
    }
}

impl CarrierConfig for StaticCarrierConfig {
    fn mmsc_url(&self) -> Option<String> {
        self.mmsc_url.clone().filter(|url| !url.trim().is_empty())
    }

    fn mms_proxy(&self) -> Option<(String, u16)> {
        match (&self.proxy_host, self.proxy_port) {
            (Some(host), Some(port)) if !host.is_empty() => Some((host.clone(), port)),
            _ => None,
        }
    }

    fn line_number(&self) -> Option<String> {
        self.line_number.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_endpoint_is_unresolved() {
        let carrier = StaticCarrierConfig::new("   ");
        assert_eq!(carrier.mmsc_url(), None);
        assert_eq!(StaticCarrierConfig::unprovisioned().mmsc_url(), None);
    }

    #[test]
    fn test_proxy_needs_host_and_port() {
        let carrier: StaticCarrierConfig =
            serde_json::from_str(r#"{ "mmsc_url": "http://mmsc.example.com", "proxy_host": "10.0.0.1" }"#)
                .unwrap();
        assert_eq!(carrier.mms_proxy(), None);

        let carrier = carrier.with_proxy("10.0.0.1", 8080).with_line_number("+15550001111");
        assert_eq!(carrier.mms_proxy(), Some(("10.0.0.1".to_string(), 8080)));
        assert_eq!(carrier.line_number().as_deref(), Some("+15550001111"));
    }
}
