//! Connection settings for a Consul agent

use std::path::PathBuf;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Agent address used when none is configured
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8500";

/// Scheme used when none is configured
pub const DEFAULT_SCHEME: &str = "http";

/// How to reach and authenticate against a Consul agent.
///
/// Every field is optional in a settings file; missing ones take their
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsulConfig {
    /// `host:port`, or a full URL which then overrides `scheme`
    pub address: String,
    pub scheme: String,
    /// ACL token sent as `X-Consul-Token`; empty means anonymous
    pub token: String,
    /// PEM bundle of extra trusted roots
    pub ca_file: Option<PathBuf>,
    /// PEM client certificate, used together with `key_file`
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub insecure_skip_verify: bool,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            scheme: DEFAULT_SCHEME.to_string(),
            token: String::new(),
            ca_file: None,
            cert_file: None,
            key_file: None,
            insecure_skip_verify: false,
        }
    }
}

impl ConsulConfig {
    /// Base URL of the agent's HTTP API.
    pub fn base_url(&self) -> Result<Url> {
        let address = self.address.trim();
        if address.is_empty() {
            return Err(Error::InvalidAddress {
                address: self.address.clone(),
                message: "address is empty".to_string(),
            });
        }

        let raw = if address.contains("://") {
            address.to_string()
        } else {
            format!("{}://{}", self.scheme, address)
        };

        let url = Url::parse(&raw).map_err(|e| Error::InvalidAddress {
            address: self.address.clone(),
            message: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(Error::InvalidAddress {
                address: self.address.clone(),
                message: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    /// Whether the connection uses TLS.
    pub fn is_tls(&self) -> bool {
        self.base_url()
            .map(|url| url.scheme() == "https")
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ConsulConfig::default();
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "http://127.0.0.1:8500/"
        );
        assert!(!config.is_tls());
        assert!(!config.insecure_skip_verify);
    }

    #[test]
    fn test_scheme_is_prepended() {
        let config = ConsulConfig {
            address: "consul.service:8501".to_string(),
            scheme: "https".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "https://consul.service:8501/"
        );
        assert!(config.is_tls());
    }

    #[test]
    fn test_full_url_overrides_scheme() {
        let config = ConsulConfig {
            address: "https://10.0.0.1:8501".to_string(),
            ..Default::default()
        };
        assert_eq!(config.base_url().unwrap().scheme(), "https");
    }

    #[test]
    fn test_invalid_addresses() {
        for address in ["", "   ", "ftp://host:21", "http://"] {
            let config = ConsulConfig {
                address: address.to_string(),
                ..Default::default()
            };
            assert!(
                matches!(config.base_url(), Err(Error::InvalidAddress { .. })),
                "expected '{address}' to be rejected"
            );
        }
    }

    #[test]
    fn test_partial_settings_take_defaults() {
        let config: ConsulConfig =
            serde_json::from_str(r#"{"token": "secret", "scheme": "https"}"#).unwrap();
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.token, "secret");
        assert_eq!(config.ca_file, None);
    }
}
