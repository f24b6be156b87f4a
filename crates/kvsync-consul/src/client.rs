//! Blocking HTTP client for the Consul ACL and KV endpoints

use std::path::Path;
use std::time::Duration;

use backoff::ExponentialBackoff;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kvsync_core::{KvPair, NewPolicy, Policy, Store};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Certificate, Identity, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{ConsulConfig, Error, Result};

/// Header carrying the ACL token (`X-Consul-Token`)
pub const TOKEN_HEADER: &str = "x-consul-token";

/// ACL entry as returned by the legacy ACL endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AclEntry {
    #[serde(rename = "ID")]
    id: String,
    name: String,
    #[serde(rename = "Type", default)]
    acl_type: String,
    #[serde(default)]
    rules: String,
}

impl From<AclEntry> for Policy {
    fn from(entry: AclEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            policy_type: entry.acl_type,
            rules: entry.rules,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AclWrite<'a> {
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    name: &'a str,
    #[serde(rename = "Type")]
    acl_type: &'a str,
    rules: &'a str,
}

#[derive(Debug, Deserialize)]
struct AclCreated {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KvEntry {
    key: String,
    /// Base64; null for keys created without a body
    value: Option<String>,
}

/// Consul agent client implementing [`Store`].
#[derive(Debug, Clone)]
pub struct ConsulClient {
    http: Client,
    base: Url,
}

impl ConsulClient {
    /// Build a client from connection settings.
    ///
    /// Reads the TLS material named by `config` when the address is `https`.
    pub fn new(config: &ConsulConfig) -> Result<Self> {
        let base = config.base_url()?;
        let mut builder =
            Client::builder().user_agent(concat!("kvsync/", env!("CARGO_PKG_VERSION")));

        if !config.token.is_empty() {
            let mut value =
                HeaderValue::from_str(&config.token).map_err(|e| Error::InvalidToken {
                    message: e.to_string(),
                })?;
            value.set_sensitive(true);
            let mut headers = HeaderMap::new();
            headers.insert(HeaderName::from_static(TOKEN_HEADER), value);
            builder = builder.default_headers(headers);
        }

        if base.scheme() == "https" {
            builder = builder.use_rustls_tls();
            if let Some(ca_file) = &config.ca_file {
                let pem = read_pem(ca_file)?;
                for cert in Certificate::from_pem_bundle(&pem).map_err(Error::Tls)? {
                    builder = builder.add_root_certificate(cert);
                }
            }
            match (&config.cert_file, &config.key_file) {
                (Some(cert_file), Some(key_file)) => {
                    let mut pem = read_pem(cert_file)?;
                    pem.push(b'\n');
                    pem.extend(read_pem(key_file)?);
                    builder = builder.identity(Identity::from_pem(&pem).map_err(Error::Tls)?);
                }
                (Some(_), None) | (None, Some(_)) => {
                    warn!("Client certificate needs both cert_file and key_file; ignoring");
                }
                (None, None) => {}
            }
            if config.insecure_skip_verify {
                warn!("TLS certificate verification is disabled");
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        let http = builder.build().map_err(Error::Client)?;
        debug!("Consul client for {}", base);
        Ok(Self { http, base })
    }

    /// Base URL of the agent's HTTP API.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Current raft leader, empty while the cluster has none.
    pub fn leader(&self) -> Result<String> {
        let url = self.endpoint(["v1", "status", "leader"])?;
        self.get_json(url)
    }

    /// Block until the agent reports a leader, retrying with exponential backoff.
    pub fn wait_until_ready(&self, max_wait: Duration) -> Result<()> {
        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(200),
            max_interval: Duration::from_secs(5),
            max_elapsed_time: Some(max_wait),
            ..Default::default()
        };

        let probe = || match self.leader() {
            Ok(leader) if !leader.is_empty() => {
                info!("Consul is ready, leader {}", leader);
                Ok(())
            }
            Ok(_) => {
                debug!("Consul has no leader yet");
                Err(backoff::Error::transient("no leader elected".to_string()))
            }
            Err(e) => {
                debug!("Consul not reachable yet: {}", e);
                Err(backoff::Error::transient(e.to_string()))
            }
        };

        backoff::retry(policy, probe).map_err(|e| {
            let last = match e {
                backoff::Error::Permanent(message) => message,
                backoff::Error::Transient { err, .. } => err,
            };
            Error::NotReady {
                address: self.base.to_string(),
                waited: max_wait,
                last,
            }
        })
    }

    fn endpoint<'s>(&self, segments: impl IntoIterator<Item = &'s str>) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidAddress {
                address: self.base.to_string(),
                message: "address cannot be a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// URL of a KV key; each `/`-separated segment is percent-encoded.
    ///
    /// URL normalization would collapse `.` and `..` segments (even encoded
    /// as `%2E`) and address a different key, so such keys are refused.
    fn kv_url(&self, key: &str) -> Result<Url> {
        if key.split('/').any(|segment| segment == "." || segment == "..") {
            return Err(Error::InvalidKey {
                key: key.to_string(),
                message: "'.' and '..' segments cannot be addressed over HTTP".to_string(),
            });
        }
        self.endpoint(["v1", "kv"].into_iter().chain(key.split('/')))
    }

    fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response> {
        request.send().map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })
    }

    fn check(response: Response, url: &Url) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(Error::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }

    fn execute(&self, request: RequestBuilder, url: &Url) -> Result<Response> {
        let response = self.send(request, url)?;
        Self::check(response, url)
    }

    fn decode<T: DeserializeOwned>(response: Response, url: &Url) -> Result<T> {
        response.json().map_err(|e| Error::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);
        let response = self.execute(self.http.get(url.clone()), &url)?;
        Self::decode(response, &url)
    }

    fn write_acl(&self, action: &str, body: &AclWrite<'_>) -> Result<(Response, Url)> {
        let url = self.endpoint(["v1", "acl", action])?;
        debug!("PUT {} for '{}'", url, body.name);
        let response = self.execute(self.http.put(url.clone()).json(body), &url)?;
        Ok((response, url))
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::TlsFile {
        path: path.to_path_buf(),
        source,
    })
}

impl Store for ConsulClient {
    type Error = Error;

    fn list_policies(&self) -> Result<Vec<Policy>> {
        let url = self.endpoint(["v1", "acl", "list"])?;
        let entries: Option<Vec<AclEntry>> = self.get_json(url)?;
        Ok(entries
            .unwrap_or_default()
            .into_iter()
            .map(Policy::from)
            .collect())
    }

    fn get_policy(&self, id: &str) -> Result<Option<Policy>> {
        let url = self.endpoint(["v1", "acl", "info", id])?;
        let entries: Option<Vec<AclEntry>> = self.get_json(url)?;
        Ok(entries
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(Policy::from))
    }

    fn create_policy(&self, policy: &NewPolicy) -> Result<String> {
        let body = AclWrite {
            id: None,
            name: &policy.name,
            acl_type: &policy.policy_type,
            rules: &policy.rules,
        };
        let (response, url) = self.write_acl("create", &body)?;
        let created: AclCreated = Self::decode(response, &url)?;
        Ok(created.id)
    }

    fn update_policy(&self, policy: &Policy) -> Result<()> {
        let body = AclWrite {
            id: Some(&policy.id),
            name: &policy.name,
            acl_type: &policy.policy_type,
            rules: &policy.rules,
        };
        self.write_acl("update", &body)?;
        Ok(())
    }

    fn delete_policy(&self, id: &str) -> Result<()> {
        let url = self.endpoint(["v1", "acl", "destroy", id])?;
        debug!("PUT {}", url);
        self.execute(self.http.put(url.clone()), &url)?;
        Ok(())
    }

    fn list_kv(&self, prefix: &str) -> Result<Vec<KvPair>> {
        let mut url = self.kv_url(prefix)?;
        url.set_query(Some("recurse"));
        debug!("GET {}", url);

        let response = self.send(self.http.get(url.clone()), &url)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let response = Self::check(response, &url)?;
        let entries: Option<Vec<KvEntry>> = Self::decode(response, &url)?;

        entries
            .unwrap_or_default()
            .into_iter()
            .map(|entry| {
                let value = match entry.value {
                    Some(encoded) => STANDARD.decode(encoded).map_err(|e| Error::Decode {
                        url: url.to_string(),
                        message: format!("value of '{}': {}", entry.key, e),
                    })?,
                    None => Vec::new(),
                };
                Ok(KvPair::new(entry.key, value))
            })
            .collect()
    }

    fn put_kv(&self, key: &str, value: &[u8]) -> Result<()> {
        let url = self.kv_url(key)?;
        debug!("PUT {}", url);
        let response = self.execute(self.http.put(url.clone()).body(value.to_vec()), &url)?;
        let accepted: bool = Self::decode(response, &url)?;
        if accepted {
            Ok(())
        } else {
            Err(Error::Rejected {
                url: url.to_string(),
            })
        }
    }

    fn delete_kv(&self, key: &str) -> Result<()> {
        let url = self.kv_url(key)?;
        debug!("DELETE {}", url);
        self.execute(self.http.delete(url.clone()), &url)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client() -> ConsulClient {
        ConsulClient::new(&ConsulConfig::default()).unwrap()
    }

    #[test]
    fn test_kv_url_encodes_each_segment() {
        let url = client().kv_url("app/my key/a?b#c").unwrap();
        assert_eq!(url.path(), "/v1/kv/app/my%20key/a%3Fb%23c");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_kv_url_refuses_dot_segments() {
        for key in ["app/./port", "app/../port", "app/.", "..", "./app"] {
            assert!(
                matches!(client().kv_url(key), Err(Error::InvalidKey { .. })),
                "expected '{key}' to be refused"
            );
        }
        assert_eq!(
            client().kv_url("app/.hidden/v1..2").unwrap().path(),
            "/v1/kv/app/.hidden/v1..2"
        );
    }

    #[test]
    fn test_kv_url_keeps_trailing_separator() {
        assert_eq!(client().kv_url("app/").unwrap().path(), "/v1/kv/app/");
        assert_eq!(client().kv_url("").unwrap().path(), "/v1/kv/");
    }

    #[test]
    fn test_endpoint_under_a_path_prefix() {
        let config = ConsulConfig {
            address: "http://proxy:8080/consul/".to_string(),
            ..Default::default()
        };
        let client = ConsulClient::new(&config).unwrap();
        let url = client.endpoint(["v1", "acl", "list"]).unwrap();
        assert_eq!(url.as_str(), "http://proxy:8080/consul/v1/acl/list");
    }

    #[test]
    fn test_acl_entry_wire_format() {
        let entry: AclEntry = serde_json::from_str(
            r##"{"ID":"abc","Name":"web","Type":"client","Rules":"# r","CreateIndex":1,"ModifyIndex":2}"##,
        )
        .unwrap();
        let policy = Policy::from(entry);
        assert_eq!(policy.id, "abc");
        assert_eq!(policy.policy_type, "client");
    }

    #[test]
    fn test_acl_create_body_has_no_id() {
        let body = AclWrite {
            id: None,
            name: "web",
            acl_type: "client",
            rules: "",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"Name": "web", "Type": "client", "Rules": ""})
        );
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        let config = ConsulConfig {
            token: "bad\ntoken".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ConsulClient::new(&config),
            Err(Error::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_missing_ca_file_is_reported() {
        let config = ConsulConfig {
            scheme: "https".to_string(),
            ca_file: Some("/nonexistent/ca.pem".into()),
            ..Default::default()
        };
        assert!(matches!(
            ConsulClient::new(&config),
            Err(Error::TlsFile { .. })
        ));
    }
}
