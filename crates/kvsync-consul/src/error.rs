//! Error types for kvsync-consul

use std::path::PathBuf;
use std::time::Duration;

/// Result type for kvsync-consul operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to Consul
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid Consul address '{address}': {message}")]
    InvalidAddress { address: String, message: String },

    #[error("Invalid Consul token: {message}")]
    InvalidToken { message: String },

    #[error("Failed to read TLS material at {path}: {source}")]
    TlsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TLS material: {0}")]
    Tls(#[source] reqwest::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Consul returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Invalid key '{key}': {message}")]
    InvalidKey { key: String, message: String },

    #[error("Consul rejected the write to {url}")]
    Rejected { url: String },

    #[error("Consul at {address} was not ready after {waited:?}: {last}")]
    NotReady {
        address: String,
        waited: Duration,
        last: String,
    },
}
