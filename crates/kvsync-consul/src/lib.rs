//! Consul store for kvsync
//!
//! [`ConsulClient`] implements [`kvsync_core::Store`] over the agent's HTTP
//! API: the legacy ACL endpoints for policies and the KV endpoints for the
//! key/value tree. Calls are blocking and issued one at a time.
//!
//! ```ignore
//! use kvsync_consul::{ConsulClient, ConsulConfig};
//!
//! let client = ConsulClient::new(&ConsulConfig::default())?;
//! client.wait_until_ready(std::time::Duration::from_secs(30))?;
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::{ConsulClient, TOKEN_HEADER};
pub use config::{ConsulConfig, DEFAULT_ADDRESS, DEFAULT_SCHEME};
pub use error::{Error, Result};
