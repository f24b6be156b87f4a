//! Remote store interface
//!
//! Both reconcilers talk to the store only through [`Store`]. Calls are issued
//! one at a time and awaited before the next one; implementations do not need
//! to be safe for concurrent passes.

use serde::{Deserialize, Serialize};

/// Policy type used when a desired policy leaves it empty
pub const DEFAULT_POLICY_TYPE: &str = "client";

/// Policy types the store accepts
pub const POLICY_TYPES: &[&str] = &["client", "management"];

/// A policy as it exists in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Store-assigned identifier, preserved across updates
    pub id: String,
    pub name: String,
    pub policy_type: String,
    pub rules: String,
}

/// A policy to be created; the store assigns its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPolicy {
    pub name: String,
    pub policy_type: String,
    pub rules: String,
}

/// A key/value pair as it exists in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: String,
    pub value: Vec<u8>,
}

impl KvPair {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Operations the reconcilers need from a configuration store.
pub trait Store {
    /// Error returned by every operation
    type Error: std::error::Error + Send + Sync + 'static;

    /// List every policy.
    fn list_policies(&self) -> Result<Vec<Policy>, Self::Error>;

    /// Fetch one policy by id, `None` if it does not exist.
    fn get_policy(&self, id: &str) -> Result<Option<Policy>, Self::Error>;

    /// Create a policy and return its new id.
    fn create_policy(&self, policy: &NewPolicy) -> Result<String, Self::Error>;

    /// Replace the type and rules of the policy with `policy.id`.
    fn update_policy(&self, policy: &Policy) -> Result<(), Self::Error>;

    /// Delete the policy with `id`.
    fn delete_policy(&self, id: &str) -> Result<(), Self::Error>;

    /// List every key/value pair whose key starts with `prefix`.
    fn list_kv(&self, prefix: &str) -> Result<Vec<KvPair>, Self::Error>;

    /// Create or overwrite `key`.
    fn put_kv(&self, key: &str, value: &[u8]) -> Result<(), Self::Error>;

    /// Delete `key`.
    fn delete_kv(&self, key: &str) -> Result<(), Self::Error>;
}
