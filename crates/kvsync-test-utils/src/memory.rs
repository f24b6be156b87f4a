//! [`MemoryStore`]: an in-memory store that records every call.
//!
//! Like the legacy Consul ACL API, it allows two policies with the same name,
//! so tests can set up the inconsistent states the reconciler must refuse.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use kvsync_core::{KvPair, NewPolicy, Policy, Store};

/// A store call, as recorded by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListPolicies,
    GetPolicy(String),
    /// Policy name
    CreatePolicy(String),
    /// Policy id
    UpdatePolicy(String),
    /// Policy id
    DeletePolicy(String),
    ListKv(String),
    PutKv(String),
    DeleteKv(String),
}

impl Call {
    /// Whether the call mutates the store
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::CreatePolicy(_)
                | Self::UpdatePolicy(_)
                | Self::DeletePolicy(_)
                | Self::PutKv(_)
                | Self::DeleteKv(_)
        )
    }
}

/// Error returned by [`MemoryStore`] for injected failures
#[derive(Debug, thiserror::Error)]
#[error("memory store: {0}")]
pub struct MemoryStoreError(pub String);

#[derive(Debug, Default)]
struct State {
    policies: Vec<Policy>,
    kv: BTreeMap<String, Vec<u8>>,
    calls: Vec<Call>,
    next_id: u64,
    /// Policy names and keys whose writes fail
    failing: HashSet<String>,
}

impl State {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("00000000-0000-0000-0000-{:012}", self.next_id)
    }

    fn check(&self, subject: &str) -> Result<(), MemoryStoreError> {
        if self.failing.contains(subject) {
            Err(MemoryStoreError(format!("injected failure for '{subject}'")))
        } else {
            Ok(())
        }
    }
}

/// In-memory [`Store`].
///
/// # Example
///
/// ```rust
/// use kvsync_test_utils::MemoryStore;
///
/// let store = MemoryStore::new();
/// store.put("ee/blah", "foo");
/// let id = store.add_policy("web", "client", "# rules");
/// assert_eq!(store.get("ee/blah").as_deref(), Some("foo"));
/// assert_eq!(store.policy_by_name("web").unwrap().id, id);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a policy without recording a call; returns its id.
    pub fn add_policy(&self, name: &str, policy_type: &str, rules: &str) -> String {
        let mut state = self.state();
        let id = state.allocate_id();
        state.policies.push(Policy {
            id: id.clone(),
            name: name.to_string(),
            policy_type: policy_type.to_string(),
            rules: rules.to_string(),
        });
        id
    }

    /// Seed a key without recording a call.
    pub fn put(&self, key: &str, value: &str) {
        self.state()
            .kv
            .insert(key.to_string(), value.as_bytes().to_vec());
    }

    /// Current value of `key` as text.
    pub fn get(&self, key: &str) -> Option<String> {
        self.state()
            .kv
            .get(key)
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    /// All current keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.state().kv.keys().cloned().collect()
    }

    /// First policy named `name`.
    pub fn policy_by_name(&self, name: &str) -> Option<Policy> {
        self.state()
            .policies
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }

    /// All current policies, in creation order.
    pub fn policies(&self) -> Vec<Policy> {
        self.state().policies.clone()
    }

    /// Make every write touching `subject` (a policy name or a key) fail.
    pub fn fail_writes_for(&self, subject: &str) {
        self.state().failing.insert(subject.to_string());
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Every mutating call made so far.
    pub fn writes(&self) -> Vec<Call> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.is_write())
            .cloned()
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

impl Store for MemoryStore {
    type Error = MemoryStoreError;

    fn list_policies(&self) -> Result<Vec<Policy>, Self::Error> {
        let mut state = self.state();
        state.calls.push(Call::ListPolicies);
        Ok(state.policies.clone())
    }

    fn get_policy(&self, id: &str) -> Result<Option<Policy>, Self::Error> {
        let mut state = self.state();
        state.calls.push(Call::GetPolicy(id.to_string()));
        Ok(state.policies.iter().find(|p| p.id == id).cloned())
    }

    fn create_policy(&self, policy: &NewPolicy) -> Result<String, Self::Error> {
        let mut state = self.state();
        state.calls.push(Call::CreatePolicy(policy.name.clone()));
        state.check(&policy.name)?;
        let id = state.allocate_id();
        state.policies.push(Policy {
            id: id.clone(),
            name: policy.name.clone(),
            policy_type: policy.policy_type.clone(),
            rules: policy.rules.clone(),
        });
        Ok(id)
    }

    fn update_policy(&self, policy: &Policy) -> Result<(), Self::Error> {
        let mut state = self.state();
        state.calls.push(Call::UpdatePolicy(policy.id.clone()));
        state.check(&policy.name)?;
        let existing = state
            .policies
            .iter_mut()
            .find(|p| p.id == policy.id)
            .ok_or_else(|| MemoryStoreError(format!("no policy with ID {}", policy.id)))?;
        *existing = policy.clone();
        Ok(())
    }

    fn delete_policy(&self, id: &str) -> Result<(), Self::Error> {
        let mut state = self.state();
        state.calls.push(Call::DeletePolicy(id.to_string()));
        if let Some(name) = state
            .policies
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
        {
            state.check(&name)?;
        }
        state.policies.retain(|p| p.id != id);
        Ok(())
    }

    fn list_kv(&self, prefix: &str) -> Result<Vec<KvPair>, Self::Error> {
        let mut state = self.state();
        state.calls.push(Call::ListKv(prefix.to_string()));
        Ok(state
            .kv
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| KvPair::new(k.clone(), v.clone()))
            .collect())
    }

    fn put_kv(&self, key: &str, value: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.state();
        state.calls.push(Call::PutKv(key.to_string()));
        state.check(key)?;
        state.kv.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete_kv(&self, key: &str) -> Result<(), Self::Error> {
        let mut state = self.state();
        state.calls.push(Call::DeleteKv(key.to_string()));
        state.check(key)?;
        state.kv.remove(key);
        Ok(())
    }
}
