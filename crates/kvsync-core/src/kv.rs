//! Key/value reconciler
//!
//! A pass runs in three steps:
//!
//! 1. **Fetch** every current pair; every current key starts out as a
//!    candidate for deletion.
//! 2. **Walk** the desired tree. Written, unchanged and ignored keys stop being
//!    candidates.
//! 3. **Purge** whatever is still a candidate.
//!
//! A structural error in the tree ends the pass at the point it is found.
//! Writes made before that point are not undone and nothing is purged, so a
//! malformed branch can leave the store with part of the document applied.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, error, info, warn};

use crate::document::KvTree;
use crate::options::ReconcileOptions;
use crate::report::{EntityKind, Outcome, ReconcileReport};
use crate::store::Store;
use crate::tree::{self, FlatEntry};
use crate::{Error, Result};

/// Reconciles the key/value space of a store against a desired tree
pub struct KvReconciler<'a, S: Store> {
    store: &'a S,
    options: &'a ReconcileOptions,
}

/// State of one pass
struct Pass {
    /// Last known value of every key, updated after each successful write
    known: HashMap<String, Vec<u8>>,
    /// Current keys not yet claimed by the document
    candidates: BTreeSet<String>,
}

impl<'a, S: Store> KvReconciler<'a, S> {
    pub fn new(store: &'a S, options: &'a ReconcileOptions) -> Self {
        Self { store, options }
    }

    /// Make the store's key/value space match `tree`.
    ///
    /// # Errors
    ///
    /// Returns an error if the current pairs cannot be listed, or if the tree
    /// has a structural problem. Failed writes and deletes of single keys are
    /// logged and recorded in `report` instead.
    pub fn reconcile(&self, tree: &KvTree, report: &mut ReconcileReport) -> Result<()> {
        let current = self
            .store
            .list_kv("")
            .map_err(|e| Error::store("list_kv", e))?;

        let mut pass = Pass {
            known: HashMap::with_capacity(current.len()),
            candidates: BTreeSet::new(),
        };
        for pair in current {
            debug!("Found key {}", pair.key);
            pass.candidates.insert(pair.key.clone());
            pass.known.insert(pair.key, pair.value);
        }

        tree::walk(tree, "", &mut |entry| {
            self.apply(entry, &mut pass, report);
            Ok(())
        })?;

        if !pass.candidates.is_empty() {
            info!("Deleting {} runaway key pairs", pass.candidates.len());
        }
        for key in pass.candidates {
            warn!("Deleting runaway key '{}'", key);
            self.delete(&key, report);
        }

        Ok(())
    }

    fn apply(&self, entry: FlatEntry, pass: &mut Pass, report: &mut ReconcileReport) {
        match entry {
            FlatEntry::IgnoreSubtree { prefix } => {
                pass.candidates.retain(|key| {
                    if key.starts_with(&prefix) {
                        report.record(EntityKind::Kv, key.clone(), Outcome::Ignored);
                        false
                    } else {
                        true
                    }
                });
            }
            FlatEntry::IgnoreKey { path } => {
                debug!("Ignoring key {}", path);
                pass.candidates.remove(&path);
                report.record(EntityKind::Kv, path, Outcome::Ignored);
            }
            FlatEntry::Leaf { path, value } => {
                let outcome = match pass.known.get(&path) {
                    Some(current) if current.as_slice() == value.as_bytes() => {
                        debug!("Key {} is up to date", path);
                        pass.candidates.remove(&path);
                        report.record(EntityKind::Kv, path, Outcome::Unchanged);
                        return;
                    }
                    Some(_) => {
                        warn!("Value of key {} has been changed. Overwriting ...", path);
                        Outcome::Updated
                    }
                    None => {
                        info!("Creating key {}", path);
                        Outcome::Created
                    }
                };

                match self.put(&path, value.as_bytes()) {
                    Ok(()) => {
                        pass.candidates.remove(&path);
                        pass.known.insert(path.clone(), value.into_bytes());
                        report.record(EntityKind::Kv, path, outcome);
                    }
                    Err(err) => {
                        error!("Failed to update key '{}' with value '{}': {}", path, value, err);
                        report.fail(EntityKind::Kv, path, err.to_string());
                    }
                }
            }
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> std::result::Result<(), S::Error> {
        if self.options.dry_run {
            info!("[dry-run] Would write key {}", key);
            return Ok(());
        }
        self.store.put_kv(key, value)
    }

    fn delete(&self, key: &str, report: &mut ReconcileReport) {
        if self.options.dry_run {
            info!("[dry-run] Would delete key {}", key);
            report.record(EntityKind::Kv, key, Outcome::Deleted);
            return;
        }
        match self.store.delete_kv(key) {
            Ok(()) => {
                info!("Deleted key: {}", key);
                report.record(EntityKind::Kv, key, Outcome::Deleted);
            }
            Err(err) => {
                error!("Failed to delete key: {}. {}", key, err);
                report.fail(EntityKind::Kv, key, err.to_string());
            }
        }
    }
}
