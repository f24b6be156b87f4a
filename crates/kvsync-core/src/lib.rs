//! Reconciliation engine for kvsync
//!
//! This crate makes a configuration store match a desired-state document:
//!
//! - **Policies**: create, update or delete ACL policies by name
//! - **Key/value tree**: flatten a nested document into full key paths, then
//!   write, skip or purge keys
//! - **Escape hatches**: the `${ignore}` sentinel and preservation options
//!   keep entries the document does not manage
//!
//! # Architecture
//!
//! ```text
//!                  kvsync-cli
//!                      |
//!        +-------------+-------------+
//!        |                           |
//!   kvsync-core  <---- Store ---- kvsync-consul
//! ```
//!
//! The engine only sees the store through the [`Store`] trait, so it can be
//! driven against Consul or the in-memory store used by tests.
//!
//! # Example
//!
//! ```ignore
//! use kvsync_core::{Document, ReconcileOptions, Reconciler};
//!
//! let document = Document::parse(yaml)?;
//! let report = Reconciler::new(&store, ReconcileOptions::default()).reconcile(&document)?;
//! println!("{} writes", report.writes());
//! ```

pub mod document;
pub mod engine;
pub mod error;
pub mod kv;
pub mod loader;
pub mod options;
pub mod policy;
pub mod report;
pub mod scalar;
pub mod store;
pub mod tree;

pub use document::{
    DesiredPolicy, Document, IGNORE_SENTINEL, KvNode, KvTree, PATH_SEPARATOR, Scalar,
};
pub use engine::Reconciler;
pub use error::{Error, Result, StoreError};
pub use kv::KvReconciler;
pub use loader::load_path;
pub use options::{BUILTIN_POLICY_NAMES, ReconcileOptions};
pub use policy::{PolicyReconciler, validate_policies};
pub use report::{Change, EntityKind, EntryFailure, Outcome, ReconcileReport};
pub use scalar::coerce;
pub use store::{KvPair, NewPolicy, Policy, Store};
pub use tree::{FlatEntry, flatten};
