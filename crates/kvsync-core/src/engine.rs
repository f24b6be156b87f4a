//! Reconciler: one pass over both entity classes
//!
//! Policies are reconciled first, then the key/value tree. The two passes share
//! nothing but the store and the options; an error in the policy pass ends the
//! run before the key/value pass starts.

use tracing::info;

use crate::Result;
use crate::document::{DesiredPolicy, Document, KvTree};
use crate::kv::KvReconciler;
use crate::options::ReconcileOptions;
use crate::policy::PolicyReconciler;
use crate::report::{Outcome, ReconcileReport};
use crate::store::Store;

/// Drives the policy and key/value reconcilers against one store
pub struct Reconciler<'a, S: Store> {
    store: &'a S,
    options: ReconcileOptions,
}

impl<'a, S: Store> Reconciler<'a, S> {
    pub fn new(store: &'a S, options: ReconcileOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Reconcile the store against `document`.
    ///
    /// A section that is absent or empty is skipped entirely: an empty `kv`
    /// section does not delete every key.
    ///
    /// # Errors
    ///
    /// Returns the first structural error or the first failure to list
    /// current state. Per-entry store failures end up in the report.
    pub fn reconcile(&self, document: &Document) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::new(self.options.dry_run);

        if document.policies.is_empty() {
            info!("No policies to import.");
        } else {
            report.merge(self.reconcile_policies(&document.policies)?);
        }

        if document.kv.is_empty() {
            info!("No KVs to import.");
        } else {
            report.merge(self.reconcile_kv(&document.kv)?);
        }

        info!(
            created = report.count(Outcome::Created),
            updated = report.count(Outcome::Updated),
            deleted = report.count(Outcome::Deleted),
            failed = report.failures.len(),
            dry_run = report.dry_run,
            "Reconciliation finished"
        );

        Ok(report)
    }

    /// Run only the policy pass
    pub fn reconcile_policies(&self, desired: &[DesiredPolicy]) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::new(self.options.dry_run);
        PolicyReconciler::new(self.store, &self.options).reconcile(desired, &mut report)?;
        Ok(report)
    }

    /// Run only the key/value pass
    pub fn reconcile_kv(&self, tree: &KvTree) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::new(self.options.dry_run);
        KvReconciler::new(self.store, &self.options).reconcile(tree, &mut report)?;
        Ok(report)
    }
}
