//! Policy (ACL) reconciler
//!
//! Unlike the key/value pass, the policy pass validates everything up front:
//! duplicate names on either side, empty names and unknown types abort the
//! pass before the first write. Once validation passes, a failing store call
//! only affects the policy it was made for.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, error, info, warn};

use crate::document::DesiredPolicy;
use crate::options::ReconcileOptions;
use crate::report::{EntityKind, Outcome, ReconcileReport};
use crate::store::{DEFAULT_POLICY_TYPE, NewPolicy, POLICY_TYPES, Policy, Store};
use crate::{Error, Result};

/// Type a desired policy resolves to, applying the `client` default
pub fn effective_type(policy: &DesiredPolicy) -> &str {
    if policy.policy_type.is_empty() {
        DEFAULT_POLICY_TYPE
    } else {
        &policy.policy_type
    }
}

/// Check desired policies for empty names, unknown types and duplicate names.
pub fn validate_policies(desired: &[DesiredPolicy]) -> Result<()> {
    let mut seen = HashSet::with_capacity(desired.len());
    for (index, policy) in desired.iter().enumerate() {
        if policy.name.is_empty() {
            return Err(Error::EmptyPolicyName { index });
        }
        if !policy.is_ignored() && !POLICY_TYPES.contains(&effective_type(policy)) {
            return Err(Error::InvalidPolicyType {
                name: policy.name.clone(),
                policy_type: policy.policy_type.clone(),
            });
        }
        if !seen.insert(policy.name.as_str()) {
            error!(
                "Found duplicate policy '{}' in the desired state. Aborting ...",
                policy.name
            );
            return Err(Error::DuplicateDesiredPolicy {
                name: policy.name.clone(),
            });
        }
    }
    Ok(())
}

/// Reconciles the policies of a store against a desired list
pub struct PolicyReconciler<'a, S: Store> {
    store: &'a S,
    options: &'a ReconcileOptions,
}

impl<'a, S: Store> PolicyReconciler<'a, S> {
    pub fn new(store: &'a S, options: &'a ReconcileOptions) -> Self {
        Self { store, options }
    }

    /// Make the store's policies match `desired`.
    ///
    /// # Errors
    ///
    /// Returns an error, without writing anything, if the current policies
    /// cannot be listed, if two current policies share a name, or if
    /// `desired` fails [`validate_policies`].
    pub fn reconcile(&self, desired: &[DesiredPolicy], report: &mut ReconcileReport) -> Result<()> {
        let mut candidates = self.current_policies()?;
        validate_policies(desired)?;

        for policy in desired {
            if self.apply(policy, &candidates, report) {
                candidates.remove(&policy.name);
            }
        }

        candidates.retain(|name, _| {
            if self.options.preserves_policy(name) {
                info!("Preserving policy '{}'", name);
                report.record(EntityKind::Policy, name.clone(), Outcome::Preserved);
                false
            } else {
                true
            }
        });

        for (name, id) in candidates {
            warn!("Deleting unexpected policy '{}' with ID: {}", name, id);
            self.delete(&name, &id, report);
        }

        Ok(())
    }

    /// Current policies as a name to id map
    fn current_policies(&self) -> Result<BTreeMap<String, String>> {
        let listed = self
            .store
            .list_policies()
            .map_err(|e| Error::store("list_policies", e))?;

        let mut current = BTreeMap::new();
        for policy in listed {
            debug!("Found policy {}:{}", policy.id, policy.name);
            if current.contains_key(&policy.name) {
                error!("Found duplicate policy name in the store: {}", policy.name);
                return Err(Error::DuplicateCurrentPolicy { name: policy.name });
            }
            current.insert(policy.name, policy.id);
        }
        Ok(current)
    }

    /// Apply one desired policy; returns whether it is settled
    fn apply(
        &self,
        desired: &DesiredPolicy,
        current: &BTreeMap<String, String>,
        report: &mut ReconcileReport,
    ) -> bool {
        if desired.is_ignored() {
            debug!("Ignoring policy '{}'", desired.name);
            report.record(EntityKind::Policy, desired.name.clone(), Outcome::Ignored);
            return true;
        }

        match current.get(&desired.name) {
            Some(id) => self.update(desired, id, report),
            None => self.create(desired, report),
        }
    }

    fn update(&self, desired: &DesiredPolicy, id: &str, report: &mut ReconcileReport) -> bool {
        let existing = match self.store.get_policy(id) {
            Ok(Some(existing)) => existing,
            Ok(None) => {
                error!("Policy '{}' with ID {} disappeared from the store", desired.name, id);
                report.fail(
                    EntityKind::Policy,
                    desired.name.clone(),
                    format!("policy with ID {id} not found"),
                );
                return false;
            }
            Err(err) => {
                error!("Failed to get info for policy '{}' with ID {}: {}", desired.name, id, err);
                report.fail(EntityKind::Policy, desired.name.clone(), err.to_string());
                return false;
            }
        };

        let policy_type = effective_type(desired);
        if existing.policy_type == policy_type && existing.rules == desired.rules {
            info!(
                "Skipping policy '{}' with ID: {}. Nothing to update.",
                desired.name, existing.id
            );
            report.record(EntityKind::Policy, desired.name.clone(), Outcome::Unchanged);
            return true;
        }

        let updated = Policy {
            policy_type: policy_type.to_string(),
            rules: desired.rules.clone(),
            ..existing
        };

        if self.options.dry_run {
            info!("[dry-run] Would update policy '{}' with ID: {}", desired.name, updated.id);
            report.record(EntityKind::Policy, desired.name.clone(), Outcome::Updated);
            return true;
        }

        info!("Updating policy '{}' with ID: {}", desired.name, updated.id);
        match self.store.update_policy(&updated) {
            Ok(()) => {
                report.record(EntityKind::Policy, desired.name.clone(), Outcome::Updated);
                true
            }
            Err(err) => {
                error!("Failed to update policy '{}': {}", desired.name, err);
                report.fail(EntityKind::Policy, desired.name.clone(), err.to_string());
                false
            }
        }
    }

    fn create(&self, desired: &DesiredPolicy, report: &mut ReconcileReport) -> bool {
        let new_policy = NewPolicy {
            name: desired.name.clone(),
            policy_type: effective_type(desired).to_string(),
            rules: desired.rules.clone(),
        };

        if self.options.dry_run {
            info!("[dry-run] Would create policy '{}'", desired.name);
            report.record(EntityKind::Policy, desired.name.clone(), Outcome::Created);
            return true;
        }

        match self.store.create_policy(&new_policy) {
            Ok(id) => {
                info!("A new policy '{}' has been created with ID: {}", desired.name, id);
                report.record(EntityKind::Policy, desired.name.clone(), Outcome::Created);
                true
            }
            Err(err) => {
                error!("Failed to create policy '{}': {}", desired.name, err);
                report.fail(EntityKind::Policy, desired.name.clone(), err.to_string());
                false
            }
        }
    }

    fn delete(&self, name: &str, id: &str, report: &mut ReconcileReport) {
        if self.options.dry_run {
            info!("[dry-run] Would delete policy '{}'", name);
            report.record(EntityKind::Policy, name, Outcome::Deleted);
            return;
        }
        match self.store.delete_policy(id) {
            Ok(()) => report.record(EntityKind::Policy, name, Outcome::Deleted),
            Err(err) => {
                error!("Failed to delete policy '{}' with ID {}: {}", name, id, err);
                report.fail(EntityKind::Policy, name, err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::IGNORE_SENTINEL;

    #[test]
    fn test_effective_type_defaults_to_client() {
        assert_eq!(effective_type(&DesiredPolicy::new("a", "", "")), "client");
        assert_eq!(
            effective_type(&DesiredPolicy::new("a", "management", "")),
            "management"
        );
    }

    #[test]
    fn test_validate_accepts_distinct_names() {
        let desired = vec![
            DesiredPolicy::new("a", "", "# a"),
            DesiredPolicy::new("b", "management", "# b"),
        ];
        assert!(validate_policies(&desired).is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let desired = vec![
            DesiredPolicy::new("test bbb", "client", "# test"),
            DesiredPolicy::new("test bbb", "client", "# test"),
        ];
        let err = validate_policies(&desired).unwrap_err();
        assert!(matches!(err, Error::DuplicateDesiredPolicy { ref name } if name == "test bbb"));
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let desired = vec![
            DesiredPolicy::new("a", "", ""),
            DesiredPolicy::new("", "", ""),
        ];
        assert!(matches!(
            validate_policies(&desired),
            Err(Error::EmptyPolicyName { index: 1 })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_type() {
        let desired = vec![DesiredPolicy::new("a", "admin", "")];
        assert!(matches!(
            validate_policies(&desired),
            Err(Error::InvalidPolicyType { .. })
        ));
    }

    #[test]
    fn test_validate_skips_type_of_ignored_policy() {
        let desired = vec![DesiredPolicy::new("a", "whatever", IGNORE_SENTINEL)];
        assert!(validate_policies(&desired).is_ok());
    }
}
