//! Options shared by both reconcilers

/// Policy names the store creates on its own
pub const BUILTIN_POLICY_NAMES: &[&str] = &["Master Token", "Anonymous Token"];

/// Name prefixes of policies managed by other systems
pub const DEFAULT_EXTERNAL_PREFIXES: &[&str] = &["Vault "];

/// Options for a reconciliation pass
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// If true, compute and report every decision without calling any
    /// mutating store operation.
    pub dry_run: bool,
    /// Keep the built-in policies ([`BUILTIN_POLICY_NAMES`]) even when the
    /// document does not mention them
    pub preserve_builtin_policies: bool,
    /// Keep policies whose name starts with one of `external_prefixes`
    pub preserve_external_policies: bool,
    pub external_prefixes: Vec<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            preserve_builtin_policies: false,
            preserve_external_policies: false,
            external_prefixes: DEFAULT_EXTERNAL_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl ReconcileOptions {
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn preserve_builtin(mut self, preserve: bool) -> Self {
        self.preserve_builtin_policies = preserve;
        self
    }

    pub fn preserve_external(mut self, preserve: bool) -> Self {
        self.preserve_external_policies = preserve;
        self
    }

    /// Whether a policy that the document does not mention must survive the pass
    pub fn preserves_policy(&self, name: &str) -> bool {
        (self.preserve_builtin_policies && BUILTIN_POLICY_NAMES.contains(&name))
            || (self.preserve_external_policies
                && self
                    .external_prefixes
                    .iter()
                    .any(|prefix| name.starts_with(prefix.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preserves_nothing() {
        let options = ReconcileOptions::default();
        assert!(!options.preserves_policy("Master Token"));
        assert!(!options.preserves_policy("Vault abc"));
    }

    #[test]
    fn test_preserve_builtin() {
        let options = ReconcileOptions::default().preserve_builtin(true);
        assert!(options.preserves_policy("Master Token"));
        assert!(options.preserves_policy("Anonymous Token"));
        assert!(!options.preserves_policy("Master Token 2"));
        assert!(!options.preserves_policy("Vault abc"));
    }

    #[test]
    fn test_preserve_external_prefixes() {
        let mut options = ReconcileOptions::default().preserve_external(true);
        assert!(options.preserves_policy("Vault abc"));
        assert!(!options.preserves_policy("Vaulted"));
        assert!(!options.preserves_policy("Master Token"));

        options.external_prefixes = vec!["nomad-".to_string()];
        assert!(options.preserves_policy("nomad-server"));
        assert!(!options.preserves_policy("Vault abc"));
    }
}
