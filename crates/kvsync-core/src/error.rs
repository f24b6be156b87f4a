//! Error types for kvsync-core

use std::path::PathBuf;

/// Result type for kvsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by a [`Store`](crate::Store) implementation
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in kvsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A key marked as a subtree holds something other than a mapping or the ignore sentinel
    #[error("Unexpected value for the key tree '{key}' of type: {kind}")]
    InvalidSubtree { key: String, kind: String },

    /// A leaf key holds a value that cannot be rendered as text
    #[error("Unexpected value for the key '{key}': {kind}")]
    InvalidLeaf { key: String, kind: String },

    /// Two policies in the store share a name
    #[error("Found duplicate policy name '{name}' in the store")]
    DuplicateCurrentPolicy { name: String },

    /// Two desired policies share a name
    #[error("Found duplicate policy name '{name}' in the desired state")]
    DuplicateDesiredPolicy { name: String },

    /// A desired policy has an empty name
    #[error("Desired policy #{index} has an empty name")]
    EmptyPolicyName { index: usize },

    /// A desired policy has a type outside the supported set
    #[error("Policy '{name}' has unsupported type '{policy_type}'")]
    InvalidPolicyType { name: String, policy_type: String },

    /// A store call whose failure prevents reconciliation altogether
    #[error("Store {operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// A desired-state document could not be parsed
    #[error("Failed to parse document {path}: {message}")]
    DocumentParse { path: PathBuf, message: String },

    /// I/O error while loading documents
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML deserialization error
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn store(operation: &'static str, source: impl Into<StoreError>) -> Self {
        Self::Store {
            operation,
            source: source.into(),
        }
    }

    /// Whether this error comes from the shape of the desired state rather than the store
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::InvalidSubtree { .. }
                | Self::InvalidLeaf { .. }
                | Self::DuplicateCurrentPolicy { .. }
                | Self::DuplicateDesiredPolicy { .. }
                | Self::EmptyPolicyName { .. }
                | Self::InvalidPolicyType { .. }
        )
    }
}
