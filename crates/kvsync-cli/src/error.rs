//! Error types for kvsync-cli

use std::path::PathBuf;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from kvsync-core
    #[error(transparent)]
    Core(#[from] kvsync_core::Error),

    /// Error from kvsync-consul
    #[error(transparent)]
    Consul(#[from] kvsync_consul::Error),

    #[error("Failed to read settings file {path}: {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} settings file {path}: {message}")]
    SettingsParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported settings format: '{extension}' (expected json, toml, yaml or yml)")]
    UnsupportedFormat { extension: String },

    #[error("Failed to render report: {0}")]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
