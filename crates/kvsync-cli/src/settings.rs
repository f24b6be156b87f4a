//! Settings file loading and command-line overrides

use std::path::Path;

use kvsync_consul::ConsulConfig;
use kvsync_core::ReconcileOptions;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::cli::Cli;
use crate::error::{CliError, Result};

/// Contents of the settings file.
///
/// Connection keys sit at the top level next to the preservation toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(flatten)]
    pub consul: ConsulConfig,
    /// Keep the built-in "Master Token" and "Anonymous Token" policies
    pub preserve_builtin_tokens: bool,
    /// Keep policies created by external systems, by name prefix
    pub preserve_vault_acls: bool,
    /// Prefixes that mark external policies; defaults to "Vault "
    pub external_prefixes: Option<Vec<String>>,
}

impl Settings {
    /// Load settings from a file; the format is picked by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::SettingsIo {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "json" => parse(path, "JSON", || serde_json::from_str(&content).map_err(|e| e.to_string())),
            "toml" => parse(path, "TOML", || toml::from_str(&content).map_err(|e| e.to_string())),
            "yaml" | "yml" => {
                parse(path, "YAML", || serde_yaml::from_str(&content).map_err(|e| e.to_string()))
            }
            _ => Err(CliError::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    /// Apply `--token` and `--address`, which win over the file.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(token) = &cli.token {
            self.consul.token = token.clone();
        }
        if let Some(address) = &cli.address {
            self.consul.address = address.clone();
        }
    }

    /// Reconciliation options for these settings.
    pub fn to_options(&self, dry_run: bool) -> ReconcileOptions {
        let mut options = ReconcileOptions::default()
            .dry_run(dry_run)
            .preserve_builtin(self.preserve_builtin_tokens)
            .preserve_external(self.preserve_vault_acls);
        if let Some(prefixes) = &self.external_prefixes {
            options.external_prefixes = prefixes.clone();
        }
        options
    }
}

fn parse<T: DeserializeOwned>(
    path: &Path,
    format: &str,
    decode: impl FnOnce() -> std::result::Result<T, String>,
) -> Result<T> {
    decode().map_err(|message| CliError::SettingsParse {
        path: path.to_path_buf(),
        format: format.to_string(),
        message,
    })
}
