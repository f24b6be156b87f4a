//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::Parser;

/// Settings file used when `--config` is not given
pub const DEFAULT_CONFIG: &str = "./config.json";

/// kvsync - Make Consul ACLs and key/values match a YAML document
#[derive(Parser, Debug)]
#[command(name = "kvsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Document file, or directory of .yml/.yaml/.json documents
    pub path: PathBuf,

    /// Settings file (JSON, TOML or YAML, by extension)
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// ACL token, overrides the settings file
    #[arg(long, env = "CONSUL_HTTP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Consul address (host:port or URL), overrides the settings file
    #[arg(long, env = "CONSUL_HTTP_ADDR")]
    pub address: Option<String>,

    /// Report what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Wait up to this many seconds for Consul to elect a leader first
    #[arg(long, value_name = "SECONDS")]
    pub wait: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
