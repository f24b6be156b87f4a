//! kvsync CLI
//!
//! Makes the ACL policies and key/value tree of a Consul agent match a YAML
//! document, or every document in a directory.

mod cli;
mod error;
mod logging;
mod output;
mod settings;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use kvsync_consul::ConsulClient;
use kvsync_core::{Reconciler, load_path};

use cli::Cli;
use error::{CliError, Result};
use settings::Settings;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose)
        .map_err(|e| CliError::user(format!("Failed to initialize logging: {}", e)))?;
    tracing::debug!("Verbose mode enabled");

    let mut settings = Settings::load(&cli.config)?;
    settings.apply_overrides(&cli);

    let document = load_path(&cli.path)?;
    let client = ConsulClient::new(&settings.consul)?;

    if !cli.json {
        println!(
            "{} Reconciling {} against {}",
            "=>".blue().bold(),
            cli.path.display().to_string().cyan(),
            client.base_url()
        );
    }

    if let Some(seconds) = cli.wait {
        client.wait_until_ready(Duration::from_secs(seconds))?;
    }

    let options = settings.to_options(cli.dry_run);
    let report = Reconciler::new(&client, options).reconcile(&document)?;

    if cli.json {
        println!("{}", output::render_json(&report)?);
    } else {
        print!("{}", output::render_summary(&report, cli.verbose));
    }

    Ok(())
}
