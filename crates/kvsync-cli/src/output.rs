//! Human and JSON rendering of a reconcile report

use std::fmt::Write;

use colored::Colorize;
use kvsync_core::{Change, Outcome, ReconcileReport};

use crate::error::Result;

/// Render the report as pretty-printed JSON.
pub fn render_json(report: &ReconcileReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Render a colored summary.
///
/// Writes are always listed; unchanged, ignored and preserved entries only
/// when `verbose` is set.
pub fn render_summary(report: &ReconcileReport, verbose: bool) -> String {
    let mut out = String::new();

    for change in &report.changes {
        if change.outcome.is_write() || verbose {
            let _ = writeln!(out, "   {} {}", marker(change.outcome), describe(change, report.dry_run));
        }
    }

    for failure in &report.failures {
        let _ = writeln!(
            out,
            "{} {} {}: {}",
            "WARN".yellow().bold(),
            failure.kind,
            failure.subject.cyan(),
            failure.message
        );
    }

    let counts = format!(
        "{} created, {} updated, {} deleted, {} unchanged, {} ignored, {} preserved",
        report.count(Outcome::Created),
        report.count(Outcome::Updated),
        report.count(Outcome::Deleted),
        report.count(Outcome::Unchanged),
        report.count(Outcome::Ignored),
        report.count(Outcome::Preserved),
    );
    let status = if !report.is_clean() {
        format!("{} Finished with {} failed entries:", "WARN".yellow().bold(), report.failures.len())
    } else if report.dry_run {
        format!("{} Dry run complete:", "OK".green().bold())
    } else if report.writes() == 0 {
        format!("{} Already in sync:", "OK".green().bold())
    } else {
        format!("{} Reconciliation complete:", "OK".green().bold())
    };
    let _ = writeln!(out, "{} {}", status, counts);

    out
}

fn marker(outcome: Outcome) -> colored::ColoredString {
    match outcome {
        Outcome::Created => "+".green(),
        Outcome::Updated => "~".yellow(),
        Outcome::Deleted => "-".red(),
        Outcome::Unchanged | Outcome::Ignored | Outcome::Preserved => "=".dimmed(),
    }
}

fn describe(change: &Change, dry_run: bool) -> String {
    if dry_run && change.outcome.is_write() {
        let verb = match change.outcome {
            Outcome::Created => "create",
            Outcome::Updated => "update",
            _ => "delete",
        };
        format!("[dry-run] Would {} {} {}", verb, change.kind, change.subject)
    } else {
        format!("{} {} {}", change.kind, change.subject, change.outcome.to_string().dimmed())
    }
}
