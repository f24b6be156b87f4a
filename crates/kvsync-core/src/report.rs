//! Reports produced by a reconciliation pass

use std::fmt;

use serde::{Deserialize, Serialize};

/// What happened to one entity during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Created,
    Updated,
    /// Already matched the document
    Unchanged,
    /// Marked with the ignore sentinel and left as found
    Ignored,
    /// Not in the document but exempt from deletion
    Preserved,
    Deleted,
}

impl Outcome {
    /// Whether this outcome needs a mutating store call
    pub fn is_write(self) -> bool {
        matches!(self, Self::Created | Self::Updated | Self::Deleted)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Ignored => "ignored",
            Self::Preserved => "preserved",
            Self::Deleted => "deleted",
        };
        f.write_str(label)
    }
}

/// The entity class a change belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Policy,
    Kv,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Policy => f.write_str("policy"),
            Self::Kv => f.write_str("key"),
        }
    }
}

/// A decision taken for one policy or key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub kind: EntityKind,
    /// Policy name or full key path
    pub subject: String,
    pub outcome: Outcome,
}

/// A store call that failed for one entry; the pass moved on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFailure {
    pub kind: EntityKind,
    pub subject: String,
    pub message: String,
}

/// Report from a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Whether the pass ran without touching the store
    pub dry_run: bool,
    /// Decisions in the order they were taken
    pub changes: Vec<Change>,
    /// Per-entry store failures
    pub failures: Vec<EntryFailure>,
}

impl ReconcileReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Record a decision
    pub fn record(&mut self, kind: EntityKind, subject: impl Into<String>, outcome: Outcome) {
        self.changes.push(Change {
            kind,
            subject: subject.into(),
            outcome,
        });
    }

    /// Record a failed store call
    pub fn fail(&mut self, kind: EntityKind, subject: impl Into<String>, message: impl Into<String>) {
        self.failures.push(EntryFailure {
            kind,
            subject: subject.into(),
            message: message.into(),
        });
    }

    /// Append another report's changes and failures
    pub fn merge(&mut self, other: ReconcileReport) {
        self.changes.extend(other.changes);
        self.failures.extend(other.failures);
    }

    /// Number of changes with the given outcome
    pub fn count(&self, outcome: Outcome) -> usize {
        self.changes.iter().filter(|c| c.outcome == outcome).count()
    }

    /// Number of changes that needed a mutating store call
    pub fn writes(&self) -> usize {
        self.changes.iter().filter(|c| c.outcome.is_write()).count()
    }

    /// Outcome recorded for `subject`, if any
    pub fn outcome_of(&self, kind: EntityKind, subject: &str) -> Option<Outcome> {
        self.changes
            .iter()
            .find(|c| c.kind == kind && c.subject == subject)
            .map(|c| c.outcome)
    }

    /// Whether no entry failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
