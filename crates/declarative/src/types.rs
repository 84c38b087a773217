//! Core types for ordered command execution

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Apply commands in ascending sort order
    Deploy,
    /// Reverse commands in descending sort order
    Undo,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deploy => write!(f, "deploy"),
            Self::Undo => write!(f, "undo"),
        }
    }
}

/// Result of applying or removing a single unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// Remote state already matched
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified
    Modified,
    /// Resource was removed
    Removed,
    /// Unit was skipped, e.g. because its owning database does not exist yet
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }

    /// Check if the unit was skipped
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

impl fmt::Display for ApplyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChange => write!(f, "unchanged"),
            Self::Created => write!(f, "created"),
            Self::Modified => write!(f, "modified"),
            Self::Removed => write!(f, "removed"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
        }
    }
}

/// Outcome of one unit processed by a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOutcome {
    /// Identity of the unit, usually `kind:name` or a document URI
    pub id: String,
    pub result: ApplyResult,
}

impl UnitOutcome {
    pub fn new(id: impl Into<String>, result: ApplyResult) -> Self {
        Self {
            id: id.into(),
            result,
        }
    }

    /// Shorthand for a skipped unit
    pub fn skipped(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            id,
            ApplyResult::Skipped {
                reason: reason.into(),
            },
        )
    }
}

/// Summary of a deploy or undo run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub no_change: usize,
    /// Commands that ran to completion
    pub commands_run: usize,
    /// Commands passed over (e.g. kinds retained on undo)
    pub commands_skipped: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Total number of units processed
    pub fn total(&self) -> usize {
        self.created + self.modified + self.removed + self.skipped + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.no_change += other.no_change;
        self.commands_run += other.commands_run;
        self.commands_skipped += other.commands_skipped;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }

    /// Add every outcome of one command
    pub fn add_outcomes(&mut self, outcomes: &[UnitOutcome]) {
        for outcome in outcomes {
            self.add_result(&outcome.result);
        }
    }
}
