//! Progress and confirmation callbacks
//!
//! These traits let the orchestrator report progress and ask questions
//! without depending on a specific terminal UI.

use crate::types::{ExecuteSummary, Phase, UnitOutcome};
use anyhow::Result;

/// Progress callback for deploy and undo runs
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called once before the first command, with the number of commands in order
    fn on_run_start(&mut self, phase: Phase, count: usize);

    /// Called when a command starts
    fn on_command_start(&mut self, phase: Phase, name: &str);

    /// Called when a command finishes without a fatal error
    fn on_command_complete(&mut self, phase: Phase, name: &str, outcomes: &[UnitOutcome]);

    /// Called when a command is passed over without running
    fn on_command_skipped(&mut self, phase: Phase, name: &str, reason: &str);

    /// Called after the last command
    fn on_run_complete(&mut self, phase: Phase, summary: &ExecuteSummary);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback {
    /// Ask the user to confirm an action
    ///
    /// Returns `true` if the user confirmed.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_run_start(&mut self, _phase: Phase, _count: usize) {}
    fn on_command_start(&mut self, _phase: Phase, _name: &str) {}
    fn on_command_complete(&mut self, _phase: Phase, _name: &str, _outcomes: &[UnitOutcome]) {}
    fn on_command_skipped(&mut self, _phase: Phase, _name: &str, _reason: &str) {}
    fn on_run_complete(&mut self, _phase: Phase, _summary: &ExecuteSummary) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}
