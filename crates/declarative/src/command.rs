//! Command trait
//!
//! A command owns the lifecycle of one kind of thing on the remote system:
//! resolve its definitions, apply them, and remove them again on undo.

use crate::tokens::TokenTable;
use crate::types::UnitOutcome;
use anyhow::Result;

/// One orderable step of a deployment
///
/// `C` is the run context handed to every command; it is built once per run
/// and never mutated. The token table is the only state commands share.
///
/// Errors returned from `execute` or `undo` are fatal and abort the run.
/// Recoverable conditions are reported as skipped [`UnitOutcome`]s instead.
pub trait Command<C>: Send + Sync {
    /// Name used in logs, progress output and `--only` filters
    fn name(&self) -> &str;

    /// Position in the deploy order; lower runs first
    fn sort_order(&self) -> i32;

    /// Whether `undo` should run for this command
    ///
    /// Kinds that live inside a database are removed with it, so their
    /// commands return false.
    fn delete_resources_on_undo(&self) -> bool {
        true
    }

    /// Apply everything this command manages
    fn execute(&self, ctx: &C, tokens: &mut TokenTable) -> Result<Vec<UnitOutcome>>;

    /// Remove everything this command manages
    fn undo(&self, ctx: &C, tokens: &mut TokenTable) -> Result<Vec<UnitOutcome>>;
}

/// A boxed command for type-erased storage
pub type BoxedCommand<C> = Box<dyn Command<C>>;
