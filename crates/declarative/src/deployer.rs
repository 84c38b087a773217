//! Orchestrator - runs registered commands in sort order, or in reverse for undo

use crate::command::{BoxedCommand, Command};
use crate::context::ProgressCallback;
use crate::tokens::TokenTable;
use crate::types::{ExecuteSummary, Phase};
use anyhow::{Context, Result};
use log::{debug, info};

/// Reason reported for commands that keep their resources on undo
const RETAINED_ON_UNDO: &str = "resources are removed with their database";

/// Ordered set of commands for one application
///
/// Commands run strictly one at a time. Deploy order is ascending
/// [`Command::sort_order`], ties broken by registration order. Undo walks the
/// exact reverse of that order.
///
/// The first error aborts the run. Commands that already ran are not rolled
/// back; re-running an idempotent deploy is the recovery path.
pub struct AppDeployer<C> {
    commands: Vec<BoxedCommand<C>>,
}

impl<C> Default for AppDeployer<C> {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
        }
    }
}

impl<C> AppDeployer<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commands(commands: Vec<BoxedCommand<C>>) -> Self {
        Self { commands }
    }

    /// Register a command after those already present
    pub fn add_command(&mut self, command: impl Command<C> + 'static) {
        self.commands.push(Box::new(command));
    }

    /// Keep only the commands the predicate accepts
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&dyn Command<C>) -> bool,
    {
        self.commands.retain(|command| keep(command.as_ref()));
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands in deploy order
    pub fn deploy_order(&self) -> Vec<&dyn Command<C>> {
        let mut order: Vec<&dyn Command<C>> = self.commands.iter().map(AsRef::as_ref).collect();
        order.sort_by_key(|command| command.sort_order());
        order
    }

    /// Commands in undo order
    pub fn undo_order(&self) -> Vec<&dyn Command<C>> {
        let mut order = self.deploy_order();
        order.reverse();
        order
    }

    /// Execute every command in ascending sort order
    pub fn deploy<P: ProgressCallback>(
        &self,
        ctx: &C,
        tokens: &mut TokenTable,
        progress: &mut P,
    ) -> Result<ExecuteSummary> {
        self.run(Phase::Deploy, ctx, tokens, progress)
    }

    /// Undo every command in descending sort order
    ///
    /// Commands whose [`Command::delete_resources_on_undo`] is false are
    /// reported as skipped and never called.
    pub fn undo<P: ProgressCallback>(
        &self,
        ctx: &C,
        tokens: &mut TokenTable,
        progress: &mut P,
    ) -> Result<ExecuteSummary> {
        self.run(Phase::Undo, ctx, tokens, progress)
    }

    fn run<P: ProgressCallback>(
        &self,
        phase: Phase,
        ctx: &C,
        tokens: &mut TokenTable,
        progress: &mut P,
    ) -> Result<ExecuteSummary> {
        let order = match phase {
            Phase::Deploy => self.deploy_order(),
            Phase::Undo => self.undo_order(),
        };

        let mut summary = ExecuteSummary::default();
        progress.on_run_start(phase, order.len());

        for command in order {
            let name = command.name();

            if phase == Phase::Undo && !command.delete_resources_on_undo() {
                debug!("Not undoing command [{name}]: {RETAINED_ON_UNDO}");
                progress.on_command_skipped(phase, name, RETAINED_ON_UNDO);
                summary.commands_skipped += 1;
                continue;
            }

            info!(
                "Running {phase} for command [{name}] with sort order [{}]",
                command.sort_order()
            );
            progress.on_command_start(phase, name);

            let outcomes = match phase {
                Phase::Deploy => command.execute(ctx, tokens),
                Phase::Undo => command.undo(ctx, tokens),
            }
            .with_context(|| format!("Command '{name}' failed during {phase}"))?;

            summary.add_outcomes(&outcomes);
            summary.commands_run += 1;
            progress.on_command_complete(phase, name, &outcomes);
        }

        progress.on_run_complete(phase, &summary);
        Ok(summary)
    }
}
