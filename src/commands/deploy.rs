//! `deploy` and `undo`

use super::{connect, load_config};
use crate::Context;
use crate::cli::{DeployArgs, UndoArgs};
use crate::engine::{self, CommandContext};
use crate::progress::ConsoleProgress;
use crate::ui;
use anyhow::Result;
use declarative::{
    AutoConfirm, ConfirmCallback, ExecuteSummary, ProgressCallback, TokenTable,
};

/// Confirmation through an interactive terminal prompt
pub struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;

        Ok(confirmed)
    }
}

pub fn deploy(ctx: &Context, args: DeployArgs) -> Result<()> {
    let loaded = load_config(ctx)?;
    if !ctx.quiet {
        ui::header(&format!("Deploying {}", loaded.config.name));
        ui::kv("config", &loaded.file.display().to_string());
    }

    let (command_ctx, mut tokens) = connect(loaded.config)?;
    let mut progress = ConsoleProgress::new(ctx.quiet, ctx.verbose > 0);
    run_deploy(&command_ctx, &mut tokens, &args.only, &mut progress)?;
    Ok(())
}

pub fn undo(ctx: &Context, args: UndoArgs) -> Result<()> {
    let loaded = load_config(ctx)?;
    if !ctx.quiet {
        ui::header(&format!("Undoing {}", loaded.config.name));
        ui::kv("config", &loaded.file.display().to_string());
    }

    let (command_ctx, mut tokens) = connect(loaded.config)?;
    let mut progress = ConsoleProgress::new(ctx.quiet, ctx.verbose > 0);
    let summary = if args.yes {
        run_undo(&command_ctx, &mut tokens, &args.only, &mut AutoConfirm, &mut progress)?
    } else {
        run_undo(&command_ctx, &mut tokens, &args.only, &mut PromptConfirm, &mut progress)?
    };

    if summary.is_none() {
        ui::warn("Undo cancelled, nothing was removed");
    }
    Ok(())
}

/// Deploy with the built-in commands, limited to `only` when not empty
pub fn run_deploy<P: ProgressCallback>(
    command_ctx: &CommandContext,
    tokens: &mut TokenTable,
    only: &[String],
    progress: &mut P,
) -> Result<ExecuteSummary> {
    let deployer = engine::deployer(only);
    if deployer.is_empty() {
        anyhow::bail!("No commands match --only {}", only.join(","));
    }
    deployer.deploy(command_ctx, tokens, progress)
}

/// Undo after confirmation; `None` when the user declined
pub fn run_undo<F: ConfirmCallback, P: ProgressCallback>(
    command_ctx: &CommandContext,
    tokens: &mut TokenTable,
    only: &[String],
    confirm: &mut F,
    progress: &mut P,
) -> Result<Option<ExecuteSummary>> {
    let deployer = engine::deployer(only);
    if deployer.is_empty() {
        anyhow::bail!("No commands match --only {}", only.join(","));
    }

    let prompt = format!(
        "Remove resources of {} from the cluster?",
        command_ctx.config.name
    );
    if !confirm.confirm(&prompt)? {
        return Ok(None);
    }
    deployer.undo(command_ctx, tokens, progress).map(Some)
}
