//! Console progress for deploy and undo runs.
//!
//! A spinner shows the running command; each finished command leaves one
//! status line behind.

use colored::Colorize;
use declarative::{ApplyResult, ExecuteSummary, Phase, ProgressCallback, UnitOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct ConsoleProgress {
    quiet: bool,
    verbose: bool,
    total: usize,
    position: usize,
    spinner: Option<ProgressBar>,
}

impl ConsoleProgress {
    pub fn new(quiet: bool, verbose: bool) -> Self {
        Self {
            quiet,
            verbose,
            total: 0,
            position: 0,
            spinner: None,
        }
    }

    fn finish_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    fn counter(&self) -> String {
        format!("[{}/{}]", self.position, self.total)
    }
}

/// Short description of what a command did, e.g. `2 created, 1 unchanged`
pub fn describe(outcomes: &[UnitOutcome]) -> String {
    if outcomes.is_empty() {
        return "nothing to do".to_string();
    }
    let mut summary = ExecuteSummary::default();
    summary.add_outcomes(outcomes);

    let mut parts = Vec::new();
    for (count, label) in [
        (summary.created, "created"),
        (summary.modified, "modified"),
        (summary.removed, "removed"),
        (summary.skipped, "skipped"),
        (summary.no_change, "unchanged"),
    ] {
        if count > 0 {
            parts.push(format!("{count} {label}"));
        }
    }
    parts.join(", ")
}

fn symbol(result: &ApplyResult) -> colored::ColoredString {
    match result {
        ApplyResult::NoChange => "○".dimmed(),
        ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => "✓".green(),
        ApplyResult::Skipped { .. } => "⊘".yellow(),
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_run_start(&mut self, phase: Phase, count: usize) {
        self.total = count;
        self.position = 0;
        if !self.quiet {
            println!();
            println!("  {} Running {count} {phase} commands", "→".cyan());
        }
    }

    fn on_command_start(&mut self, _phase: Phase, name: &str) {
        self.position += 1;
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.green} {prefix:.blue.bold} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_prefix(self.counter());
        pb.set_message(name.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(pb);
    }

    fn on_command_complete(&mut self, _phase: Phase, name: &str, outcomes: &[UnitOutcome]) {
        self.finish_spinner();
        if self.quiet {
            return;
        }
        let warned = outcomes.iter().any(|o| o.result.is_skipped());
        let mark = if warned { "⚠".yellow() } else { "✓".green() };
        println!(
            "  {mark} {} {name} {}",
            self.counter().blue().bold(),
            format!("({})", describe(outcomes)).dimmed()
        );

        for outcome in outcomes {
            if self.verbose || outcome.result.is_skipped() {
                println!(
                    "      {} {} {}",
                    symbol(&outcome.result),
                    outcome.id,
                    outcome.result.to_string().dimmed()
                );
            }
        }
    }

    fn on_command_skipped(&mut self, _phase: Phase, name: &str, reason: &str) {
        self.position += 1;
        if !self.quiet {
            println!(
                "  {} {} {name} {}",
                "⊘".dimmed(),
                self.counter().blue().bold(),
                format!("({reason})").dimmed()
            );
        }
    }

    fn on_run_complete(&mut self, phase: Phase, summary: &ExecuteSummary) {
        self.finish_spinner();
        if self.quiet {
            return;
        }

        println!();
        if summary.total_changes() == 0 && summary.skipped == 0 {
            println!("  {} Nothing changed, {phase} is up to date", "✓".green().bold());
        } else {
            println!("  {} {} complete", "✓".green().bold(), phase.to_string().bold());
        }
        if summary.created > 0 {
            println!("    • {} resources created", summary.created);
        }
        if summary.modified > 0 {
            println!("    • {} resources modified", summary.modified);
        }
        if summary.removed > 0 {
            println!("    • {} resources removed", summary.removed);
        }
        if summary.skipped > 0 {
            println!("    • {} {} skipped", summary.skipped, "units".yellow());
        }
    }
}

impl Drop for ConsoleProgress {
    fn drop(&mut self) {
        self.finish_spinner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_outcomes() {
        assert_eq!(describe(&[]), "nothing to do");
        let outcomes = vec![
            UnitOutcome::new("role:a", ApplyResult::Created),
            UnitOutcome::new("role:b", ApplyResult::Created),
            UnitOutcome::new("role:c", ApplyResult::NoChange),
            UnitOutcome::skipped("triggers", "database for trigger does not exist"),
        ];
        assert_eq!(describe(&outcomes), "2 created, 1 skipped, 1 unchanged");
    }

    #[test]
    fn test_quiet_progress_counts_commands() {
        let mut progress = ConsoleProgress::new(true, false);
        progress.on_run_start(Phase::Deploy, 2);
        progress.on_command_start(Phase::Deploy, "deploy-roles");
        progress.on_command_complete(Phase::Deploy, "deploy-roles", &[]);
        progress.on_command_skipped(Phase::Deploy, "load-schemas", "filtered");
        assert_eq!(progress.counter(), "[2/2]");
        assert!(progress.spinner.is_none());
    }
}
