use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "appdeployer")]
#[command(version)]
#[command(about = "Deploy application resources to a document-database cluster", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (default: $APPDEPLOYER_CONFIG or ./appdeployer.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or update every resource in dependency order
    Deploy(DeployArgs),

    /// Remove deployed resources in reverse order
    Undo(UndoArgs),

    /// Show the commands a deploy or undo would run
    Plan(PlanArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct DeployArgs {
    /// Only run these commands (e.g. deploy-roles, load-schemas)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

#[derive(Parser)]
pub struct UndoArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Only undo these commands
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Show undo order instead of deploy order
    #[arg(long)]
    pub undo: bool,

    /// Only include these commands
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Also list what currently exists on the cluster
    #[arg(long)]
    pub remote: bool,
}
