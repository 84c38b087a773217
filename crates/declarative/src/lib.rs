//! # Declarative
//!
//! Ordered, reversible command orchestration.
//!
//! A deployment is a set of [`Command`]s, each owning one kind of remote
//! resource. The [`AppDeployer`] runs them one at a time in ascending sort
//! order and can walk the same set backwards to undo a deployment.
//!
//! ## Core Concepts
//!
//! - **Command**: Applies and removes one kind of thing (roles, databases, ...)
//! - **AppDeployer**: Orders commands, runs deploy or undo, aborts on the first error
//! - **TokenTable**: Write-once values recorded by earlier commands for later payloads
//! - **UnitOutcome**: What happened to one unit (created, unchanged, skipped, ...)
//!
//! ## Example
//!
//! ```
//! use declarative::{AppDeployer, ApplyResult, Command, NoProgress, TokenTable, UnitOutcome};
//!
//! struct Greet;
//!
//! impl Command<String> for Greet {
//!     fn name(&self) -> &str { "greet" }
//!     fn sort_order(&self) -> i32 { 10 }
//!
//!     fn execute(&self, ctx: &String, _tokens: &mut TokenTable) -> anyhow::Result<Vec<UnitOutcome>> {
//!         Ok(vec![UnitOutcome::new(ctx.clone(), ApplyResult::Created)])
//!     }
//!
//!     fn undo(&self, ctx: &String, _tokens: &mut TokenTable) -> anyhow::Result<Vec<UnitOutcome>> {
//!         Ok(vec![UnitOutcome::new(ctx.clone(), ApplyResult::Removed)])
//!     }
//! }
//!
//! let mut deployer = AppDeployer::new();
//! deployer.add_command(Greet);
//!
//! let summary = deployer
//!     .deploy(&"hello".to_string(), &mut TokenTable::new(), &mut NoProgress)
//!     .unwrap();
//! assert_eq!(summary.created, 1);
//! ```
//!
//! ## Provider Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod command;
pub mod context;
pub mod deployer;
pub mod tokens;
pub mod types;

// Re-export main types at crate root
pub use command::{BoxedCommand, Command};
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use deployer::AppDeployer;
pub use tokens::{TokenError, TokenTable};
pub use types::{ApplyResult, ExecuteSummary, Phase, UnitOutcome};
