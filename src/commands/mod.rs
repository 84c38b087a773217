//! Subcommand implementations

pub mod deploy;
pub mod plan;

use crate::Context;
use crate::config::AppConfig;
use crate::engine::CommandContext;
use crate::paths;
use anyhow::Result;
use declarative::TokenTable;
use manage::{HttpManageClient, ManageApi};
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration and where it came from
pub struct LoadedConfig {
    pub file: PathBuf,
    pub config: AppConfig,
}

pub fn load_config(ctx: &Context) -> Result<LoadedConfig> {
    let file = paths::config_file(ctx.config.as_deref())?;
    let base = paths::base_dir(&file)?;
    let config = AppConfig::load_or_default(&file, &base)?;
    Ok(LoadedConfig { file, config })
}

/// Context and seeded tokens for a run against the configured cluster
pub fn connect(config: AppConfig) -> Result<(CommandContext, TokenTable)> {
    let tokens = config.seed_tokens()?;
    log::info!("Connecting to {}", config.client_config().manage_base());
    let api: Arc<dyn ManageApi> = Arc::new(HttpManageClient::new(config.client_config()));
    Ok((CommandContext::new(config, api), tokens))
}
