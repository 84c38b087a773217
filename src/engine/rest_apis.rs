//! REST API servers, one `rest-api.json` per configuration directory

use super::CommandContext;
use super::sort_order;
use crate::resource::{ResourceKind, ResourceManager, ResourcePayload, RestApiManager};
use anyhow::{Context, Result};
use declarative::{Command, TokenTable, UnitOutcome};
use std::path::PathBuf;

pub struct DeployRestApisCommand;

impl DeployRestApisCommand {
    fn definition_files(ctx: &CommandContext) -> Vec<PathBuf> {
        ctx.config_dirs()
            .iter()
            .map(|dir| dir.root().join(ResourceKind::RestApi.config_path()))
            .filter(|path| path.is_file())
            .collect()
    }

    fn manager(ctx: &CommandContext) -> RestApiManager {
        let options = &ctx.config.rest_api;
        RestApiManager::new(ctx.api.clone()).with_includes(options.delete_content, options.delete_modules)
    }
}

impl Command<CommandContext> for DeployRestApisCommand {
    fn name(&self) -> &str {
        "deploy-rest-apis"
    }

    fn sort_order(&self) -> i32 {
        sort_order::DEPLOY_REST_APIS
    }

    fn execute(&self, ctx: &CommandContext, tokens: &mut TokenTable) -> Result<Vec<UnitOutcome>> {
        let manager = Self::manager(ctx);
        let mut outcomes = Vec::new();
        for file in Self::definition_files(ctx) {
            let payload = ResourcePayload::from_file(ResourceKind::RestApi, &file, tokens)?;
            let name = payload.name()?;
            let result = manager
                .save(&payload)
                .with_context(|| format!("Failed to deploy REST API from {}", file.display()))?;
            outcomes.push(UnitOutcome::new(format!("rest-api:{name}"), result));
        }
        Ok(outcomes)
    }

    fn undo(&self, ctx: &CommandContext, tokens: &mut TokenTable) -> Result<Vec<UnitOutcome>> {
        let manager = Self::manager(ctx);
        let mut files = Self::definition_files(ctx);
        files.reverse();

        let mut outcomes = Vec::new();
        for file in files {
            let payload = ResourcePayload::from_file(ResourceKind::RestApi, &file, tokens)?;
            let name = payload.name()?;
            let result = manager.delete(&name)?;
            outcomes.push(UnitOutcome::new(format!("rest-api:{name}"), result));
        }
        Ok(outcomes)
    }
}
