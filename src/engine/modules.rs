//! Asset loading into the modules database
//!
//! Each configured module path is walked like a schema path and every file is
//! written into the modules database with the configured default permissions
//! and collections, on top of whatever the directory's properties files add.

use super::CommandContext;
use super::schemas::{parse_permissions, read_documents};
use super::sort_order;
use crate::resource::is_missing_dependency;
use anyhow::{Context, Result};
use declarative::{ApplyResult, Command, TokenTable, UnitOutcome};
use log::{debug, info, warn};
use manage::Document;
use std::path::Path;

pub struct LoadModulesCommand;

impl LoadModulesCommand {
    fn load_path(
        ctx: &CommandContext,
        tokens: &TokenTable,
        path: &Path,
        database: &str,
    ) -> Result<Vec<UnitOutcome>> {
        let settings = &ctx.config.modules;
        let permissions = parse_permissions(&settings.permissions)
            .context("Invalid modules.permissions setting")?;

        let documents = read_documents(path, &settings.ignore_dirs, tokens)?;
        if documents.is_empty() {
            debug!("No modules found in {}", path.display());
            return Ok(Vec::new());
        }
        info!(
            "Loading {} modules from {} into {database}",
            documents.len(),
            path.display()
        );

        let mut outcomes = Vec::with_capacity(documents.len());
        for document in documents {
            let document = with_defaults(document, &permissions, &settings.collections);
            ctx.api
                .write_document(database, &document)
                .with_context(|| format!("Unable to load {} into {database}", document.uri))?;
            outcomes.push(UnitOutcome::new(
                format!("{database}:{}", document.uri),
                ApplyResult::Created,
            ));
        }
        Ok(outcomes)
    }
}

fn with_defaults(
    mut document: Document,
    permissions: &[(String, String)],
    collections: &[String],
) -> Document {
    for (role, capability) in permissions {
        document = document.with_permission(role.clone(), capability.clone());
    }
    for collection in collections {
        document = document.with_collection(collection.clone());
    }
    document
}

impl Command<CommandContext> for LoadModulesCommand {
    fn name(&self) -> &str {
        "load-modules"
    }

    fn sort_order(&self) -> i32 {
        sort_order::LOAD_MODULES
    }

    fn delete_resources_on_undo(&self) -> bool {
        false
    }

    fn execute(&self, ctx: &CommandContext, tokens: &mut TokenTable) -> Result<Vec<UnitOutcome>> {
        let database = ctx.config.modules_database_name();
        let mut outcomes = Vec::new();
        for path in &ctx.config.module_paths {
            if !path.exists() {
                debug!("Module path {} does not exist", path.display());
                continue;
            }
            match Self::load_path(ctx, tokens, path, &database) {
                Ok(loaded) => outcomes.extend(loaded),
                Err(err) if is_missing_dependency(&err) => {
                    warn!("Unable to load modules into {database}: no such database");
                    outcomes.push(UnitOutcome::skipped(
                        path.display().to_string(),
                        format!("database {database} does not exist"),
                    ));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(outcomes)
    }

    fn undo(&self, _ctx: &CommandContext, _tokens: &mut TokenTable) -> Result<Vec<UnitOutcome>> {
        debug!("Modules are removed with their database");
        Ok(Vec::new())
    }
}
