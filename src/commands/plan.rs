//! `plan`: the command order a run would follow.
//!
//! The cluster is only contacted with `--remote`, to list what already exists.

use super::{connect, load_config};
use crate::Context;
use crate::cli::PlanArgs;
use crate::engine::{self, Deployer};
use crate::resource::{ResourceKind, ResourceManager, RestApiManager, RestResourceManager, Scope};
use crate::ui;
use anyhow::{Context as _, Result};
use colored::Colorize;
use manage::ManageApi;
use std::sync::Arc;

/// One line of the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand {
    pub name: String,
    pub sort_order: i32,
    /// Undo passes over this command
    pub retained: bool,
}

pub fn plan_for(deployer: &Deployer, undo: bool) -> Vec<PlannedCommand> {
    let order = if undo {
        deployer.undo_order()
    } else {
        deployer.deploy_order()
    };
    order
        .into_iter()
        .map(|command| PlannedCommand {
            name: command.name().to_string(),
            sort_order: command.sort_order(),
            retained: undo && !command.delete_resources_on_undo(),
        })
        .collect()
}

/// Names of existing instances of every kind that is not owned by a database
pub fn remote_inventory(api: &Arc<dyn ManageApi>) -> Result<Vec<(ResourceKind, Vec<String>)>> {
    let mut inventory = Vec::new();
    for kind in ResourceKind::ALL {
        if kind.is_database_scoped() {
            continue;
        }
        let manager: Box<dyn ResourceManager> = if kind == ResourceKind::RestApi {
            Box::new(RestApiManager::new(api.clone()))
        } else {
            Box::new(RestResourceManager::new(api.clone(), kind, Scope::global())?)
        };
        let names = manager
            .list()
            .with_context(|| format!("Unable to list {}", manager.kind()))?;
        inventory.push((manager.kind(), names));
    }
    Ok(inventory)
}

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let loaded = load_config(ctx)?;
    let config = &loaded.config;

    ui::header(&format!(
        "{} plan for {}",
        if args.undo { "Undo" } else { "Deploy" },
        config.name
    ));
    ui::kv("config", &loaded.file.display().to_string());
    for dir in &config.config_dirs {
        ui::kv("config dir", &dir.display().to_string());
    }
    for path in &config.schema_paths {
        ui::kv("schema path", &path.display().to_string());
    }
    for path in &config.module_paths {
        ui::kv("module path", &path.display().to_string());
    }
    ui::kv("content database", &config.content_database_name());
    ui::kv("schemas database", &config.schemas_database_name());
    ui::kv("triggers database", &config.triggers_database_name());
    ui::kv("modules database", &config.modules_database_name());
    println!();

    for (index, planned) in plan_for(&engine::deployer(&args.only), args.undo)
        .iter()
        .enumerate()
    {
        let line = format!(
            "{:>3}. {:<32} {}",
            index + 1,
            planned.name,
            format!("order {}", planned.sort_order).dimmed()
        );
        if planned.retained {
            println!("  {} {}", line.dimmed(), "(kept, removed with its database)".yellow());
        } else {
            println!("  {line}");
        }
    }

    if args.remote {
        let (command_ctx, _tokens) = connect(loaded.config)?;
        ui::header("On the cluster");
        for (kind, names) in remote_inventory(&command_ctx.api)? {
            let value = if names.is_empty() {
                "none".dimmed().to_string()
            } else {
                names.join(", ")
            };
            ui::kv(kind.label(), &value);
        }
    }
    Ok(())
}
