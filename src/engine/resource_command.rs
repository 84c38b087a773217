//! Generic per-kind command
//!
//! Most kinds deploy the same way: resolve their directories, parse every
//! file, save it through a manager for the unit's scope. Each kind is one row
//! of the table in [`ResourceCommand::for_kind`].

use super::CommandContext;
use super::resolver::{self, ResolvedUnit};
use super::sort_order;
use crate::resource::{
    ResourceKind, ResourceManager, ResourcePayload, RestResourceManager, Scope,
    is_missing_dependency,
};
use anyhow::{Context, Result};
use declarative::{Command, TokenTable, UnitOutcome};
use log::{debug, info, warn};

/// Database a unit without a per-database directory is sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefaultDatabase {
    None,
    Content,
    Triggers,
    Flexrep,
}

/// How definitions are laid out in a configuration directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// `<root>/<kind dir>` only
    Global,
    /// `<root>/<kind dir>` and `<root>/databases/<db>/<kind dir>`
    WithDatabaseDirs,
    /// `<root>/<kind dir>/<parent><suffix>`
    Suffixed,
}

pub struct ResourceCommand {
    name: &'static str,
    kind: ResourceKind,
    sort_order: i32,
    layout: Layout,
    default_database: DefaultDatabase,
    delete_on_undo: bool,
    store_ids_as_tokens: bool,
}

impl ResourceCommand {
    /// The table row for a kind. Databases and REST APIs have their own commands.
    pub fn for_kind(kind: ResourceKind) -> Option<Self> {
        use DefaultDatabase as Db;

        let row = |name, sort_order, layout, default_database| Self {
            name,
            kind,
            sort_order,
            layout,
            default_database,
            delete_on_undo: true,
            store_ids_as_tokens: false,
        };

        let command = match kind {
            ResourceKind::Database | ResourceKind::RestApi => return None,
            ResourceKind::Role => row(
                "deploy-roles",
                sort_order::DEPLOY_ROLES,
                Layout::Global,
                Db::None,
            ),
            ResourceKind::Group => row(
                "deploy-groups",
                sort_order::DEPLOY_GROUPS,
                Layout::Global,
                Db::None,
            ),
            ResourceKind::Privilege => row(
                "deploy-privileges",
                sort_order::DEPLOY_PRIVILEGES,
                Layout::Global,
                Db::None,
            ),
            ResourceKind::Amp => row(
                "deploy-amps",
                sort_order::DEPLOY_AMPS,
                Layout::Global,
                Db::None,
            ),
            ResourceKind::User => row(
                "deploy-users",
                sort_order::DEPLOY_USERS,
                Layout::Global,
                Db::None,
            ),
            ResourceKind::CertificateTemplate => Self {
                store_ids_as_tokens: true,
                ..row(
                    "deploy-certificate-templates",
                    sort_order::DEPLOY_CERTIFICATE_TEMPLATES,
                    Layout::Global,
                    Db::None,
                )
            },
            ResourceKind::Server => row(
                "deploy-servers",
                sort_order::DEPLOY_SERVERS,
                Layout::Global,
                Db::None,
            ),
            ResourceKind::Trigger => Self {
                delete_on_undo: false,
                ..row(
                    "deploy-triggers",
                    sort_order::DEPLOY_TRIGGERS,
                    Layout::WithDatabaseDirs,
                    Db::Triggers,
                )
            },
            ResourceKind::AlertConfig => Self {
                delete_on_undo: false,
                ..row(
                    "deploy-alert-configs",
                    sort_order::DEPLOY_ALERT_CONFIGS,
                    Layout::WithDatabaseDirs,
                    Db::Content,
                )
            },
            ResourceKind::FlexrepConfig => row(
                "deploy-flexrep-configs",
                sort_order::DEPLOY_FLEXREP_CONFIGS,
                Layout::WithDatabaseDirs,
                Db::Flexrep,
            ),
            ResourceKind::FlexrepTarget => row(
                "deploy-flexrep-targets",
                sort_order::DEPLOY_FLEXREP_TARGETS,
                Layout::Suffixed,
                Db::Flexrep,
            ),
        };
        Some(command)
    }

    fn resolve(&self, ctx: &CommandContext) -> Result<Vec<ResolvedUnit>> {
        let dirs = ctx.config_dirs();
        let path = self.kind.config_path();
        match self.layout {
            Layout::Global => resolver::resolve(&dirs, path, false),
            Layout::WithDatabaseDirs => resolver::resolve(&dirs, path, true),
            Layout::Suffixed => {
                resolver::resolve_suffixed(&dirs, path, &ctx.config.flexrep_targets_suffix)
            }
        }
    }

    /// Fill in the default database when the unit does not name one
    fn effective_scope(&self, ctx: &CommandContext, unit: &ResolvedUnit) -> Scope {
        let mut scope = unit.scope.clone();
        if scope.database.is_none() {
            scope.database = match self.default_database {
                DefaultDatabase::None => None,
                DefaultDatabase::Content => Some(ctx.config.content_database_name()),
                DefaultDatabase::Triggers => Some(ctx.config.triggers_database_name()),
                DefaultDatabase::Flexrep => Some(ctx.config.flexrep_database_name()),
            };
        }
        scope
    }

    fn manager(&self, ctx: &CommandContext, unit: &ResolvedUnit) -> Result<RestResourceManager> {
        RestResourceManager::new(ctx.api.clone(), self.kind, self.effective_scope(ctx, unit))
    }

    fn deploy_unit(
        &self,
        ctx: &CommandContext,
        unit: &ResolvedUnit,
        tokens: &mut TokenTable,
        outcomes: &mut Vec<UnitOutcome>,
    ) -> Result<()> {
        let manager = self.manager(ctx, unit)?;
        for file in resolver::list_resource_files(&unit.path)? {
            let payload = ResourcePayload::from_file(self.kind, &file, tokens)?;
            let name = payload.name()?;
            let result = manager
                .save(&payload)
                .with_context(|| format!("Failed to deploy {} from {}", self.kind, file.display()))?;

            if self.store_ids_as_tokens
                && let Some(id) = manager.resource_id(&name)?
            {
                let key = format!("{}-id:{name}", self.kind);
                debug!("Recording token ${{{key}}}");
                tokens.insert(key, id)?;
            }

            outcomes.push(UnitOutcome::new(format!("{}:{name}", self.kind), result));
        }
        Ok(())
    }

    fn undo_unit(
        &self,
        ctx: &CommandContext,
        unit: &ResolvedUnit,
        tokens: &TokenTable,
        outcomes: &mut Vec<UnitOutcome>,
    ) -> Result<()> {
        let manager = self.manager(ctx, unit)?;
        let mut files = resolver::list_resource_files(&unit.path)?;
        files.reverse();
        for file in files {
            let payload = ResourcePayload::from_file(self.kind, &file, tokens)?;
            let name = payload.name()?;
            let result = manager
                .delete(&name)
                .with_context(|| format!("Failed to undo {} from {}", self.kind, file.display()))?;
            outcomes.push(UnitOutcome::new(format!("{}:{name}", self.kind), result));
        }
        Ok(())
    }

    fn skip(&self, unit: &ResolvedUnit, err: &anyhow::Error) -> UnitOutcome {
        warn!(
            "Skipping {} in {}: {err:#}",
            self.kind,
            unit.path.display()
        );
        UnitOutcome::skipped(
            unit.path.display().to_string(),
            format!("database for {} does not exist", self.kind),
        )
    }
}

impl Command<CommandContext> for ResourceCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn sort_order(&self) -> i32 {
        self.sort_order
    }

    fn delete_resources_on_undo(&self) -> bool {
        self.delete_on_undo
    }

    fn execute(&self, ctx: &CommandContext, tokens: &mut TokenTable) -> Result<Vec<UnitOutcome>> {
        let units = self.resolve(ctx)?;
        if units.is_empty() {
            debug!("No {} definitions found", self.kind);
            return Ok(Vec::new());
        }

        let mut outcomes = Vec::new();
        for unit in &units {
            info!("Deploying {} definitions from {}", self.kind, unit.path.display());
            match self.deploy_unit(ctx, unit, tokens, &mut outcomes) {
                Ok(()) => {}
                Err(err) if is_missing_dependency(&err) => outcomes.push(self.skip(unit, &err)),
                Err(err) => return Err(err),
            }
        }
        Ok(outcomes)
    }

    fn undo(&self, ctx: &CommandContext, tokens: &mut TokenTable) -> Result<Vec<UnitOutcome>> {
        let mut units = self.resolve(ctx)?;
        units.reverse();

        let mut outcomes = Vec::new();
        for unit in &units {
            match self.undo_unit(ctx, unit, tokens, &mut outcomes) {
                Ok(()) => {}
                Err(err) if is_missing_dependency(&err) => outcomes.push(self.skip(unit, &err)),
                Err(err) => return Err(err),
            }
        }
        Ok(outcomes)
    }
}
