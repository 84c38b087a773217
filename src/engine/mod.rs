//! Deployment engine
//!
//! Builds the command set for an application and the context every command
//! receives. The context is created once per deploy or undo and is never
//! mutated; the token table is the only state commands share.

use crate::config::AppConfig;
use declarative::{AppDeployer, BoxedCommand};
use manage::ManageApi;
use std::sync::Arc;

pub mod databases;
pub mod modules;
pub mod resolver;
pub mod resource_command;
pub mod rest_apis;
pub mod schemas;
pub mod sort_order;

use crate::resource::ResourceKind;
use databases::DeployDatabasesCommand;
use modules::LoadModulesCommand;
use resolver::ConfigDir;
use resource_command::ResourceCommand;
use rest_apis::DeployRestApisCommand;
use schemas::LoadSchemasCommand;

/// Shared, read-only state of one run
pub struct CommandContext {
    pub config: AppConfig,
    pub api: Arc<dyn ManageApi>,
}

impl CommandContext {
    pub fn new(config: AppConfig, api: Arc<dyn ManageApi>) -> Self {
        Self { config, api }
    }

    /// Configuration directories in processing order
    pub fn config_dirs(&self) -> Vec<ConfigDir> {
        self.config.config_dirs.iter().map(ConfigDir::new).collect()
    }
}

/// Orchestrator over the built-in commands
pub type Deployer = AppDeployer<CommandContext>;

/// Every built-in command
pub fn default_commands() -> Vec<BoxedCommand<CommandContext>> {
    let mut commands: Vec<BoxedCommand<CommandContext>> = vec![
        Box::new(DeployDatabasesCommand),
        Box::new(LoadModulesCommand),
        Box::new(DeployRestApisCommand),
        Box::new(LoadSchemasCommand),
    ];
    for kind in ResourceKind::ALL {
        if let Some(command) = ResourceCommand::for_kind(kind) {
            commands.push(Box::new(command));
        }
    }
    commands
}

/// Deployer with the built-in commands, optionally limited to the named ones
pub fn deployer(only: &[String]) -> Deployer {
    let mut deployer = Deployer::with_commands(default_commands());
    if !only.is_empty() {
        deployer.retain(|command| only.iter().any(|name| name == command.name()));
    }
    deployer
}


#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{NoProgress, TokenTable};
    use manage::MockManageApi;
    use testing::{context, write};

    #[test]
    fn test_command_names_unique() {
        let commands = default_commands();
        let mut names: Vec<_> = commands.iter().map(|c| c.name().to_string()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), commands.len());
    }

    #[test]
    fn test_deploy_order() {
        let deployer = deployer(&[]);
        let names: Vec<_> = deployer.deploy_order().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "deploy-groups",
                "deploy-roles",
                "deploy-privileges",
                "deploy-certificate-templates",
                "deploy-users",
                "deploy-amps",
                "deploy-databases",
                "load-modules",
                "deploy-rest-apis",
                "deploy-servers",
                "load-schemas",
                "deploy-triggers",
                "deploy-flexrep-configs",
                "deploy-flexrep-targets",
                "deploy-alert-configs",
            ]
        );
    }

    #[test]
    fn test_only_filter() {
        let deployer = deployer(&["deploy-roles".to_string(), "load-schemas".to_string()]);
        assert_eq!(deployer.len(), 2);
    }

    #[test]
    fn test_full_deploy_then_undo() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(
            &root.join("databases/content.json"),
            r#"{"database-name": "my-app-content", "triggers-database": "my-app-triggers"}"#,
        );
        write(
            &root.join("databases/triggers.json"),
            r#"{"database-name": "my-app-triggers"}"#,
        );
        write(&root.join("security/roles/reader.json"), r#"{"role-name": "reader"}"#);
        write(&root.join("triggers/t.json"), r#"{"name": "t"}"#);

        let api = MockManageApi::new();
        let ctx = context(&[root], &api);
        let deployer = deployer(&[]);

        let summary = deployer
            .deploy(&ctx, &mut TokenTable::new(), &mut NoProgress)
            .unwrap();
        assert_eq!(summary.created, 4);
        assert_eq!(summary.skipped, 0);

        let again = deployer
            .deploy(&ctx, &mut TokenTable::new(), &mut NoProgress)
            .unwrap();
        assert_eq!(again.total_changes(), 0);

        deployer
            .undo(&ctx, &mut TokenTable::new(), &mut NoProgress)
            .unwrap();
        assert!(!api.has_database("my-app-content"));
        assert!(!api.has_database("my-app-triggers"));
        assert!(api.names("/manage/v2/roles").is_empty());
    }
}
