//! Databases
//!
//! Definitions are read from `databases/` in every configuration directory.
//! A later definition of the same database replaces an earlier one. Databases
//! referenced by another database's `schema-database`, `triggers-database` or
//! `security-database` are deployed first and removed last.

use super::CommandContext;
use super::resolver;
use super::sort_order;
use crate::resource::{ResourceKind, ResourceManager, ResourcePayload, RestResourceManager, Scope};
use anyhow::{Context, Result, bail};
use declarative::{Command, TokenTable, UnitOutcome};
use log::{debug, warn};

/// Fields through which one database depends on another
pub const DEPENDENCY_FIELDS: [&str; 3] = ["schema-database", "triggers-database", "security-database"];

pub struct DeployDatabasesCommand;

/// One definition per database name, in first-seen order, later files winning
pub fn database_definitions(
    ctx: &CommandContext,
    tokens: &TokenTable,
) -> Result<Vec<(String, ResourcePayload)>> {
    let mut definitions: Vec<(String, ResourcePayload)> = Vec::new();
    for dir in ctx.config_dirs() {
        for file in resolver::list_resource_files(&dir.databases_dir())? {
            let payload = ResourcePayload::from_file(ResourceKind::Database, &file, tokens)?;
            let name = payload.name()?;
            match definitions.iter_mut().find(|(existing, _)| *existing == name) {
                Some(entry) => {
                    debug!("Database {name} redefined in {}, using it", file.display());
                    entry.1 = payload;
                }
                None => definitions.push((name, payload)),
            }
        }
    }
    Ok(definitions)
}

/// Order definitions so every referenced database comes before its dependents.
///
/// Stable: among databases whose dependencies are satisfied, the earliest
/// defined goes first. References to databases not defined here are ignored.
pub fn dependency_order(
    definitions: Vec<(String, ResourcePayload)>,
) -> Result<Vec<(String, ResourcePayload)>> {
    let names: Vec<String> = definitions.iter().map(|(name, _)| name.clone()).collect();
    let dependencies: Vec<Vec<usize>> = definitions
        .iter()
        .map(|(name, payload)| {
            DEPENDENCY_FIELDS
                .iter()
                .filter_map(|field| payload.field(field))
                .filter(|dep| dep != name)
                .filter_map(|dep| names.iter().position(|n| *n == dep))
                .collect()
        })
        .collect();

    let mut emitted = vec![false; names.len()];
    let mut order = Vec::with_capacity(names.len());
    while order.len() < names.len() {
        let next = (0..names.len())
            .find(|&i| !emitted[i] && dependencies[i].iter().all(|&d| emitted[d]));
        match next {
            Some(i) => {
                emitted[i] = true;
                order.push(i);
            }
            None => {
                let cycle: Vec<&str> = (0..names.len())
                    .filter(|&i| !emitted[i])
                    .map(|i| names[i].as_str())
                    .collect();
                bail!("Circular dependency between databases: {}", cycle.join(", "));
            }
        }
    }

    let mut slots: Vec<Option<(String, ResourcePayload)>> =
        definitions.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

/// Name of the first defined database whose `field` equals `value`.
///
/// Files that cannot be read are logged and passed over.
pub fn find_database_referencing(
    ctx: &CommandContext,
    tokens: &TokenTable,
    field: &str,
    value: &str,
) -> Option<String> {
    for dir in ctx.config_dirs() {
        let files = match resolver::list_resource_files(&dir.databases_dir()) {
            Ok(files) => files,
            Err(err) => {
                warn!("Unable to list database definitions: {err:#}");
                continue;
            }
        };
        for file in files {
            let payload = match ResourcePayload::from_file(ResourceKind::Database, &file, tokens) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!("Unable to read {} while looking for {field} {value}: {err:#}", file.display());
                    continue;
                }
            };
            if payload.field(field).as_deref() == Some(value) {
                match payload.name() {
                    Ok(name) => return Some(name),
                    Err(err) => warn!("{err}"),
                }
            }
        }
    }
    None
}

impl DeployDatabasesCommand {
    fn ordered(ctx: &CommandContext, tokens: &TokenTable) -> Result<Vec<(String, ResourcePayload)>> {
        dependency_order(database_definitions(ctx, tokens)?)
    }

    fn manager(ctx: &CommandContext) -> Result<RestResourceManager> {
        RestResourceManager::new(ctx.api.clone(), ResourceKind::Database, Scope::global())
    }
}

impl Command<CommandContext> for DeployDatabasesCommand {
    fn name(&self) -> &str {
        "deploy-databases"
    }

    fn sort_order(&self) -> i32 {
        sort_order::DEPLOY_DATABASES
    }

    fn execute(&self, ctx: &CommandContext, tokens: &mut TokenTable) -> Result<Vec<UnitOutcome>> {
        let manager = Self::manager(ctx)?;
        let mut outcomes = Vec::new();
        for (name, payload) in Self::ordered(ctx, tokens)? {
            let result = manager
                .save(&payload)
                .with_context(|| format!("Failed to deploy database from {}", payload.origin()))?;
            outcomes.push(UnitOutcome::new(format!("database:{name}"), result));
        }
        Ok(outcomes)
    }

    fn undo(&self, ctx: &CommandContext, tokens: &mut TokenTable) -> Result<Vec<UnitOutcome>> {
        let manager = Self::manager(ctx)?;
        let mut ordered = Self::ordered(ctx, tokens)?;
        ordered.reverse();

        let mut outcomes = Vec::new();
        for (name, _) in ordered {
            let result = manager.delete(&name)?;
            outcomes.push(UnitOutcome::new(format!("database:{name}"), result));
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{context, write};
    use declarative::ApplyResult;
    use manage::{Call, MockManageApi, Payload};

    fn definition(body: &str) -> (String, ResourcePayload) {
        let payload = ResourcePayload::new(ResourceKind::Database, Payload::json(body));
        (payload.name().unwrap(), payload)
    }

    fn names(defs: &[(String, ResourcePayload)]) -> Vec<&str> {
        defs.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[test]
    fn test_dependencies_first() {
        let ordered = dependency_order(vec![
            definition(r#"{"database-name": "content", "schema-database": "schemas", "triggers-database": "triggers"}"#),
            definition(r#"{"database-name": "schemas"}"#),
            definition(r#"{"database-name": "triggers", "schema-database": "schemas"}"#),
        ])
        .unwrap();
        assert_eq!(names(&ordered), vec!["schemas", "triggers", "content"]);
    }

    #[test]
    fn test_independent_databases_keep_order() {
        let ordered = dependency_order(vec![
            definition(r#"{"database-name": "b"}"#),
            definition(r#"{"database-name": "a", "schema-database": "Schemas"}"#),
            definition(r#"{"database-name": "c", "schema-database": "c"}"#),
        ])
        .unwrap();
        assert_eq!(names(&ordered), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_cycle_is_fatal() {
        let err = dependency_order(vec![
            definition(r#"{"database-name": "a", "schema-database": "b"}"#),
            definition(r#"{"database-name": "b", "triggers-database": "a"}"#),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("a, b"));
    }

    #[test]
    fn test_last_definition_wins() {
        let temp = tempfile::tempdir().unwrap();
        let first = temp.path().join("base");
        let second = temp.path().join("overrides");
        write(
            &first.join("databases/content.json"),
            r#"{"database-name": "app-content", "description": "base"}"#,
        );
        write(
            &second.join("databases/content-db.json"),
            r#"{"database-name": "app-content", "description": "override"}"#,
        );

        let api = MockManageApi::new();
        let ctx = context(&[&first, &second], &api);
        let outcomes = DeployDatabasesCommand
            .execute(&ctx, &mut TokenTable::new())
            .unwrap();

        assert_eq!(
            outcomes,
            vec![UnitOutcome::new("database:app-content", ApplyResult::Created)]
        );
        let stored = api.resource("/manage/v2/databases", "app-content").unwrap();
        assert!(stored.body.contains("override"));
    }

    #[test]
    fn test_undo_reverse_dependency_order() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(
            &root.join("databases/a-content.json"),
            r#"{"database-name": "app-content", "schema-database": "app-schemas"}"#,
        );
        write(
            &root.join("databases/b-schemas.json"),
            r#"{"database-name": "app-schemas"}"#,
        );

        let api = MockManageApi::new();
        let ctx = context(&[root], &api);
        DeployDatabasesCommand
            .execute(&ctx, &mut TokenTable::new())
            .unwrap();
        assert_eq!(
            api.calls(),
            vec![
                Call::Create {
                    collection: "/manage/v2/databases".to_string(),
                    name: "app-schemas".to_string()
                },
                Call::Create {
                    collection: "/manage/v2/databases".to_string(),
                    name: "app-content".to_string()
                },
            ]
        );

        api.clear_calls();
        DeployDatabasesCommand
            .undo(&ctx, &mut TokenTable::new())
            .unwrap();
        assert_eq!(
            api.calls(),
            vec![
                Call::Delete {
                    collection: "/manage/v2/databases".to_string(),
                    name: "app-content".to_string()
                },
                Call::Delete {
                    collection: "/manage/v2/databases".to_string(),
                    name: "app-schemas".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_find_database_referencing_first_match() {
        let temp = tempfile::tempdir().unwrap();
        let first = temp.path().join("one");
        let second = temp.path().join("two");
        write(&first.join("databases/bad.json"), "{ not json");
        write(
            &first.join("databases/content.json"),
            r#"{"database-name": "first-content", "schema-database": "app-schemas"}"#,
        );
        write(
            &second.join("databases/content.json"),
            r#"{"database-name": "second-content", "schema-database": "app-schemas"}"#,
        );

        let api = MockManageApi::new();
        let ctx = context(&[&first, &second], &api);
        let tokens = TokenTable::new();

        assert_eq!(
            find_database_referencing(&ctx, &tokens, "schema-database", "app-schemas").as_deref(),
            Some("first-content")
        );
        assert_eq!(
            find_database_referencing(&ctx, &tokens, "schema-database", "other"),
            None
        );
    }
}
