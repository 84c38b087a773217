//! Schema loading
//!
//! Every file under a schema path becomes a document whose URI is its path
//! relative to that root. Configured schema paths go to the schemas database;
//! `databases/<name>/schemas` directories go to `<name>`. Sources are loaded in
//! order, so a later source replaces an earlier document with the same URI.
//!
//! TDE templates are validated against the content database that uses the
//! target as its schema database, before they are written. Rulesets are
//! validated once a source has been loaded.

use super::CommandContext;
use super::databases::find_database_referencing;
use super::resolver::is_hidden;
use super::sort_order;
use crate::resource::is_missing_dependency;
use anyhow::{Context, Result, bail};
use declarative::{ApplyResult, Command, TokenTable, UnitOutcome};
use log::{debug, info, warn};
use manage::{Document, Format, TDE_COLLECTION};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Per-directory file assigning collections to documents
pub const COLLECTIONS_PROPERTIES: &str = "collections.properties";
/// Per-directory file granting `role,capability` pairs to documents
pub const PERMISSIONS_PROPERTIES: &str = "permissions.properties";

pub struct LoadSchemasCommand;

/// A directory tree and the database it is loaded into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSource {
    pub path: PathBuf,
    pub database: String,
}

/// Configured schema paths, then per-database schema directories
pub fn schema_sources(ctx: &CommandContext) -> Result<Vec<SchemaSource>> {
    let mut sources: Vec<SchemaSource> = ctx
        .config
        .schema_paths
        .iter()
        .map(|path| SchemaSource {
            path: path.clone(),
            database: ctx.config.schemas_database_name(),
        })
        .collect();

    for dir in ctx.config_dirs() {
        for (database, db_dir) in dir.database_resource_dirs()? {
            let path = db_dir.join("schemas");
            if path.is_dir() {
                sources.push(SchemaSource { path, database });
            }
        }
    }
    Ok(sources)
}

/// `file=v1,v2` lines; `*` applies to every file in the directory
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct PropertiesFile {
    entries: BTreeMap<String, Vec<String>>,
}

impl PropertiesFile {
    fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            entries.insert(key.trim().to_string(), split_list(value));
        }
        Self { entries }
    }

    fn read(dir: &Path, file_name: &str) -> Result<Self> {
        let path = dir.join(file_name);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    fn values_for(&self, file_name: &str) -> impl Iterator<Item = &String> {
        ["*", file_name]
            .into_iter()
            .filter_map(|key| self.entries.get(key))
            .flatten()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// `role,capability` pairs from a comma-separated list, e.g.
/// `rest-reader,read,rest-writer,update`. A trailing role without a
/// capability is an error.
pub fn parse_permissions(value: &str) -> Result<Vec<(String, String)>> {
    let items = split_list(value);
    if items.len() % 2 != 0 {
        bail!("Permissions must be role,capability pairs: '{value}'");
    }
    Ok(items
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}

/// Collections and permissions files of one directory
#[derive(Debug, Default)]
struct DirectoryProperties {
    collections: PropertiesFile,
    permissions: PropertiesFile,
}

impl DirectoryProperties {
    fn read(dir: &Path) -> Result<Self> {
        Ok(Self {
            collections: PropertiesFile::read(dir, COLLECTIONS_PROPERTIES)?,
            permissions: PropertiesFile::read(dir, PERMISSIONS_PROPERTIES)?,
        })
    }

    fn apply(&self, dir: &Path, file_name: &str, mut document: Document) -> Result<Document> {
        for collection in self.collections.values_for(file_name) {
            document = document.with_collection(collection.clone());
        }
        let permissions: Vec<String> = self.permissions.values_for(file_name).cloned().collect();
        let pairs = parse_permissions(&permissions.join(","))
            .with_context(|| format!("Invalid {}", dir.join(PERMISSIONS_PROPERTIES).display()))?;
        for (role, capability) in pairs {
            document = document.with_permission(role, capability);
        }
        Ok(document)
    }
}

/// Template-driven extraction files are loaded into the TDE collection
pub fn is_tde_template(uri: &str) -> bool {
    let lower = uri.to_ascii_lowercase();
    lower.ends_with(".tdex") || lower.ends_with(".tdej") || lower.contains("/tde/")
}

/// Documents under `root`, in walk order, with collections and permissions assigned
pub fn read_documents(root: &Path, ignore_dirs: &[String], tokens: &TokenTable) -> Result<Vec<Document>> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let ignored = entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| ignore_dirs.iter().any(|d| d == name));
            !(is_hidden(entry.path()) || ignored)
        });

    let mut properties: HashMap<PathBuf, DirectoryProperties> = HashMap::new();
    let mut documents = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("Could not walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            warn!("Skipping {}: file name is not UTF-8", entry.path().display());
            continue;
        };
        if file_name == COLLECTIONS_PROPERTIES || file_name == PERMISSIONS_PROPERTIES {
            continue;
        }

        let relative = entry.path().strip_prefix(root)?;
        let uri = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .fold(String::new(), |uri, part| format!("{uri}/{part}"));

        let raw = fs::read_to_string(entry.path())
            .with_context(|| format!("Could not read {}", entry.path().display()))?;
        let format = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(Format::Text, Format::from_extension);
        let mut document = Document::new(uri, tokens.substitute(&raw), format);

        let dir = entry.path().parent().unwrap_or(root).to_path_buf();
        if !properties.contains_key(&dir) {
            let read = DirectoryProperties::read(&dir)?;
            properties.insert(dir.clone(), read);
        }
        if let Some(props) = properties.get(&dir) {
            document = props.apply(&dir, file_name, document)?;
        }
        if is_tde_template(&document.uri) {
            document = document.with_collection(TDE_COLLECTION);
        }
        documents.push(document);
    }
    Ok(documents)
}

impl LoadSchemasCommand {
    fn load_source(
        ctx: &CommandContext,
        tokens: &TokenTable,
        source: &SchemaSource,
    ) -> Result<Vec<UnitOutcome>> {
        let settings = &ctx.config.schemas;
        let documents = read_documents(&source.path, &settings.ignore_dirs, tokens)?;
        if documents.is_empty() {
            debug!("No schemas found in {}", source.path.display());
            return Ok(Vec::new());
        }

        info!(
            "Loading {} schema documents from {} into {}",
            documents.len(),
            source.path.display(),
            source.database
        );

        let needs_content_database =
            settings.tde_validation && documents.iter().any(|d| is_tde_template(&d.uri));
        let content_database = if needs_content_database {
            let found =
                find_database_referencing(ctx, tokens, "schema-database", &source.database);
            if found.is_none() {
                warn!(
                    "No content database uses {} as its schema database; TDE templates will not be validated",
                    source.database
                );
            }
            found
        } else {
            None
        };

        let mut outcomes = Vec::with_capacity(documents.len());
        for document in &documents {
            if let Some(content_database) = &content_database
                && is_tde_template(&document.uri)
            {
                validate_template(ctx, content_database, document)?;
            }
            ctx.api
                .write_document(&source.database, document)
                .with_context(|| {
                    format!("Unable to load {} into {}", document.uri, source.database)
                })?;
            outcomes.push(UnitOutcome::new(
                format!("{}:{}", source.database, document.uri),
                ApplyResult::Created,
            ));
        }

        validate_rulesets(ctx, tokens, &source.database)?;
        Ok(outcomes)
    }
}

fn validate_template(ctx: &CommandContext, content_database: &str, document: &Document) -> Result<()> {
    match ctx.api.validate_tde(content_database, document) {
        Ok(()) => Ok(()),
        Err(manage::Error::ValidationFailed { code, message }) => {
            bail!("TDE template failed validation: {}: {code}: {message}", document.uri)
        }
        Err(err) if err.is_recoverable() => {
            warn!("Unable to validate TDE template {}: {err}", document.uri);
            Ok(())
        }
        Err(err) => Err(anyhow::Error::new(err)
            .context(format!("Unable to validate TDE template {}", document.uri))),
    }
}

/// Validate configured ruleset collections that exist in `database`.
///
/// Only a rejected rule is fatal; anything that prevents validation from
/// running is logged and validation is skipped.
fn validate_rulesets(ctx: &CommandContext, tokens: &TokenTable, database: &str) -> Result<()> {
    let settings = &ctx.config.schemas;
    if !settings.ruleset_validation || settings.ruleset_collections.is_empty() {
        return Ok(());
    }

    let existing = match ctx.api.collections(database) {
        Ok(collections) => collections,
        Err(err) => {
            warn!("Unable to read collections in {database}, skipping ruleset validation: {err}");
            return Ok(());
        }
    };

    let collections: Vec<String> = settings
        .ruleset_collections
        .iter()
        .filter(|c| existing.contains(*c))
        .cloned()
        .collect();
    if collections.is_empty() {
        debug!("No ruleset collections to validate in {database}");
        return Ok(());
    }

    let Some(content_database) = find_database_referencing(ctx, tokens, "schema-database", database)
    else {
        warn!("No content database uses {database} as its schema database; rulesets will not be validated");
        return Ok(());
    };

    match ctx.api.validate_rulesets(&content_database, &collections) {
        Ok(()) => {
            info!("Validated rulesets in {}", collections.join(", "));
            Ok(())
        }
        Err(manage::Error::ValidationFailed { code, message }) => bail!(
            "Ruleset validation failed for collections {}: {code}: {message}",
            collections.join(", ")
        ),
        Err(err) if err.is_recoverable() => {
            warn!("Unable to validate rulesets against {content_database}: {err}");
            Ok(())
        }
        Err(err) => Err(anyhow::Error::new(err)
            .context(format!("Unable to validate rulesets against {content_database}"))),
    }
}

impl Command<CommandContext> for LoadSchemasCommand {
    fn name(&self) -> &str {
        "load-schemas"
    }

    fn sort_order(&self) -> i32 {
        sort_order::LOAD_SCHEMAS
    }

    fn delete_resources_on_undo(&self) -> bool {
        false
    }

    fn execute(&self, ctx: &CommandContext, tokens: &mut TokenTable) -> Result<Vec<UnitOutcome>> {
        let mut outcomes = Vec::new();
        for source in schema_sources(ctx)? {
            if !source.path.exists() {
                debug!("Schema path {} does not exist", source.path.display());
                continue;
            }
            match Self::load_source(ctx, tokens, &source) {
                Ok(loaded) => outcomes.extend(loaded),
                Err(err) if is_missing_dependency(&err) => {
                    warn!(
                        "Unable to load schemas into {}: no such database",
                        source.database
                    );
                    outcomes.push(UnitOutcome::skipped(
                        source.path.display().to_string(),
                        format!("database {} does not exist", source.database),
                    ));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(outcomes)
    }

    fn undo(&self, _ctx: &CommandContext, _tokens: &mut TokenTable) -> Result<Vec<UnitOutcome>> {
        debug!("Schemas are removed with their database");
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{context, write};
    use manage::MockManageApi;

    fn schemas_context(paths: &[&Path], config_dirs: &[&Path], api: &MockManageApi) -> CommandContext {
        let mut ctx = context(config_dirs, api);
        ctx.config.schema_paths = paths.iter().map(|p| p.to_path_buf()).collect();
        ctx
    }

    #[test]
    fn test_properties_parse() {
        let props = PropertiesFile::parse(
            "# comment\n*=all\nrules.xml = r1, r2 ,\n\nbroken line\n",
        );
        let rules: Vec<_> = props.values_for("rules.xml").cloned().collect();
        assert_eq!(rules, vec!["all", "r1", "r2"]);
        let other: Vec<_> = props.values_for("other.xml").cloned().collect();
        assert_eq!(other, vec!["all"]);
    }

    #[test]
    fn test_parse_permissions() {
        assert_eq!(
            parse_permissions("rest-reader,read, rest-writer ,update").unwrap(),
            vec![
                ("rest-reader".to_string(), "read".to_string()),
                ("rest-writer".to_string(), "update".to_string()),
            ]
        );
        assert!(parse_permissions("").unwrap().is_empty());
        assert!(parse_permissions("rest-reader,read,rest-writer").is_err());
    }

    #[test]
    fn test_tde_detection() {
        assert!(is_tde_template("/orders.tdex"));
        assert!(is_tde_template("/templates/orders.TDEJ"));
        assert!(is_tde_template("/tde/orders.json"));
        assert!(!is_tde_template("/orders.xsd"));
    }

    #[test]
    fn test_missing_schemas_database_warns_and_continues() {
        let temp = tempfile::tempdir().unwrap();
        write(&temp.path().join("schemas/a.xsd"), "<xs:schema/>");

        let api = MockManageApi::new();
        let ctx = schemas_context(&[&temp.path().join("schemas")], &[], &api);
        let outcomes = LoadSchemasCommand
            .execute(&ctx, &mut TokenTable::new())
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].result.is_skipped());
    }

    #[test]
    fn test_absent_schema_path_ignored() {
        let temp = tempfile::tempdir().unwrap();
        let api = MockManageApi::with_databases(&["my-app-schemas"]);
        let ctx = schemas_context(&[&temp.path().join("nowhere")], &[], &api);
        assert!(
            LoadSchemasCommand
                .execute(&ctx, &mut TokenTable::new())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_last_path_wins() {
        let temp = tempfile::tempdir().unwrap();
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        write(&first.join("a.xsd"), "<first/>");
        write(&second.join("a.xsd"), "<second/>");

        let api = MockManageApi::with_databases(&["my-app-schemas"]);
        let ctx = schemas_context(&[&first, &second], &[], &api);
        LoadSchemasCommand
            .execute(&ctx, &mut TokenTable::new())
            .unwrap();

        let doc = api.document("my-app-schemas", "/a.xsd").unwrap();
        assert_eq!(doc.content, "<second/>");
    }

    #[test]
    fn test_hidden_and_ignored_entries_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("schemas");
        write(&root.join("nested/b.xsd"), "<b/>");
        write(&root.join(".do-not-load"), "secret");
        write(&root.join(".git/config"), "secret");
        write(&root.join("to-be-ignored/c.xsd"), "<c/>");
        write(&root.join("permissions.properties"), "*=rest-reader,read");

        let api = MockManageApi::with_databases(&["my-app-schemas"]);
        let mut ctx = schemas_context(&[&root], &[], &api);
        ctx.config.schemas.ignore_dirs = vec!["to-be-ignored".to_string()];

        let outcomes = LoadSchemasCommand
            .execute(&ctx, &mut TokenTable::new())
            .unwrap();
        assert_eq!(
            outcomes,
            vec![UnitOutcome::new("my-app-schemas:/nested/b.xsd", ApplyResult::Created)]
        );
    }

    #[test]
    fn test_permissions_properties_applied() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("schemas");
        write(&root.join("permissions.properties"), "*=rest-reader,read\n");
        write(&root.join("a.xsd"), "<a/>");
        write(&root.join("rules/permissions.properties"), "*=rest-reader,read\nr.xml=rest-writer,update");
        write(&root.join("rules/r.xml"), "<r/>");
        write(&root.join("rules/s.xml"), "<s/>");

        let api = MockManageApi::with_databases(&["my-app-schemas"]);
        let ctx = schemas_context(&[&root], &[], &api);
        LoadSchemasCommand
            .execute(&ctx, &mut TokenTable::new())
            .unwrap();

        let read = ("rest-reader".to_string(), "read".to_string());
        let update = ("rest-writer".to_string(), "update".to_string());
        assert_eq!(api.document("my-app-schemas", "/a.xsd").unwrap().permissions, vec![read.clone()]);
        assert_eq!(
            api.document("my-app-schemas", "/rules/r.xml").unwrap().permissions,
            vec![read.clone(), update]
        );
        assert_eq!(api.document("my-app-schemas", "/rules/s.xml").unwrap().permissions, vec![read]);
    }

    #[test]
    fn test_unpaired_permissions_are_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("schemas");
        write(&root.join("permissions.properties"), "*=rest-reader");
        write(&root.join("a.xsd"), "<a/>");

        let err = read_documents(&root, &[], &TokenTable::new()).unwrap_err();
        assert!(format!("{err:#}").contains("role,capability"));
    }

    #[test]
    fn test_collections_and_tde_collection() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("schemas");
        write(&root.join("rules/collections.properties"), "*=rules\nextra.xml=special\n");
        write(&root.join("rules/extra.xml"), "<rules/>");
        write(&root.join("orders.tdex"), "<template/>");
        write(&root.join("tde/customers.json"), "{}");

        let api = MockManageApi::with_databases(&["my-app-schemas"]);
        let mut ctx = schemas_context(&[&root], &[], &api);
        ctx.config.schemas.tde_validation = false;
        LoadSchemasCommand
            .execute(&ctx, &mut TokenTable::new())
            .unwrap();

        let rules = api.document("my-app-schemas", "/rules/extra.xml").unwrap();
        assert_eq!(rules.collections, vec!["rules", "special"]);
        let tdex = api.document("my-app-schemas", "/orders.tdex").unwrap();
        assert_eq!(tdex.collections, vec![TDE_COLLECTION]);
        let tde_dir = api.document("my-app-schemas", "/tde/customers.json").unwrap();
        assert_eq!(tde_dir.collections, vec![TDE_COLLECTION]);
    }

    #[test]
    fn test_database_schema_dir_targets_that_database() {
        let temp = tempfile::tempdir().unwrap();
        write(&temp.path().join("databases/other-schemas/schemas/x.xsd"), "<x/>");

        let api = MockManageApi::with_databases(&["other-schemas"]);
        let ctx = schemas_context(&[], &[temp.path()], &api);
        LoadSchemasCommand
            .execute(&ctx, &mut TokenTable::new())
            .unwrap();

        assert!(api.document("other-schemas", "/x.xsd").is_some());
    }

    #[test]
    fn test_invalid_tde_template_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp.path().join("ml-config");
        let schemas = temp.path().join("schemas");
        write(
            &config.join("databases/content.json"),
            r#"{"database-name": "my-app-content", "schema-database": "my-app-schemas"}"#,
        );
        write(&schemas.join("tde/orders.tdej"), r#"{"template": {}}"#);

        let api = MockManageApi::with_databases(&["my-app-content", "my-app-schemas"]);
        api.reject_template("/tde/orders.tdej", "TDE-REPEATEDCOLUMN", "Repeated column");
        let ctx = schemas_context(&[&schemas], &[&config], &api);

        let err = LoadSchemasCommand
            .execute(&ctx, &mut TokenTable::new())
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("TDE template failed validation"));
        assert!(message.contains("TDE-REPEATEDCOLUMN"));
        assert!(api.document("my-app-schemas", "/tde/orders.tdej").is_none());
    }

    #[test]
    fn test_tde_without_content_database_is_loaded_unvalidated() {
        let temp = tempfile::tempdir().unwrap();
        let schemas = temp.path().join("schemas");
        write(&schemas.join("orders.tdex"), "<template/>");

        let api = MockManageApi::with_databases(&["my-app-schemas"]);
        api.reject_template("/orders.tdex", "TDE-REPEATEDCOLUMN", "Repeated column");
        let ctx = schemas_context(&[&schemas], &[], &api);

        LoadSchemasCommand
            .execute(&ctx, &mut TokenTable::new())
            .unwrap();
        assert!(api.document("my-app-schemas", "/orders.tdex").is_some());
    }

    fn ruleset_fixture(collections: &[&str]) -> (tempfile::TempDir, MockManageApi, CommandContext) {
        let temp = tempfile::tempdir().unwrap();
        let config = temp.path().join("ml-config");
        let schemas = temp.path().join("schemas");
        write(
            &config.join("databases/content.json"),
            r#"{"database-name": "my-app-content", "schema-database": "my-app-schemas"}"#,
        );
        write(&schemas.join("valid/collections.properties"), "*=valid-rules");
        write(&schemas.join("valid/ok.xml"), "<rule/>");
        write(&schemas.join("invalid/collections.properties"), "*=invalid-rules");
        write(&schemas.join("invalid/bad.xml"), "<rule/>");

        let api = MockManageApi::with_databases(&["my-app-content", "my-app-schemas"]);
        api.reject_rules_in("invalid-rules", "RDT-INVALIDRULE", "Invalid rule");
        let mut ctx = schemas_context(&[&schemas], &[&config], &api);
        ctx.config.schemas.ruleset_collections = collections.iter().map(|c| c.to_string()).collect();
        (temp, api, ctx)
    }

    #[test]
    fn test_valid_rulesets_pass() {
        let (_temp, _api, ctx) = ruleset_fixture(&["valid-rules", "not-loaded"]);
        LoadSchemasCommand
            .execute(&ctx, &mut TokenTable::new())
            .unwrap();
    }

    #[test]
    fn test_invalid_ruleset_fails_with_engine_code() {
        let (_temp, _api, ctx) = ruleset_fixture(&["valid-rules", "invalid-rules"]);
        let err = LoadSchemasCommand
            .execute(&ctx, &mut TokenTable::new())
            .unwrap_err();
        assert!(err.to_string().contains("RDT-INVALIDRULE"));
    }

    #[test]
    fn test_collections_query_failure_skips_ruleset_validation() {
        let (_temp, api, ctx) = ruleset_fixture(&["invalid-rules"]);
        api.fail_collections_query("my-app-schemas");
        LoadSchemasCommand
            .execute(&ctx, &mut TokenTable::new())
            .unwrap();
    }

    #[test]
    fn test_tokens_substituted() {
        let temp = tempfile::tempdir().unwrap();
        write(&temp.path().join("a.xml"), "<db>${content-database}</db>");

        let api = MockManageApi::with_databases(&["my-app-schemas"]);
        let ctx = schemas_context(&[temp.path()], &[], &api);
        let mut tokens = TokenTable::new();
        tokens.insert("content-database", "my-app-content").unwrap();
        LoadSchemasCommand.execute(&ctx, &mut tokens).unwrap();

        let doc = api.document("my-app-schemas", "/a.xml").unwrap();
        assert_eq!(doc.content, "<db>my-app-content</db>");
    }
}
