//! Application configuration
//!
//! One TOML file describes an application: its name, where its configuration
//! directories and schema paths live, how to reach the cluster, and any custom
//! tokens. Everything has a default derived from the application name, so an
//! empty file is a valid configuration.
//!
//! ```toml
//! name = "orders"
//! config_dirs = ["src/main/ml-config"]
//! schema_paths = ["src/main/ml-schemas"]
//! module_paths = ["src/main/ml-modules"]
//!
//! [connection]
//! host = "db.example.com"
//! username = "admin"
//!
//! [schemas]
//! ruleset_collections = ["valid-rules"]
//!
//! [modules]
//! permissions = "rest-admin,read,rest-admin,update,rest-extension-user,execute"
//!
//! [tokens]
//! "service-port" = "8010"
//! ```

use anyhow::{Context, Result};
use declarative::TokenTable;
use manage::ClientConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding `connection.host`
pub const ENV_HOST: &str = "APPDEPLOYER_HOST";

/// Environment variable overriding `connection.username`
pub const ENV_USERNAME: &str = "APPDEPLOYER_USERNAME";

/// Environment variable overriding `connection.password`
pub const ENV_PASSWORD: &str = "APPDEPLOYER_PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name, the base of every default database name
    pub name: String,

    /// Configuration directories, processed in order
    pub config_dirs: Vec<PathBuf>,

    /// Directories loaded into the schemas database, processed in order
    pub schema_paths: Vec<PathBuf>,

    /// Asset directories loaded into the modules database, processed in order
    pub module_paths: Vec<PathBuf>,

    pub content_database: Option<String>,
    pub schemas_database: Option<String>,
    pub triggers_database: Option<String>,
    pub modules_database: Option<String>,

    /// Database holding flexible-replication configs; defaults to the content database
    pub flexrep_database: Option<String>,

    /// Suffix of `flexrep/configs/<config><suffix>` target directories
    pub flexrep_targets_suffix: String,

    pub schemas: SchemasConfig,
    pub modules: ModulesConfig,
    pub rest_api: RestApiConfig,
    pub connection: ConnectionConfig,

    /// Custom `${key}` tokens, keys written without the `${}` wrapper
    pub tokens: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "my-app".to_string(),
            config_dirs: vec![PathBuf::from("src/main/ml-config")],
            schema_paths: vec![PathBuf::from("src/main/ml-schemas")],
            module_paths: vec![PathBuf::from("src/main/ml-modules")],
            content_database: None,
            schemas_database: None,
            triggers_database: None,
            modules_database: None,
            flexrep_database: None,
            flexrep_targets_suffix: "-targets".to_string(),
            schemas: SchemasConfig::default(),
            modules: ModulesConfig::default(),
            rest_api: RestApiConfig::default(),
            connection: ConnectionConfig::default(),
            tokens: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemasConfig {
    /// Validate TDE templates against their content database before loading
    pub tde_validation: bool,

    /// Validate redaction rulesets after loading
    pub ruleset_validation: bool,

    /// Collections holding rulesets to validate
    pub ruleset_collections: Vec<String>,

    /// Directory names skipped anywhere under a schema path
    pub ignore_dirs: Vec<String>,
}

impl Default for SchemasConfig {
    fn default() -> Self {
        Self {
            tde_validation: true,
            ruleset_validation: true,
            ruleset_collections: Vec::new(),
            ignore_dirs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulesConfig {
    /// `role,capability` pairs granted on every loaded module
    pub permissions: String,

    /// Collections every loaded module is added to
    pub collections: Vec<String>,

    /// Directory names skipped anywhere under a module path
    pub ignore_dirs: Vec<String>,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            permissions: "rest-admin,read,rest-admin,update,rest-extension-user,execute"
                .to_string(),
            collections: Vec::new(),
            ignore_dirs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestApiConfig {
    /// Also delete the content database when undoing a REST API server
    pub delete_content: bool,

    /// Also delete the modules database when undoing a REST API server
    pub delete_modules: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub scheme: String,
    pub host: String,
    pub manage_port: u16,
    pub app_services_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            scheme: client.scheme,
            host: client.host,
            manage_port: client.manage_port,
            app_services_port: client.app_services_port,
            username: client.username,
            password: client.password,
            timeout_secs: client.timeout_secs,
        }
    }
}

impl AppConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid appdeployer configuration")
    }

    /// Load a configuration file.
    ///
    /// Relative directories are resolved against the file's directory and
    /// environment overrides are applied.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let mut config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load a configuration file if it exists, otherwise use defaults relative to `base`
    pub fn load_or_default(path: &Path, base: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        log::debug!(
            "No configuration at {}, using defaults relative to {}",
            path.display(),
            base.display()
        );
        let mut config = Self::default();
        config.resolve_relative_to(base);
        config.apply_env_overrides();
        Ok(config)
    }

    /// Make relative config dirs, schema paths and module paths absolute
    pub fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |path: &PathBuf| {
            let expanded = crate::paths::expand(&path.to_string_lossy());
            if expanded.is_absolute() {
                expanded
            } else {
                base.join(expanded)
            }
        };
        self.config_dirs = self.config_dirs.iter().map(resolve).collect();
        self.schema_paths = self.schema_paths.iter().map(resolve).collect();
        self.module_paths = self.module_paths.iter().map(resolve).collect();
    }

    /// Apply `APPDEPLOYER_*` environment overrides to the connection settings
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var(ENV_HOST) {
            log::debug!("Using host from {ENV_HOST}: {host}");
            self.connection.host = host;
        }
        if let Ok(username) = std::env::var(ENV_USERNAME) {
            self.connection.username = Some(username);
        }
        if let Ok(password) = std::env::var(ENV_PASSWORD) {
            self.connection.password = Some(password);
        }
    }

    pub fn content_database_name(&self) -> String {
        self.content_database
            .clone()
            .unwrap_or_else(|| format!("{}-content", self.name))
    }

    pub fn schemas_database_name(&self) -> String {
        self.schemas_database
            .clone()
            .unwrap_or_else(|| format!("{}-schemas", self.name))
    }

    pub fn triggers_database_name(&self) -> String {
        self.triggers_database
            .clone()
            .unwrap_or_else(|| format!("{}-triggers", self.name))
    }

    pub fn modules_database_name(&self) -> String {
        self.modules_database
            .clone()
            .unwrap_or_else(|| format!("{}-modules", self.name))
    }

    pub fn flexrep_database_name(&self) -> String {
        self.flexrep_database
            .clone()
            .unwrap_or_else(|| self.content_database_name())
    }

    /// Connection settings for the HTTP client
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            scheme: self.connection.scheme.clone(),
            host: self.connection.host.clone(),
            manage_port: self.connection.manage_port,
            app_services_port: self.connection.app_services_port,
            username: self.connection.username.clone(),
            password: self.connection.password.clone(),
            timeout_secs: self.connection.timeout_secs,
        }
    }

    /// Token table a run starts with: built-in names plus custom tokens.
    ///
    /// Custom tokens may be written as `key` or `${key}`. A custom token that
    /// redefines a built-in name with a different value is rejected.
    pub fn seed_tokens(&self) -> Result<TokenTable> {
        let mut tokens = TokenTable::new();
        tokens.insert("app-name", self.name.clone())?;
        tokens.insert("content-database", self.content_database_name())?;
        tokens.insert("schemas-database", self.schemas_database_name())?;
        tokens.insert("triggers-database", self.triggers_database_name())?;
        tokens.insert("modules-database", self.modules_database_name())?;

        for (key, value) in &self.tokens {
            let key = key
                .strip_prefix("${")
                .and_then(|k| k.strip_suffix('}'))
                .unwrap_or(key);
            tokens
                .insert(key, value.clone())
                .with_context(|| format!("Invalid custom token '{key}'"))?;
        }
        Ok(tokens)
    }
}
