//! Resource-kind table
//!
//! Each kind knows where its definitions live in a configuration directory,
//! which field names an instance, and which management endpoint it is sent to.

use anyhow::{Result, bail};
use manage::{DATABASES_COLLECTION, Endpoint, REST_APIS_COLLECTION, SERVERS_COLLECTION};
use std::fmt;

/// Optional qualifiers binding a definition to the resources it lives in
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Scope {
    /// Owning database
    pub database: Option<String>,
    /// Parent resource, e.g. the flexible-replication config of a target
    pub parent: Option<String>,
}

impl Scope {
    /// No owning resource
    pub fn global() -> Self {
        Self::default()
    }

    pub fn database(name: impl Into<String>) -> Self {
        Self {
            database: Some(name.into()),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.database, &self.parent) {
            (Some(db), Some(parent)) => write!(f, "{db}/{parent}"),
            (Some(db), None) => write!(f, "{db}"),
            (None, Some(parent)) => write!(f, "{parent}"),
            (None, None) => write!(f, "global"),
        }
    }
}

/// Kinds of deployable remote objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Database,
    Group,
    Role,
    Privilege,
    User,
    Amp,
    Server,
    RestApi,
    Trigger,
    CertificateTemplate,
    FlexrepConfig,
    FlexrepTarget,
    AlertConfig,
}

impl ResourceKind {
    pub const ALL: [Self; 13] = [
        Self::Database,
        Self::Group,
        Self::Role,
        Self::Privilege,
        Self::User,
        Self::Amp,
        Self::Server,
        Self::RestApi,
        Self::Trigger,
        Self::CertificateTemplate,
        Self::FlexrepConfig,
        Self::FlexrepTarget,
        Self::AlertConfig,
    ];

    /// Label used in logs and unit ids
    pub fn label(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Group => "group",
            Self::Role => "role",
            Self::Privilege => "privilege",
            Self::User => "user",
            Self::Amp => "amp",
            Self::Server => "server",
            Self::RestApi => "rest-api",
            Self::Trigger => "trigger",
            Self::CertificateTemplate => "certificate-template",
            Self::FlexrepConfig => "flexrep-config",
            Self::FlexrepTarget => "flexrep-target",
            Self::AlertConfig => "alert-config",
        }
    }

    /// JSON pointer to the instance name
    pub fn name_pointer(&self) -> &'static str {
        match self {
            Self::Database => "/database-name",
            Self::Group => "/group-name",
            Self::Role => "/role-name",
            Self::Privilege => "/privilege-name",
            Self::User => "/user-name",
            Self::Amp => "/local-name",
            Self::Server => "/server-name",
            Self::RestApi => "/rest-api/name",
            Self::Trigger => "/name",
            Self::CertificateTemplate => "/template-name",
            Self::FlexrepConfig => "/domain-name",
            Self::FlexrepTarget => "/target-name",
            Self::AlertConfig => "/uri",
        }
    }

    /// XML element holding the instance name
    pub fn name_element(&self) -> &'static str {
        self.name_pointer()
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    /// Location of definitions relative to a configuration directory (or a
    /// database resource directory for database-scoped kinds)
    pub fn config_path(&self) -> &'static str {
        match self {
            Self::Database => "databases",
            Self::Group => "groups",
            Self::Role => "security/roles",
            Self::Privilege => "security/privileges",
            Self::User => "security/users",
            Self::Amp => "security/amps",
            Self::Server => "servers",
            Self::RestApi => "rest-api.json",
            Self::Trigger => "triggers",
            Self::CertificateTemplate => "security/certificate-templates",
            Self::FlexrepConfig | Self::FlexrepTarget => "flexrep/configs",
            Self::AlertConfig => "alert/configs",
        }
    }

    /// Whether instances live inside a database
    pub fn is_database_scoped(&self) -> bool {
        matches!(
            self,
            Self::Trigger | Self::FlexrepConfig | Self::FlexrepTarget | Self::AlertConfig
        )
    }

    /// Management endpoint for instances in the given scope
    pub fn endpoint(&self, scope: &Scope) -> Result<Endpoint> {
        let endpoint = match self {
            Self::Database => Endpoint::new(DATABASES_COLLECTION),
            Self::Group => Endpoint::new("/manage/v2/groups"),
            Self::Role => Endpoint::new("/manage/v2/roles"),
            Self::Privilege => Endpoint::new("/manage/v2/privileges"),
            Self::User => Endpoint::new("/manage/v2/users"),
            Self::Amp => Endpoint::new("/manage/v2/amps"),
            Self::Server => Endpoint::new(SERVERS_COLLECTION).with_query("group-id", "Default"),
            Self::RestApi => Endpoint::new(REST_APIS_COLLECTION),
            Self::CertificateTemplate => Endpoint::new("/manage/v2/certificate-templates"),
            Self::Trigger => {
                let db = self.require_database(scope)?;
                Endpoint::new(format!("{DATABASES_COLLECTION}/{db}/triggers")).scoped_to(db)
            }
            Self::AlertConfig => {
                let db = self.require_database(scope)?;
                Endpoint::new(format!("{DATABASES_COLLECTION}/{db}/alert/configs"))
                    .scoped_to(db)
                    .named_by_query("uri")
            }
            Self::FlexrepConfig => {
                let db = self.require_database(scope)?;
                Endpoint::new(format!("{DATABASES_COLLECTION}/{db}/flexrep/configs"))
                    .scoped_to(db)
            }
            Self::FlexrepTarget => {
                let db = self.require_database(scope)?;
                let Some(config) = scope.parent.as_deref() else {
                    bail!("A {} needs the name of its flexrep config", self.label());
                };
                Endpoint::new(format!(
                    "{DATABASES_COLLECTION}/{db}/flexrep/configs/{config}/targets"
                ))
                .scoped_to(db)
            }
        };
        Ok(endpoint)
    }

    fn require_database<'a>(&self, scope: &'a Scope) -> Result<&'a str> {
        match scope.database.as_deref() {
            Some(db) => Ok(db),
            None => bail!("A {} must be scoped to a database", self.label()),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
