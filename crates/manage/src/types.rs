//! Core types for talking to the management API.
//!
//! These types describe what is sent (payloads and documents) and where it is
//! sent (endpoints). Endpoint paths are built by callers; this crate only knows
//! the handful of collections it needs to simulate in [`crate::MockManageApi`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Collection of databases.
pub const DATABASES_COLLECTION: &str = "/manage/v2/databases";

/// Collection of app servers.
pub const SERVERS_COLLECTION: &str = "/manage/v2/servers";

/// Collection used to create and remove REST API servers.
pub const REST_APIS_COLLECTION: &str = "/v1/rest-apis";

/// Collection that template-driven extraction documents must be loaded into.
pub const TDE_COLLECTION: &str = "http://marklogic.com/xdmp/tde";

/// Serialization format of a payload or document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON body.
    Json,
    /// XML body.
    Xml,
    /// Anything else (text, xsd-as-text, binary-safe text).
    Text,
}

impl Format {
    /// Determine the format from a file extension.
    ///
    /// ```
    /// use manage::Format;
    ///
    /// assert_eq!(Format::from_extension("json"), Format::Json);
    /// assert_eq!(Format::from_extension("XSD"), Format::Xml);
    /// assert_eq!(Format::from_extension("tdej"), Format::Json);
    /// assert_eq!(Format::from_extension("sjs"), Format::Text);
    /// ```
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "json" | "tdej" => Self::Json,
            "xml" | "xsd" | "tdex" | "rules" | "xsl" | "xslt" => Self::Xml,
            _ => Self::Text,
        }
    }

    /// MIME type used when sending a body in this format.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
            Self::Text => "text/plain",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Xml => write!(f, "xml"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// A serialized resource definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Raw body text.
    pub body: String,
    /// Body format.
    pub format: Format,
}

impl Payload {
    /// Create a JSON payload.
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            format: Format::Json,
        }
    }

    /// Create an XML payload.
    pub fn xml(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            format: Format::Xml,
        }
    }

    /// Whether two payloads describe the same resource state.
    ///
    /// JSON payloads are compared structurally, everything else by trimmed text.
    ///
    /// ```
    /// use manage::Payload;
    ///
    /// let a = Payload::json(r#"{"role-name": "r", "description": "d"}"#);
    /// let b = Payload::json(r#"{ "description": "d", "role-name": "r" }"#);
    /// assert!(a.same_content(&b));
    /// ```
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        if self.format == Format::Json && other.format == Format::Json {
            let left = serde_json::from_str::<serde_json::Value>(&self.body);
            let right = serde_json::from_str::<serde_json::Value>(&other.body);
            if let (Ok(left), Ok(right)) = (left, right) {
                return left == right;
            }
        }
        self.format == other.format && self.body.trim() == other.body.trim()
    }
}

/// A document written into a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Document URI, always starting with `/`.
    pub uri: String,
    /// Document content.
    pub content: String,
    /// Content format.
    pub format: Format,
    /// Collections the document belongs to.
    pub collections: Vec<String>,
    /// `(role, capability)` pairs granted on the document.
    pub permissions: Vec<(String, String)>,
}

impl Document {
    /// Create a document with no collections or permissions.
    pub fn new(uri: impl Into<String>, content: impl Into<String>, format: Format) -> Self {
        Self {
            uri: uri.into(),
            content: content.into(),
            format,
            collections: Vec::new(),
            permissions: Vec::new(),
        }
    }

    /// Grant a capability (`read`, `update`, `execute`, ...) to a role.
    ///
    /// ```
    /// use manage::{Document, Format};
    ///
    /// let doc = Document::new("/lib.sjs", "", Format::Text)
    ///     .with_permission("rest-reader", "read")
    ///     .with_permission("rest-reader", "read");
    /// assert_eq!(doc.permissions.len(), 1);
    /// ```
    #[must_use]
    pub fn with_permission(mut self, role: impl Into<String>, capability: impl Into<String>) -> Self {
        let permission = (role.into(), capability.into());
        if !self.permissions.contains(&permission) {
            self.permissions.push(permission);
        }
        self
    }

    /// Add a collection (duplicates are ignored).
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        if !self.collections.contains(&collection) {
            self.collections.push(collection);
        }
        self
    }
}

/// A resource collection on the management API.
///
/// `database` names the database the collection lives in, when it has one.
/// Requests against a scoped collection fail with a missing-dependency error
/// while that database does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Collection path, e.g. `/manage/v2/roles`.
    pub collection: String,
    /// Extra query parameters sent with every request.
    pub query: Vec<(String, String)>,
    /// Owning database, if the collection is scoped to one.
    pub database: Option<String>,
    /// Query parameter that names an item, for collections whose items are
    /// addressed by parameter instead of by path segment.
    pub name_param: Option<String>,
}

impl Endpoint {
    /// Create an unscoped endpoint.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            query: Vec::new(),
            database: None,
            name_param: None,
        }
    }

    /// Scope the endpoint to a database.
    #[must_use]
    pub fn scoped_to(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Address items by the given query parameter, e.g. `uri`.
    #[must_use]
    pub fn named_by_query(mut self, key: impl Into<String>) -> Self {
        self.name_param = Some(key.into());
        self
    }

    /// Path of a single item in the collection.
    ///
    /// ```
    /// use manage::Endpoint;
    ///
    /// let endpoint = Endpoint::new("/manage/v2/roles");
    /// assert_eq!(endpoint.item_path("app reader"), "/manage/v2/roles/app%20reader");
    /// ```
    #[must_use]
    pub fn item_path(&self, name: &str) -> String {
        match self.name_param {
            Some(_) => self.collection.clone(),
            None => format!("{}/{}", self.collection, encode_segment(name)),
        }
    }

    /// Query parameters of a request addressing a single item.
    #[must_use]
    pub fn item_query(&self, name: &str) -> Vec<(String, String)> {
        let mut query = self.query.clone();
        if let Some(key) = &self.name_param {
            query.push((key.clone(), name.to_string()));
        }
        query
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection)
    }
}

/// Connection settings for [`crate::HttpManageClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// `http` or `https`.
    pub scheme: String,
    /// Cluster host.
    pub host: String,
    /// Port of the management API.
    pub manage_port: u16,
    /// Port of the app-services server (documents and eval).
    pub app_services_port: u16,
    /// Username sent with basic credentials.
    pub username: Option<String>,
    /// Password sent with basic credentials.
    pub password: Option<String>,
    /// Global request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            manage_port: 8002,
            app_services_port: 8000,
            username: None,
            password: None,
            timeout_secs: 120,
        }
    }
}

impl ClientConfig {
    /// Base URL of the management API.
    #[must_use]
    pub fn manage_base(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.manage_port)
    }

    /// Base URL of the app-services server.
    #[must_use]
    pub fn app_services_base(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.app_services_port)
    }
}

/// Percent-encode a single path segment or query value.
pub(crate) fn encode_segment(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}
