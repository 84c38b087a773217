//! Management API trait and implementations.
//!
//! The [`ManageApi`] trait is the whole contract between the deployment engine
//! and the remote cluster. [`http::HttpManageClient`] talks to a real cluster,
//! [`mock::MockManageApi`] keeps everything in memory:
//!
//! ```
//! use manage::{Endpoint, ManageApi, MockManageApi, Payload};
//!
//! let api = MockManageApi::new();
//! let roles = Endpoint::new("/manage/v2/roles");
//! api.create(&roles, "reader", &Payload::json(r#"{"role-name": "reader"}"#)).unwrap();
//!
//! assert!(api.exists(&roles, "reader").unwrap());
//! assert_eq!(api.list(&roles).unwrap(), vec!["reader".to_string()]);
//! ```

pub mod http;
pub mod mock;

use crate::error::Result;
use crate::types::{Document, Endpoint, Payload};

/// Operations the deployment engine needs from the management API.
///
/// Implementations must not retain state between calls beyond what the
/// remote system itself stores.
pub trait ManageApi: Send + Sync {
    /// Names of all resources in a collection.
    fn list(&self, endpoint: &Endpoint) -> Result<Vec<String>>;

    /// Whether a resource exists. Never mutates.
    fn exists(&self, endpoint: &Endpoint, name: &str) -> Result<bool> {
        Ok(self.list(endpoint)?.iter().any(|n| n == name))
    }

    /// Current properties of a resource, `None` when it does not exist.
    fn read(&self, endpoint: &Endpoint, name: &str) -> Result<Option<Payload>>;

    /// Identifier the server assigned to a resource, if it has one.
    fn resource_id(&self, endpoint: &Endpoint, name: &str) -> Result<Option<String>>;

    /// Create a resource. Fails if it already exists.
    fn create(&self, endpoint: &Endpoint, name: &str, payload: &Payload) -> Result<()>;

    /// Replace the properties of an existing resource.
    fn update(&self, endpoint: &Endpoint, name: &str, payload: &Payload) -> Result<()>;

    /// Remove a resource. Removing an absent resource succeeds.
    fn delete(&self, endpoint: &Endpoint, name: &str) -> Result<()>;

    /// Collections that currently hold documents in a database.
    fn collections(&self, database: &str) -> Result<Vec<String>>;

    /// Insert or replace a document.
    fn write_document(&self, database: &str, document: &Document) -> Result<()>;

    /// Validate a template-driven extraction template against a content database.
    ///
    /// # Errors
    ///
    /// Returns `Error::ValidationFailed` when the template is rejected.
    fn validate_tde(&self, content_database: &str, template: &Document) -> Result<()>;

    /// Validate the redaction rulesets stored in the given collections.
    ///
    /// # Errors
    ///
    /// Returns `Error::ValidationFailed` when any rule is rejected.
    fn validate_rulesets(&self, content_database: &str, collections: &[String]) -> Result<()>;
}
