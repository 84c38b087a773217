//! In-memory backend for testing without a cluster.
//!
//! [`MockManageApi`] simulates the parts of the management API's behavior the
//! deployment engine depends on:
//! - creating an existing resource or updating a missing one fails
//! - requests against a collection scoped to a missing database fail with
//!   `XDMP-NOSUCHDB`
//! - deleting a database removes everything scoped to it, documents included
//! - creating a REST API also creates its app server
//!
//! Every mutating call is recorded so tests can assert on what was sent.

use crate::backend::ManageApi;
use crate::error::{Error, Result};
use crate::types::{
    DATABASES_COLLECTION, Document, Endpoint, Payload, REST_APIS_COLLECTION, SERVERS_COLLECTION,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// A mutating request received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `create` on a collection.
    Create {
        /// Collection path.
        collection: String,
        /// Resource name.
        name: String,
    },
    /// `update` on a collection.
    Update {
        /// Collection path.
        collection: String,
        /// Resource name.
        name: String,
    },
    /// `delete` of an existing resource.
    Delete {
        /// Collection path.
        collection: String,
        /// Resource name.
        name: String,
    },
    /// `write_document` into a database.
    WriteDocument {
        /// Target database.
        database: String,
        /// Document URI.
        uri: String,
    },
}

#[derive(Debug, Clone)]
struct StoredResource {
    payload: Payload,
    id: u64,
}

#[derive(Debug, Default)]
struct Collection {
    database: Option<String>,
    items: BTreeMap<String, StoredResource>,
}

#[derive(Debug, Default)]
struct MockState {
    collections: BTreeMap<String, Collection>,
    documents: BTreeMap<String, BTreeMap<String, Document>>,
    next_id: u64,
    tde_failures: BTreeMap<String, (String, String)>,
    invalid_rule_collections: BTreeMap<String, (String, String)>,
    failing_collection_queries: BTreeSet<String>,
    calls: Vec<Call>,
}

impl MockState {
    fn database_exists(&self, name: &str) -> bool {
        self.collections
            .get(DATABASES_COLLECTION)
            .is_some_and(|c| c.items.contains_key(name))
    }

    fn require_database(&self, name: &str) -> Result<()> {
        if self.database_exists(name) {
            Ok(())
        } else {
            Err(Error::MissingDependency {
                code: "XDMP-NOSUCHDB".to_string(),
                message: format!("XDMP-NOSUCHDB: No such database {name}"),
            })
        }
    }

    fn require_scope(&self, endpoint: &Endpoint) -> Result<()> {
        match &endpoint.database {
            Some(db) => self.require_database(db),
            None => Ok(()),
        }
    }

    fn collection(&self, endpoint: &Endpoint) -> Option<&Collection> {
        self.collections.get(&endpoint.collection)
    }

    fn insert(&mut self, endpoint: &Endpoint, name: &str, payload: Payload) {
        self.next_id += 1;
        let id = self.next_id;
        let collection = self
            .collections
            .entry(endpoint.collection.clone())
            .or_default();
        collection.database.clone_from(&endpoint.database);
        collection
            .items
            .insert(name.to_string(), StoredResource { payload, id });
    }

    fn remove_database(&mut self, name: &str) {
        self.collections
            .retain(|_, c| c.database.as_deref() != Some(name));
        self.documents.remove(name);
    }
}

/// Mock management API for tests.
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect another.
#[derive(Debug, Clone, Default)]
pub struct MockManageApi {
    state: Arc<Mutex<MockState>>,
}

impl MockManageApi {
    /// Create an empty mock (no databases, no resources).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that already has the given databases.
    #[must_use]
    pub fn with_databases(names: &[&str]) -> Self {
        let mock = Self::new();
        for name in names {
            mock.add_database(name);
        }
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a database without recording a call.
    pub fn add_database(&self, name: &str) {
        let payload = Payload::json(format!(r#"{{"database-name": "{name}"}}"#));
        self.state()
            .insert(&Endpoint::new(DATABASES_COLLECTION), name, payload);
    }

    /// Make TDE validation reject a template URI.
    pub fn reject_template(&self, uri: &str, code: &str, message: &str) {
        self.state()
            .tde_failures
            .insert(uri.to_string(), (code.to_string(), message.to_string()));
    }

    /// Make ruleset validation reject a collection.
    pub fn reject_rules_in(&self, collection: &str, code: &str, message: &str) {
        self.state().invalid_rule_collections.insert(
            collection.to_string(),
            (code.to_string(), message.to_string()),
        );
    }

    /// Make the collections query against a database fail.
    pub fn fail_collections_query(&self, database: &str) {
        self.state()
            .failing_collection_queries
            .insert(database.to_string());
    }

    /// Stored payload of a resource.
    #[must_use]
    pub fn resource(&self, collection: &str, name: &str) -> Option<Payload> {
        self.state()
            .collections
            .get(collection)
            .and_then(|c| c.items.get(name))
            .map(|r| r.payload.clone())
    }

    /// Names in a collection, sorted.
    #[must_use]
    pub fn names(&self, collection: &str) -> Vec<String> {
        self.state()
            .collections
            .get(collection)
            .map(|c| c.items.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether a database exists.
    #[must_use]
    pub fn has_database(&self, name: &str) -> bool {
        self.state().database_exists(name)
    }

    /// A stored document.
    #[must_use]
    pub fn document(&self, database: &str, uri: &str) -> Option<Document> {
        self.state()
            .documents
            .get(database)
            .and_then(|docs| docs.get(uri))
            .cloned()
    }

    /// All mutating calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

impl ManageApi for MockManageApi {
    fn list(&self, endpoint: &Endpoint) -> Result<Vec<String>> {
        let state = self.state();
        state.require_scope(endpoint)?;
        Ok(state
            .collection(endpoint)
            .map(|c| c.items.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn read(&self, endpoint: &Endpoint, name: &str) -> Result<Option<Payload>> {
        let state = self.state();
        state.require_scope(endpoint)?;
        Ok(state
            .collection(endpoint)
            .and_then(|c| c.items.get(name))
            .map(|r| r.payload.clone()))
    }

    fn resource_id(&self, endpoint: &Endpoint, name: &str) -> Result<Option<String>> {
        let state = self.state();
        state.require_scope(endpoint)?;
        Ok(state
            .collection(endpoint)
            .and_then(|c| c.items.get(name))
            .map(|r| r.id.to_string()))
    }

    fn create(&self, endpoint: &Endpoint, name: &str, payload: &Payload) -> Result<()> {
        let mut state = self.state();
        state.require_scope(endpoint)?;
        if state
            .collection(endpoint)
            .is_some_and(|c| c.items.contains_key(name))
        {
            return Err(Error::Http {
                status: 400,
                code: Some("MANAGE-RESOURCEEXISTS".to_string()),
                message: format!("{name} already exists in {}", endpoint.collection),
            });
        }

        state.insert(endpoint, name, payload.clone());
        if endpoint.collection == REST_APIS_COLLECTION {
            state.insert(&Endpoint::new(SERVERS_COLLECTION), name, payload.clone());
        }
        state.calls.push(Call::Create {
            collection: endpoint.collection.clone(),
            name: name.to_string(),
        });
        Ok(())
    }

    fn update(&self, endpoint: &Endpoint, name: &str, payload: &Payload) -> Result<()> {
        let mut state = self.state();
        state.require_scope(endpoint)?;
        let Some(existing) = state
            .collections
            .get_mut(&endpoint.collection)
            .and_then(|c| c.items.get_mut(name))
        else {
            return Err(Error::NotFound(format!("{} {name}", endpoint.collection)));
        };
        existing.payload = payload.clone();
        state.calls.push(Call::Update {
            collection: endpoint.collection.clone(),
            name: name.to_string(),
        });
        Ok(())
    }

    fn delete(&self, endpoint: &Endpoint, name: &str) -> Result<()> {
        let mut state = self.state();
        state.require_scope(endpoint)?;
        let removed = state
            .collections
            .get_mut(&endpoint.collection)
            .and_then(|c| c.items.remove(name))
            .is_some();
        if !removed {
            return Ok(());
        }

        if endpoint.collection == DATABASES_COLLECTION {
            state.remove_database(name);
        }
        if endpoint.collection == REST_APIS_COLLECTION
            && let Some(servers) = state.collections.get_mut(SERVERS_COLLECTION)
        {
            servers.items.remove(name);
        }
        state.calls.push(Call::Delete {
            collection: endpoint.collection.clone(),
            name: name.to_string(),
        });
        Ok(())
    }

    fn collections(&self, database: &str) -> Result<Vec<String>> {
        let state = self.state();
        state.require_database(database)?;
        if state.failing_collection_queries.contains(database) {
            return Err(Error::Http {
                status: 500,
                code: Some("XDMP-EVAL".to_string()),
                message: format!("collections query failed for {database}"),
            });
        }
        let collections: BTreeSet<String> = state
            .documents
            .get(database)
            .into_iter()
            .flat_map(|docs| docs.values())
            .flat_map(|doc| doc.collections.iter().cloned())
            .collect();
        Ok(collections.into_iter().collect())
    }

    fn write_document(&self, database: &str, document: &Document) -> Result<()> {
        let mut state = self.state();
        state.require_database(database)?;
        state
            .documents
            .entry(database.to_string())
            .or_default()
            .insert(document.uri.clone(), document.clone());
        state.calls.push(Call::WriteDocument {
            database: database.to_string(),
            uri: document.uri.clone(),
        });
        Ok(())
    }

    fn validate_tde(&self, content_database: &str, template: &Document) -> Result<()> {
        let state = self.state();
        state.require_database(content_database)?;
        match state.tde_failures.get(&template.uri) {
            Some((code, message)) => Err(Error::ValidationFailed {
                code: code.clone(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn validate_rulesets(&self, content_database: &str, collections: &[String]) -> Result<()> {
        let state = self.state();
        state.require_database(content_database)?;
        for collection in collections {
            if let Some((code, message)) = state.invalid_rule_collections.get(collection) {
                return Err(Error::ValidationFailed {
                    code: code.clone(),
                    message: message.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::types::Format;

    fn triggers(db: &str) -> Endpoint {
        Endpoint::new(format!("/manage/v2/databases/{db}/triggers")).scoped_to(db)
    }

    #[test]
    fn test_mock_create_and_read() {
        let api = MockManageApi::new();
        let roles = Endpoint::new("/manage/v2/roles");
        let payload = Payload::json(r#"{"role-name": "reader"}"#);

        api.create(&roles, "reader", &payload).unwrap();

        assert!(api.exists(&roles, "reader").unwrap());
        assert_eq!(api.read(&roles, "reader").unwrap(), Some(payload));
        assert!(api.resource_id(&roles, "reader").unwrap().is_some());
    }

    #[test]
    fn test_mock_create_twice_fails() {
        let api = MockManageApi::new();
        let roles = Endpoint::new("/manage/v2/roles");
        let payload = Payload::json("{}");
        api.create(&roles, "reader", &payload).unwrap();
        assert!(api.create(&roles, "reader", &payload).is_err());
    }

    #[test]
    fn test_mock_update_missing_fails() {
        let api = MockManageApi::new();
        let err = api
            .update(&Endpoint::new("/manage/v2/roles"), "nope", &Payload::json("{}"))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_mock_scoped_collection_requires_database() {
        let api = MockManageApi::new();
        let err = api
            .create(&triggers("app-triggers"), "t1", &Payload::json("{}"))
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(err.code(), Some("XDMP-NOSUCHDB"));

        api.add_database("app-triggers");
        api.create(&triggers("app-triggers"), "t1", &Payload::json("{}"))
            .unwrap();
        assert_eq!(api.list(&triggers("app-triggers")).unwrap(), vec!["t1"]);
    }

    #[test]
    fn test_mock_delete_database_cascades() {
        let api = MockManageApi::with_databases(&["app-triggers"]);
        api.create(&triggers("app-triggers"), "t1", &Payload::json("{}"))
            .unwrap();
        api.write_document("app-triggers", &Document::new("/a.json", "{}", Format::Json))
            .unwrap();

        api.delete(&Endpoint::new(DATABASES_COLLECTION), "app-triggers")
            .unwrap();

        assert!(!api.has_database("app-triggers"));
        assert!(api.names("/manage/v2/databases/app-triggers/triggers").is_empty());
        assert!(api.document("app-triggers", "/a.json").is_none());
    }

    #[test]
    fn test_mock_delete_absent_is_noop() {
        let api = MockManageApi::new();
        api.delete(&Endpoint::new("/manage/v2/roles"), "ghost").unwrap();
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_mock_rest_api_creates_server() {
        let api = MockManageApi::new();
        let payload = Payload::json(r#"{"rest-api": {"name": "app"}}"#);
        api.create(&Endpoint::new(REST_APIS_COLLECTION), "app", &payload)
            .unwrap();
        assert!(api.exists(&Endpoint::new(SERVERS_COLLECTION), "app").unwrap());

        api.delete(&Endpoint::new(REST_APIS_COLLECTION), "app").unwrap();
        assert!(!api.exists(&Endpoint::new(SERVERS_COLLECTION), "app").unwrap());
    }

    #[test]
    fn test_mock_collections_and_validation() {
        let api = MockManageApi::with_databases(&["schemas", "content"]);
        let rules = Document::new("/bad.rules", "<rule/>", Format::Xml).with_collection("invalid-rules");
        api.write_document("schemas", &rules).unwrap();

        assert_eq!(api.collections("schemas").unwrap(), vec!["invalid-rules"]);

        api.reject_rules_in("invalid-rules", "RDT-INVALIDRULE", "bad rule");
        let err = api
            .validate_rulesets("content", &["invalid-rules".to_string()])
            .unwrap_err();
        assert_eq!(err.code(), Some("RDT-INVALIDRULE"));
        assert!(api.validate_rulesets("content", &["valid-rules".to_string()]).is_ok());
    }

    #[test]
    fn test_mock_failing_collections_query() {
        let api = MockManageApi::with_databases(&["schemas"]);
        api.fail_collections_query("schemas");
        assert!(api.collections("schemas").is_err());
    }

    #[test]
    fn test_mock_records_calls() {
        let api = MockManageApi::new();
        let roles = Endpoint::new("/manage/v2/roles");
        api.create(&roles, "r", &Payload::json("{}")).unwrap();
        api.update(&roles, "r", &Payload::json("{}")).unwrap();
        assert_eq!(
            api.calls(),
            vec![
                Call::Create {
                    collection: "/manage/v2/roles".to_string(),
                    name: "r".to_string()
                },
                Call::Update {
                    collection: "/manage/v2/roles".to_string(),
                    name: "r".to_string()
                },
            ]
        );
        api.clear_calls();
        assert!(api.calls().is_empty());
    }
}
