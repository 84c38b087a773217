//! REST API servers
//!
//! Creating a REST API server also creates its app server, so existence is
//! checked against the servers collection. An existing server is never
//! updated through this API; that belongs to the servers command.

use super::{ResourceKind, ResourceManager, ResourcePayload};
use anyhow::{Context, Result};
use declarative::ApplyResult;
use log::info;
use manage::{Endpoint, ManageApi, REST_APIS_COLLECTION, SERVERS_COLLECTION};
use std::sync::Arc;

pub struct RestApiManager {
    api: Arc<dyn ManageApi>,
    delete_content: bool,
    delete_modules: bool,
}

impl RestApiManager {
    pub fn new(api: Arc<dyn ManageApi>) -> Self {
        Self {
            api,
            delete_content: false,
            delete_modules: false,
        }
    }

    /// Also delete the content and/or modules databases on delete
    pub fn with_includes(mut self, delete_content: bool, delete_modules: bool) -> Self {
        self.delete_content = delete_content;
        self.delete_modules = delete_modules;
        self
    }

    fn servers() -> Endpoint {
        Endpoint::new(SERVERS_COLLECTION).with_query("group-id", "Default")
    }

    fn delete_endpoint(&self) -> Endpoint {
        let mut endpoint = Endpoint::new(REST_APIS_COLLECTION);
        if self.delete_content {
            endpoint = endpoint.with_query("include", "content");
        }
        if self.delete_modules {
            endpoint = endpoint.with_query("include", "modules");
        }
        endpoint
    }
}

impl ResourceManager for RestApiManager {
    fn kind(&self) -> ResourceKind {
        ResourceKind::RestApi
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.api.exists(&Self::servers(), name)?)
    }

    fn save(&self, payload: &ResourcePayload) -> Result<ApplyResult> {
        let name = payload.name()?;
        if self.exists(&name)? {
            info!("REST API server {name} already exists, not creating");
            return Ok(ApplyResult::NoChange);
        }

        self.api
            .create(&Endpoint::new(REST_APIS_COLLECTION), &name, &payload.payload)
            .with_context(|| format!("Unable to create REST API server {name}"))?;
        info!("Created REST API server {name}");
        Ok(ApplyResult::Created)
    }

    fn delete(&self, name: &str) -> Result<ApplyResult> {
        if !self.exists(name)? {
            info!("REST API server {name} does not exist, not deleting");
            return Ok(ApplyResult::NoChange);
        }

        self.api
            .delete(&self.delete_endpoint(), name)
            .with_context(|| format!("Unable to delete REST API server {name}"))?;
        info!("Deleted REST API server {name}");
        Ok(ApplyResult::Removed)
    }

    /// REST API servers only; the servers collection also lists every other app server
    fn list(&self) -> Result<Vec<String>> {
        Ok(self.api.list(&Endpoint::new(REST_APIS_COLLECTION))?)
    }
}
