//! Table-driven resource manager over the management API

use super::{ResourceKind, ResourceManager, ResourcePayload, Scope};
use anyhow::{Context, Result};
use declarative::ApplyResult;
use log::{debug, info};
use manage::{Endpoint, ManageApi};
use std::sync::Arc;

/// Manages every instance of one kind within one scope
pub struct RestResourceManager {
    api: Arc<dyn ManageApi>,
    kind: ResourceKind,
    endpoint: Endpoint,
}

impl RestResourceManager {
    pub fn new(api: Arc<dyn ManageApi>, kind: ResourceKind, scope: Scope) -> Result<Self> {
        let endpoint = kind.endpoint(&scope)?;
        Ok(Self {
            api,
            kind,
            endpoint,
        })
    }

    /// Identifier the server assigned to an instance
    pub fn resource_id(&self, name: &str) -> Result<Option<String>> {
        self.api
            .resource_id(&self.endpoint, name)
            .with_context(|| format!("Unable to read id of {} {name}", self.kind))
    }
}

impl ResourceManager for RestResourceManager {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.api.exists(&self.endpoint, name)?)
    }

    fn save(&self, payload: &ResourcePayload) -> Result<ApplyResult> {
        let name = payload.name()?;
        let kind = self.kind;

        if self.exists(&name)? {
            let current = self.api.read(&self.endpoint, &name)?;
            if current.is_some_and(|c| c.same_content(&payload.payload)) {
                debug!("{kind} {name} is up to date");
                return Ok(ApplyResult::NoChange);
            }
            self.api
                .update(&self.endpoint, &name, &payload.payload)
                .with_context(|| format!("Unable to update {kind} {name}"))?;
            info!("Updated {kind} {name}");
            Ok(ApplyResult::Modified)
        } else {
            self.api
                .create(&self.endpoint, &name, &payload.payload)
                .with_context(|| format!("Unable to create {kind} {name}"))?;
            info!("Created {kind} {name}");
            Ok(ApplyResult::Created)
        }
    }

    fn delete(&self, name: &str) -> Result<ApplyResult> {
        let kind = self.kind;
        if !self.exists(name)? {
            debug!("{kind} {name} does not exist, nothing to delete");
            return Ok(ApplyResult::NoChange);
        }
        self.api
            .delete(&self.endpoint, name)
            .with_context(|| format!("Unable to delete {kind} {name}"))?;
        info!("Deleted {kind} {name}");
        Ok(ApplyResult::Removed)
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.api.list(&self.endpoint)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::is_missing_dependency;
    use manage::{Call, MockManageApi, Payload};

    fn role(body: &str) -> ResourcePayload {
        ResourcePayload::new(ResourceKind::Role, Payload::json(body))
    }

    fn manager(api: &MockManageApi, kind: ResourceKind, scope: Scope) -> RestResourceManager {
        RestResourceManager::new(Arc::new(api.clone()), kind, scope).unwrap()
    }

    #[test]
    fn test_save_is_idempotent() {
        let api = MockManageApi::new();
        let roles = manager(&api, ResourceKind::Role, Scope::global());
        let payload = role(r#"{"role-name": "reader", "description": "reads"}"#);

        assert_eq!(roles.save(&payload).unwrap(), ApplyResult::Created);
        let after_first = api.resource("/manage/v2/roles", "reader");

        assert_eq!(roles.save(&payload).unwrap(), ApplyResult::NoChange);
        assert_eq!(api.resource("/manage/v2/roles", "reader"), after_first);
        assert_eq!(api.calls().len(), 1);
    }

    #[test]
    fn test_save_updates_changed_definition() {
        let api = MockManageApi::new();
        let roles = manager(&api, ResourceKind::Role, Scope::global());
        roles
            .save(&role(r#"{"role-name": "reader", "description": "one"}"#))
            .unwrap();

        let changed = role(r#"{"role-name": "reader", "description": "two"}"#);
        assert_eq!(roles.save(&changed).unwrap(), ApplyResult::Modified);
        assert_eq!(
            api.resource("/manage/v2/roles", "reader"),
            Some(changed.payload)
        );
        assert!(matches!(api.calls().last(), Some(Call::Update { .. })));
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let api = MockManageApi::new();
        let roles = manager(&api, ResourceKind::Role, Scope::global());
        assert_eq!(roles.delete("ghost").unwrap(), ApplyResult::NoChange);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_delete_existing() {
        let api = MockManageApi::new();
        let roles = manager(&api, ResourceKind::Role, Scope::global());
        roles.save(&role(r#"{"role-name": "reader"}"#)).unwrap();

        assert_eq!(roles.delete("reader").unwrap(), ApplyResult::Removed);
        assert!(!roles.exists("reader").unwrap());
        assert!(roles.list().unwrap().is_empty());
    }

    #[test]
    fn test_scoped_save_without_database_is_missing_dependency() {
        let api = MockManageApi::new();
        let triggers = manager(&api, ResourceKind::Trigger, Scope::database("app-triggers"));
        let payload =
            ResourcePayload::new(ResourceKind::Trigger, Payload::json(r#"{"name": "t1"}"#));

        let err = triggers.save(&payload).unwrap_err();
        assert!(is_missing_dependency(&err));
    }

    #[test]
    fn test_resource_id_after_create() {
        let api = MockManageApi::new();
        let templates = manager(&api, ResourceKind::CertificateTemplate, Scope::global());
        let payload = ResourcePayload::new(
            ResourceKind::CertificateTemplate,
            Payload::json(r#"{"template-name": "app-template"}"#),
        );
        templates.save(&payload).unwrap();

        assert!(templates.resource_id("app-template").unwrap().is_some());
        assert_eq!(templates.resource_id("other").unwrap(), None);
    }
}
