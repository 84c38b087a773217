//! Remote resources and the managers that reconcile them
//!
//! Every deployable object is described by a [`ResourcePayload`] of some
//! [`ResourceKind`] and reconciled through a [`ResourceManager`]:
//! - `exists` reads remote state, never mutates
//! - `save` creates when absent and updates only when the definition differs
//! - `delete` removes, and treats an absent resource as done

use anyhow::Result;
use declarative::ApplyResult;

pub mod kind;
pub mod manager;
pub mod payload;
pub mod rest_api;

pub use kind::{ResourceKind, Scope};
pub use manager::RestResourceManager;
pub use payload::ResourcePayload;
pub use rest_api::RestApiManager;

/// Reconciles one resource kind in one scope against the management API
pub trait ResourceManager {
    fn kind(&self) -> ResourceKind;

    fn exists(&self, name: &str) -> Result<bool>;

    /// Idempotent upsert. Saving the same definition twice changes nothing
    /// the second time.
    fn save(&self, payload: &ResourcePayload) -> Result<ApplyResult>;

    /// Remove an instance. Returns `NoChange` when it was already absent.
    fn delete(&self, name: &str) -> Result<ApplyResult>;

    fn list(&self) -> Result<Vec<String>>;
}

/// Whether an error means the owning database does not exist yet.
///
/// Looks through the whole context chain for a classified client error.
pub fn is_missing_dependency(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<manage::Error>())
        .any(manage::Error::is_recoverable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_missing_dependency_found_through_context() {
        let err: Result<()> = Err(manage::Error::MissingDependency {
            code: "XDMP-NOSUCHDB".to_string(),
            message: "No such database app-triggers".to_string(),
        })
        .context("Unable to save trigger t1");
        assert!(is_missing_dependency(&err.unwrap_err()));
    }

    #[test]
    fn test_other_errors_not_missing_dependency() {
        let err = anyhow::Error::new(manage::Error::Http {
            status: 500,
            code: None,
            message: "boom".to_string(),
        });
        assert!(!is_missing_dependency(&err));
        assert!(!is_missing_dependency(&anyhow::anyhow!("plain")));
    }
}
