//! Error types for the provisioning workflow.

use thiserror::Error;

use crate::backend::{ProvisionedResource, ResourceRef};
use crate::registry::RegistryError;

/// The step at which a provisioning run failed.
#[derive(Debug, Error)]
pub enum ProvisionError<E>
where
    E: std::error::Error + 'static,
{
    /// Raised when the create request for a resource fails.
    #[error("failed to create {resource}: {source}")]
    Create {
        /// Resource being created.
        resource: ResourceRef,
        /// Provider-specific error.
        #[source]
        source: E,
    },
    /// Raised when a created resource never reports an active state.
    #[error("{resource} did not become active: {source}")]
    Wait {
        /// Resource being waited on.
        resource: ResourceRef,
        /// Provider-specific error.
        #[source]
        source: E,
    },
    /// Raised when persisting the registry fails. Fatal: without the
    /// registry, downstream scripts cannot discover the created names.
    #[error("failed to record {resource} in the registry: {source}")]
    Registry {
        /// Resource that had just become active.
        resource: ResourceRef,
        /// Underlying registry error.
        #[source]
        source: RegistryError,
    },
}

/// A provisioning run that aborted after creating zero or more resources.
///
/// There is no automatic rollback; the `created` ledger lists every resource
/// that was confirmed active before the failure so the operator can
/// reconcile or delete them.
#[derive(Debug, Error)]
#[error("provisioning aborted: {error}")]
pub struct AbortedRun<E>
where
    E: std::error::Error + 'static,
{
    /// Resources confirmed active before the run aborted, in creation order.
    pub created: Vec<ProvisionedResource>,
    /// The failure that aborted the run.
    #[source]
    pub error: ProvisionError<E>,
}
