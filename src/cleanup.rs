//! Teardown of previously provisioned resources.
//!
//! The sweeper reads the registry written by a provisioning run and removes
//! every resource it names: bucket contents first, then the buckets, then the
//! tables. Resources that have already disappeared are treated as done rather
//! than as failures so an interrupted sweep can simply be re-run.

use crate::backend::{Backend, ResourceKind, ResourceRef};
use crate::provision::ProgressSink;
use crate::registry::Registry;
use thiserror::Error;

/// Counts of what a sweep removed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CleanupSummary {
    /// Buckets deleted.
    pub deleted_buckets: usize,
    /// Tables deleted.
    pub deleted_tables: usize,
    /// Objects and delete markers removed while emptying buckets.
    pub deleted_objects: usize,
}

/// Raised when a sweep cannot remove a resource.
#[derive(Debug, Error)]
#[error("failed to remove {resource}: {source}")]
pub struct CleanupError<E>
where
    E: std::error::Error + 'static,
{
    /// Resource the sweep was removing.
    pub resource: ResourceRef,
    /// Underlying backend failure.
    #[source]
    pub source: E,
}

/// Removes every resource a registry names.
pub struct CleanupSweeper<B, P>
where
    B: Backend,
    P: ProgressSink,
{
    backend: B,
    progress: P,
}

impl<B, P> CleanupSweeper<B, P>
where
    B: Backend,
    P: ProgressSink,
{
    /// Creates a sweeper over `backend`, reporting through `progress`.
    #[must_use]
    pub const fn new(backend: B, progress: P) -> Self {
        Self { backend, progress }
    }

    /// Removes every resource in `registry`, target resources first.
    ///
    /// The registry records resources in creation order, source first, so the
    /// sweep walks it in reverse. Buckets are emptied before deletion.
    ///
    /// # Errors
    ///
    /// Returns [`CleanupError`] naming the first resource that could not be
    /// removed. Resources already removed by an earlier sweep are skipped.
    pub async fn sweep(&self, registry: &Registry) -> Result<CleanupSummary, CleanupError<B::Error>> {
        let mut summary = CleanupSummary::default();
        let mut resources = registry.resources();
        resources.reverse();
        for resource in resources {
            self.progress.step(&format!("removing {resource}"));
            match resource.kind {
                ResourceKind::Bucket => {
                    let removed = self
                        .backend
                        .purge_bucket(&resource)
                        .await
                        .map_err(|source| CleanupError {
                            resource: resource.clone(),
                            source,
                        })?;
                    summary.deleted_objects =
                        summary.deleted_objects.saturating_add(removed);
                    summary.deleted_buckets = summary.deleted_buckets.saturating_add(1);
                }
                ResourceKind::Table => {
                    self.backend
                        .delete_table(&resource)
                        .await
                        .map_err(|source| CleanupError {
                            resource: resource.clone(),
                            source,
                        })?;
                    summary.deleted_tables = summary.deleted_tables.saturating_add(1);
                }
            }
            self.progress.step(&format!("removed {resource}"));
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingProgress, ScriptedBackend, ScriptedBackendError, ScriptedOp};

    fn resource(kind: ResourceKind, name: &str, region: &str) -> ResourceRef {
        ResourceRef {
            kind,
            name: name.to_owned(),
            region: region.to_owned(),
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::default();
        registry.record_source(&resource(ResourceKind::Bucket, "demo-source-ab12c", "us-east-1"));
        registry.record_source(&resource(ResourceKind::Table, "demo-user-data-ab12c", "us-east-1"));
        registry.record_target(&resource(
            ResourceKind::Bucket,
            "demo-target-us-west-2-ab12c",
            "us-west-2",
        ));
        registry.record_target(&resource(
            ResourceKind::Table,
            "demo-target-us-west-2-user-data-ab12c",
            "us-west-2",
        ));
        registry
    }

    #[tokio::test]
    async fn sweeps_targets_before_the_source() {
        let backend = ScriptedBackend::new();
        let progress = RecordingProgress::default();
        let sweeper = CleanupSweeper::new(backend.clone(), progress);

        let summary = sweeper
            .sweep(&registry())
            .await
            .unwrap_or_else(|err| panic!("sweep should succeed: {err}"));

        assert_eq!(summary.deleted_buckets, 2);
        assert_eq!(summary.deleted_tables, 2);
        assert_eq!(
            backend.operations(),
            [
                "delete-table demo-target-us-west-2-user-data-ab12c",
                "purge-bucket demo-target-us-west-2-ab12c",
                "delete-table demo-user-data-ab12c",
                "purge-bucket demo-source-ab12c",
            ]
        );
    }

    #[tokio::test]
    async fn accumulates_purged_object_counts() {
        let backend = ScriptedBackend::new();
        backend.set_purged_objects("demo-source-ab12c", 7);
        backend.set_purged_objects("demo-target-us-west-2-ab12c", 3);
        let sweeper = CleanupSweeper::new(backend, RecordingProgress::default());

        let summary = sweeper
            .sweep(&registry())
            .await
            .unwrap_or_else(|err| panic!("sweep should succeed: {err}"));

        assert_eq!(summary.deleted_objects, 10);
    }

    #[tokio::test]
    async fn stops_at_the_first_failure_and_names_the_resource() {
        let backend = ScriptedBackend::new();
        backend.fail(
            "demo-target-us-west-2-ab12c",
            ScriptedOp::Purge,
            ScriptedBackendError::Provider(String::from("demo-target-us-west-2-ab12c")),
        );
        let sweeper = CleanupSweeper::new(backend.clone(), RecordingProgress::default());

        let Err(err) = sweeper.sweep(&registry()).await else {
            panic!("sweep should fail on the scripted purge error");
        };
        assert_eq!(err.resource.name, "demo-target-us-west-2-ab12c");
        // The target table sweep ran before the failing bucket purge.
        assert_eq!(backend.operations().len(), 2);
    }
}
