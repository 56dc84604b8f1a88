//! Orchestrates a full provisioning run.
//!
//! The workflow is strictly sequential: for each planned resource the
//! orchestrator issues the create call, blocks until the resource is
//! confirmed active, persists the updated registry, and only then moves on.
//! Source-region resources are always created before any target-region
//! resource. Any failure aborts the run; already-created resources are
//! carried in the abort report rather than rolled back.

use std::io::{self, Write};

use crate::backend::{
    Backend, ProvisionedResource, ResourceKind, ResourceRef, ResourceStatus,
};
use crate::plan::ProvisionPlan;
use crate::registry::{Registry, RegistryWriter};

mod error;
#[cfg(test)]
mod tests;

pub use error::{AbortedRun, ProvisionError};

/// Sink for per-step progress messages.
///
/// The baseline behaviour is plain text on standard output; tests install a
/// recording sink instead.
pub trait ProgressSink {
    /// Reports one progress message.
    fn step(&self, message: &str);
}

/// Progress sink that writes each message as a line on standard output.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutProgress;

impl ProgressSink for StdoutProgress {
    fn step(&self, message: &str) {
        writeln!(io::stdout(), "{message}").ok();
    }
}

/// Successful outcome of a provisioning run.
#[derive(Clone, Debug)]
pub struct ProvisionOutcome {
    /// Every resource created, in creation order, all active.
    pub resources: Vec<ProvisionedResource>,
    /// Final registry value as persisted.
    pub registry: Registry,
}

/// Executes the provisioning workflow against a backend and registry writer.
#[derive(Debug)]
pub struct ProvisionOrchestrator<B, W, P> {
    backend: B,
    writer: W,
    progress: P,
}

impl<B, W, P> ProvisionOrchestrator<B, W, P>
where
    B: Backend,
    W: RegistryWriter,
    P: ProgressSink,
{
    /// Creates a new orchestrator.
    #[must_use]
    pub const fn new(backend: B, writer: W, progress: P) -> Self {
        Self {
            backend,
            writer,
            progress,
        }
    }

    /// Runs the plan to completion.
    ///
    /// # Errors
    ///
    /// Returns [`AbortedRun`] on the first create, wait, or registry
    /// failure. The report carries every resource whose create call
    /// succeeded, each with its last observed status, including a resource
    /// that was created but never became active.
    pub async fn execute(
        &self,
        plan: &ProvisionPlan,
    ) -> Result<ProvisionOutcome, AbortedRun<B::Error>> {
        let mut registry = Registry::default();
        let mut created: Vec<ProvisionedResource> = Vec::new();

        for (index, spec) in plan.resources().iter().enumerate() {
            let handle = spec.handle();
            self.progress.step(&format!("creating {handle}"));
            let resource = match spec.kind() {
                ResourceKind::Bucket => self.backend.create_bucket(spec).await,
                ResourceKind::Table => self.backend.create_table(spec).await,
            }
            .map_err(|source| abort(&created, ProvisionError::Create {
                resource: handle.clone(),
                source,
            }))?;

            // The remote resource exists once create returns, so it enters
            // the ledger before the readiness wait.
            created.push(ProvisionedResource {
                resource: resource.clone(),
                status: ResourceStatus::Creating,
            });

            self.progress
                .step(&format!("waiting for {resource} to become active"));
            if let Err(source) = self.backend.wait_until_active(&resource).await {
                set_last_status(&mut created, ResourceStatus::Failed);
                return Err(abort(&created, ProvisionError::Wait { resource, source }));
            }
            set_last_status(&mut created, ResourceStatus::Active);

            record(&mut registry, index < plan.source_len(), &resource);
            self.writer
                .save(&registry)
                .map_err(|source| abort(&created, ProvisionError::Registry {
                    resource: resource.clone(),
                    source,
                }))?;

            self.progress.step(&format!("{resource} is active"));
        }

        Ok(ProvisionOutcome {
            resources: created,
            registry,
        })
    }
}

fn set_last_status(created: &mut [ProvisionedResource], status: ResourceStatus) {
    if let Some(last) = created.last_mut() {
        last.status = status;
    }
}

fn record(registry: &mut Registry, is_source: bool, resource: &ResourceRef) {
    if is_source {
        registry.record_source(resource);
    } else {
        registry.record_target(resource);
    }
}

fn abort<E>(created: &[ProvisionedResource], error: ProvisionError<E>) -> AbortedRun<E>
where
    E: std::error::Error + 'static,
{
    AbortedRun {
        created: created.to_vec(),
        error,
    }
}
