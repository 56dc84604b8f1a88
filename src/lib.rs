//! Core library for the Caravan provisioning tool.
//!
//! The crate exposes a backend abstraction for creating cloud storage
//! resources and an AWS implementation that powers the migration-demo
//! lifecycle (create → wait until active → record in the registry), plus the
//! registry format, sample-data fixtures, and the cleanup sweeper.

pub mod aws;
pub mod backend;
pub mod cancel;
pub mod cleanup;
pub mod config;
pub mod plan;
pub mod provision;
pub mod registry;
pub mod run_id;
pub mod sample_data;
pub mod test_support;

pub use aws::{AwsBackend, AwsBackendError};
pub use backend::{
    Backend, BucketAttributes, ProvisionedResource, ResourceAttributes, ResourceKind, ResourceRef,
    ResourceSpec, ResourceSpecBuilder, ResourceStatus, TableAttributes,
};
pub use cancel::{CancelHandle, CancelToken, cancel_pair};
pub use cleanup::{CleanupError, CleanupSummary, CleanupSweeper};
pub use config::{ConfigError, ProvisionConfig};
pub use plan::{ProvisionPlan, RunContext};
pub use provision::{
    AbortedRun, ProgressSink, ProvisionError, ProvisionOrchestrator, ProvisionOutcome,
    StdoutProgress,
};
pub use registry::{Registry, RegistryError, RegistryStore, RegistryWriter, TargetEntry};
pub use run_id::{RUN_ID_LEN, RunId};
