//! AWS implementation of the resource-provisioning backend.
//!
//! Buckets go through S3, tables through DynamoDB. Clients are derived per
//! region from one shared base configuration so a multi-region plan reuses
//! credentials and connector state.

mod error;
mod lifecycle;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use aws_config::{BehaviorVersion, SdkConfig};

use crate::backend::{Backend, BackendFuture, ResourceKind, ResourceRef, ResourceSpec};
use crate::cancel::CancelToken;

pub use error::AwsBackendError;

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const WAIT_TIMEOUT: Duration = Duration::from_secs(300);
const PROJECT_TAG: &str = "MigrationDemo";

/// Backend that provisions buckets and tables through the AWS control plane.
#[derive(Debug)]
pub struct AwsBackend {
    base_config: SdkConfig,
    s3_clients: Mutex<HashMap<String, aws_sdk_s3::Client>>,
    ddb_clients: Mutex<HashMap<String, aws_sdk_dynamodb::Client>>,
    poll_interval: Duration,
    wait_timeout: Duration,
    project_tag: String,
    cancel: CancelToken,
}

impl AwsBackend {
    /// Constructs a backend over an already-loaded SDK configuration.
    #[must_use]
    pub fn new(base_config: SdkConfig) -> Self {
        Self {
            base_config,
            s3_clients: Mutex::new(HashMap::new()),
            ddb_clients: Mutex::new(HashMap::new()),
            poll_interval: POLL_INTERVAL,
            wait_timeout: WAIT_TIMEOUT,
            project_tag: String::from(PROJECT_TAG),
            cancel: CancelToken::never(),
        }
    }

    /// Loads credentials and defaults from the environment and constructs a
    /// backend.
    pub async fn from_env() -> Self {
        let base_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(base_config)
    }

    /// Overrides the readiness polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the readiness wait deadline.
    #[must_use]
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Overrides the `Project` tag value applied to created tables.
    #[must_use]
    pub fn with_project_tag(mut self, value: impl Into<String>) -> Self {
        self.project_tag = value.into();
        self
    }

    /// Attaches a cancellation token observed between readiness polls.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub(in crate::aws) const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(in crate::aws) const fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    pub(in crate::aws) const fn cancel(&self) -> &CancelToken {
        &self.cancel
    }

    pub(in crate::aws) fn project_tag(&self) -> &str {
        &self.project_tag
    }

    pub(in crate::aws) fn s3(&self, region: &str) -> aws_sdk_s3::Client {
        let mut clients = self
            .s3_clients
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        clients
            .entry(region.to_owned())
            .or_insert_with(|| {
                let config = aws_sdk_s3::config::Builder::from(&self.base_config)
                    .region(aws_sdk_s3::config::Region::new(region.to_owned()))
                    .build();
                aws_sdk_s3::Client::from_conf(config)
            })
            .clone()
    }

    pub(in crate::aws) fn dynamodb(&self, region: &str) -> aws_sdk_dynamodb::Client {
        let mut clients = self
            .ddb_clients
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        clients
            .entry(region.to_owned())
            .or_insert_with(|| {
                let config = aws_sdk_dynamodb::config::Builder::from(&self.base_config)
                    .region(aws_sdk_dynamodb::config::Region::new(region.to_owned()))
                    .build();
                aws_sdk_dynamodb::Client::from_conf(config)
            })
            .clone()
    }
}

impl Backend for AwsBackend {
    type Error = AwsBackendError;

    fn create_bucket<'a>(
        &'a self,
        spec: &'a ResourceSpec,
    ) -> BackendFuture<'a, ResourceRef, Self::Error> {
        Box::pin(async move {
            spec.validate()?;
            self.create_bucket_inner(spec).await
        })
    }

    fn create_table<'a>(
        &'a self,
        spec: &'a ResourceSpec,
    ) -> BackendFuture<'a, ResourceRef, Self::Error> {
        Box::pin(async move {
            spec.validate()?;
            self.create_table_inner(spec).await
        })
    }

    fn wait_until_active<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move {
            match resource.kind {
                ResourceKind::Bucket => self.wait_for_bucket(resource).await,
                ResourceKind::Table => self.wait_for_table_active(resource).await,
            }
        })
    }

    fn purge_bucket<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BackendFuture<'a, usize, Self::Error> {
        Box::pin(async move { self.purge_bucket_inner(resource).await })
    }

    fn delete_table<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move { self.delete_table_inner(resource).await })
    }
}
