//! Deadline-bounded readiness and deletion waits.
//!
//! Each loop polls the control plane at the backend's configured interval
//! until the resource reaches the expected state, the deadline elapses, or
//! the operator cancels. Cancellation is observed between polls so an
//! interrupt never abandons a request mid-flight.

use std::time::Instant;

use tokio::time::sleep;

use crate::backend::ResourceRef;

use super::super::{AwsBackend, AwsBackendError};
use super::create::is_table_active;

impl AwsBackend {
    /// Sleeps one poll interval, returning early when cancelled.
    pub(in crate::aws) async fn pause_or_cancel(
        &self,
        resource: &ResourceRef,
    ) -> Result<(), AwsBackendError> {
        tokio::select! {
            () = sleep(self.poll_interval()) => Ok(()),
            () = self.cancel().cancelled() => Err(AwsBackendError::Cancelled {
                name: resource.name.clone(),
            }),
        }
    }

    fn check_cancelled(&self, resource: &ResourceRef) -> Result<(), AwsBackendError> {
        if self.cancel().is_cancelled() {
            return Err(AwsBackendError::Cancelled {
                name: resource.name.clone(),
            });
        }
        Ok(())
    }

    pub(in crate::aws) async fn wait_for_bucket(
        &self,
        resource: &ResourceRef,
    ) -> Result<(), AwsBackendError> {
        let client = self.s3(&resource.region);
        let deadline = Instant::now() + self.wait_timeout();
        while Instant::now() <= deadline {
            self.check_cancelled(resource)?;
            match client.head_bucket().bucket(&resource.name).send().await {
                Ok(_) => return Ok(()),
                Err(err)
                    if err
                        .as_service_error()
                        .is_some_and(aws_sdk_s3::operation::head_bucket::HeadBucketError::is_not_found) => {}
                Err(err) => {
                    return Err(AwsBackendError::Provider {
                        message: aws_sdk_s3::error::DisplayErrorContext(&err).to_string(),
                    });
                }
            }
            self.pause_or_cancel(resource).await?;
        }
        Err(AwsBackendError::Timeout {
            action: String::from("bucket readiness"),
            name: resource.name.clone(),
        })
    }

    pub(in crate::aws) async fn wait_for_table_active(
        &self,
        resource: &ResourceRef,
    ) -> Result<(), AwsBackendError> {
        let client = self.dynamodb(&resource.region);
        let deadline = Instant::now() + self.wait_timeout();
        while Instant::now() <= deadline {
            self.check_cancelled(resource)?;
            match client.describe_table().table_name(&resource.name).send().await {
                Ok(output) => {
                    let active = output
                        .table()
                        .and_then(|table| table.table_status())
                        .is_some_and(is_table_active);
                    if active {
                        return Ok(());
                    }
                }
                // The table may not be visible immediately after create.
                Err(err)
                    if err.as_service_error().is_some_and(
                        aws_sdk_dynamodb::operation::describe_table::DescribeTableError::is_resource_not_found_exception,
                    ) => {}
                Err(err) => {
                    return Err(AwsBackendError::Provider {
                        message: aws_sdk_dynamodb::error::DisplayErrorContext(&err).to_string(),
                    });
                }
            }
            self.pause_or_cancel(resource).await?;
        }
        Err(AwsBackendError::Timeout {
            action: String::from("table readiness"),
            name: resource.name.clone(),
        })
    }

    pub(in crate::aws) async fn wait_until_table_gone(
        &self,
        resource: &ResourceRef,
    ) -> Result<(), AwsBackendError> {
        let client = self.dynamodb(&resource.region);
        let deadline = Instant::now() + self.wait_timeout();
        while Instant::now() <= deadline {
            match client.describe_table().table_name(&resource.name).send().await {
                Err(err)
                    if err.as_service_error().is_some_and(
                        aws_sdk_dynamodb::operation::describe_table::DescribeTableError::is_resource_not_found_exception,
                    ) =>
                {
                    return Ok(());
                }
                Err(err) => {
                    return Err(AwsBackendError::Provider {
                        message: aws_sdk_dynamodb::error::DisplayErrorContext(&err).to_string(),
                    });
                }
                Ok(_) => {}
            }
            self.pause_or_cancel(resource).await?;
        }
        Err(AwsBackendError::Timeout {
            action: String::from("table deletion"),
            name: resource.name.clone(),
        })
    }
}
