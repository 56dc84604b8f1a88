//! Deletion of previously provisioned resources.
//!
//! Versioned buckets cannot be deleted while any object version or delete
//! marker remains, so the purge loops over version listings until the bucket
//! is empty before issuing the bucket delete. Resources that no longer exist
//! count as already cleaned up.

use crate::backend::ResourceRef;

use super::super::{AwsBackend, AwsBackendError};

fn s3_provider_error<E, R>(err: &aws_sdk_s3::error::SdkError<E, R>) -> AwsBackendError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    AwsBackendError::Provider {
        message: aws_sdk_s3::error::DisplayErrorContext(err).to_string(),
    }
}

impl AwsBackend {
    pub(in crate::aws) async fn purge_bucket_inner(
        &self,
        resource: &ResourceRef,
    ) -> Result<usize, AwsBackendError> {
        let client = self.s3(&resource.region);

        let exists = match client.head_bucket().bucket(&resource.name).send().await {
            Ok(_) => true,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(aws_sdk_s3::operation::head_bucket::HeadBucketError::is_not_found) =>
            {
                false
            }
            Err(err) => return Err(s3_provider_error(&err)),
        };
        if !exists {
            return Ok(0);
        }

        let mut deleted = 0;
        loop {
            let listing = client
                .list_object_versions()
                .bucket(&resource.name)
                .send()
                .await
                .map_err(|err| s3_provider_error(&err))?;

            let mut targets: Vec<(String, Option<String>)> = Vec::new();
            for version in listing.versions() {
                if let Some(key) = version.key() {
                    targets.push((key.to_owned(), version.version_id().map(str::to_owned)));
                }
            }
            for marker in listing.delete_markers() {
                if let Some(key) = marker.key() {
                    targets.push((key.to_owned(), marker.version_id().map(str::to_owned)));
                }
            }

            if targets.is_empty() {
                break;
            }

            for (key, version_id) in targets {
                let mut request = client.delete_object().bucket(&resource.name).key(key);
                if let Some(id) = version_id {
                    request = request.version_id(id);
                }
                request
                    .send()
                    .await
                    .map_err(|err| s3_provider_error(&err))?;
                deleted += 1;
            }
        }

        client
            .delete_bucket()
            .bucket(&resource.name)
            .send()
            .await
            .map_err(|err| s3_provider_error(&err))?;

        Ok(deleted)
    }

    pub(in crate::aws) async fn delete_table_inner(
        &self,
        resource: &ResourceRef,
    ) -> Result<(), AwsBackendError> {
        let client = self.dynamodb(&resource.region);
        match client.delete_table().table_name(&resource.name).send().await {
            Ok(_) => self.wait_until_table_gone(resource).await,
            Err(err)
                if err.as_service_error().is_some_and(
                    aws_sdk_dynamodb::operation::delete_table::DeleteTableError::is_resource_not_found_exception,
                ) =>
            {
                Ok(())
            }
            Err(err) => Err(AwsBackendError::Provider {
                message: aws_sdk_dynamodb::error::DisplayErrorContext(&err).to_string(),
            }),
        }
    }
}
