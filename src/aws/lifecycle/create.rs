//! Creation requests for buckets and tables.
//!
//! Bucket creation outside `us-east-1` must carry an explicit location
//! constraint; versioning is a separate dependent call whose failure aborts
//! the run because downstream correctness relies on retaining every object
//! version. Tables are created with a composite key (string partition,
//! numeric sort) and optionally a change stream capturing both pre- and
//! post-images.

use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
    StreamSpecification, StreamViewType, Tag, TableStatus,
};
use aws_sdk_s3::types::{
    BucketLocationConstraint, BucketVersioningStatus, CreateBucketConfiguration,
    VersioningConfiguration,
};

use crate::backend::{ResourceAttributes, ResourceRef, ResourceSpec};

use super::super::{AwsBackend, AwsBackendError};

const PROJECT_TAG_KEY: &str = "Project";
const ENVIRONMENT_TAG_KEY: &str = "Environment";

pub(in crate::aws) fn location_constraint(region: &str) -> Option<BucketLocationConstraint> {
    // us-east-1 is the S3 default; the API rejects it as an explicit
    // constraint.
    (region != "us-east-1").then(|| BucketLocationConstraint::from(region))
}

pub(in crate::aws) fn environment_tag_value(name: &str, region: &str) -> String {
    if name.contains("-target-") {
        format!("Target-{region}")
    } else {
        String::from("Source")
    }
}

pub(in crate::aws) const fn is_table_active(status: &TableStatus) -> bool {
    matches!(status, TableStatus::Active)
}

fn build_error(err: impl std::fmt::Display) -> AwsBackendError {
    AwsBackendError::InvalidConfiguration {
        message: err.to_string(),
    }
}

impl AwsBackend {
    pub(in crate::aws) async fn create_bucket_inner(
        &self,
        spec: &ResourceSpec,
    ) -> Result<ResourceRef, AwsBackendError> {
        let ResourceAttributes::Bucket(attributes) = &spec.attributes else {
            return Err(AwsBackendError::InvalidConfiguration {
                message: format!("spec for '{}' does not describe a bucket", spec.name),
            });
        };

        let client = self.s3(&spec.region);
        let mut request = client.create_bucket().bucket(&spec.name);
        if let Some(constraint) = location_constraint(&spec.region) {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(constraint)
                    .build(),
            );
        }

        if let Err(err) = request.send().await {
            let conflict = err.as_service_error().is_some_and(|service_err| {
                service_err.is_bucket_already_exists()
                    || service_err.is_bucket_already_owned_by_you()
            });
            if conflict {
                return Err(AwsBackendError::NamingConflict {
                    kind: String::from("bucket"),
                    name: spec.name.clone(),
                    region: spec.region.clone(),
                });
            }
            return Err(AwsBackendError::Provider {
                message: aws_sdk_s3::error::DisplayErrorContext(&err).to_string(),
            });
        }

        if attributes.versioning {
            client
                .put_bucket_versioning()
                .bucket(&spec.name)
                .versioning_configuration(
                    VersioningConfiguration::builder()
                        .status(BucketVersioningStatus::Enabled)
                        .build(),
                )
                .send()
                .await
                .map_err(|err| AwsBackendError::Provider {
                    message: aws_sdk_s3::error::DisplayErrorContext(&err).to_string(),
                })?;
        }

        Ok(spec.handle())
    }

    pub(in crate::aws) async fn create_table_inner(
        &self,
        spec: &ResourceSpec,
    ) -> Result<ResourceRef, AwsBackendError> {
        let ResourceAttributes::Table(attributes) = &spec.attributes else {
            return Err(AwsBackendError::InvalidConfiguration {
                message: format!("spec for '{}' does not describe a table", spec.name),
            });
        };

        let billing_mode = if attributes.on_demand {
            BillingMode::PayPerRequest
        } else {
            BillingMode::Provisioned
        };

        let mut request = self
            .dynamodb(&spec.region)
            .create_table()
            .table_name(&spec.name)
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(&attributes.partition_key)
                    .key_type(KeyType::Hash)
                    .build()
                    .map_err(build_error)?,
            )
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(&attributes.sort_key)
                    .key_type(KeyType::Range)
                    .build()
                    .map_err(build_error)?,
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(&attributes.partition_key)
                    .attribute_type(ScalarAttributeType::S)
                    .build()
                    .map_err(build_error)?,
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(&attributes.sort_key)
                    .attribute_type(ScalarAttributeType::N)
                    .build()
                    .map_err(build_error)?,
            )
            .billing_mode(billing_mode)
            .tags(
                Tag::builder()
                    .key(PROJECT_TAG_KEY)
                    .value(self.project_tag())
                    .build()
                    .map_err(build_error)?,
            )
            .tags(
                Tag::builder()
                    .key(ENVIRONMENT_TAG_KEY)
                    .value(environment_tag_value(&spec.name, &spec.region))
                    .build()
                    .map_err(build_error)?,
            );

        if attributes.stream_enabled {
            request = request.stream_specification(
                StreamSpecification::builder()
                    .stream_enabled(true)
                    .stream_view_type(StreamViewType::NewAndOldImages)
                    .build()
                    .map_err(build_error)?,
            );
        }

        if let Err(err) = request.send().await {
            if err
                .as_service_error()
                .is_some_and(aws_sdk_dynamodb::operation::create_table::CreateTableError::is_resource_in_use_exception)
            {
                return Err(AwsBackendError::NamingConflict {
                    kind: String::from("table"),
                    name: spec.name.clone(),
                    region: spec.region.clone(),
                });
            }
            return Err(AwsBackendError::Provider {
                message: aws_sdk_dynamodb::error::DisplayErrorContext(&err).to_string(),
            });
        }

        Ok(spec.handle())
    }
}
