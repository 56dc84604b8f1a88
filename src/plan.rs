//! Run context and resource planning.
//!
//! A [`RunContext`] is built once per invocation and passed explicitly to
//! every component; nothing here is ambient or mutable. The
//! [`ProvisionPlan`] resolves the full ordered list of resources a run will
//! create: source-region resources strictly before any target-region
//! resources. Target table replication wiring, if added later, depends on
//! the source table and its stream existing, so the ordering is preserved
//! even though no such step runs today.

use crate::backend::{
    BackendError, BucketAttributes, ResourceKind, ResourceSpec, TableAttributes,
};
use crate::run_id::RunId;

/// Immutable per-invocation inputs shared by every provisioning step.
#[derive(Clone, Debug)]
pub struct RunContext {
    /// Project name used as the prefix of every resolved resource name.
    pub project: String,
    /// Run-scoped collision-avoidance suffix.
    pub run_id: RunId,
    /// Region hosting the source resources.
    pub source_region: String,
    /// Target regions, provisioned in this order.
    pub target_regions: Vec<String>,
}

impl RunContext {
    /// Resolves the source bucket name for this run.
    #[must_use]
    pub fn source_bucket_name(&self) -> String {
        format!("{}-source-{}", self.project, self.run_id)
    }

    /// Resolves the source table name for this run.
    #[must_use]
    pub fn source_table_name(&self) -> String {
        format!("{}-user-data-{}", self.project, self.run_id)
    }

    /// Resolves the bucket name for one target region.
    #[must_use]
    pub fn target_bucket_name(&self, region: &str) -> String {
        format!("{}-target-{region}-{}", self.project, self.run_id)
    }

    /// Resolves the table name for one target region.
    #[must_use]
    pub fn target_table_name(&self, region: &str) -> String {
        format!("{}-target-{region}-user-data-{}", self.project, self.run_id)
    }
}

/// Ordered sequence of resources one run creates.
#[derive(Clone, Debug)]
pub struct ProvisionPlan {
    resources: Vec<ResourceSpec>,
}

impl ProvisionPlan {
    /// Resolves the plan for a run context.
    ///
    /// The order is: source bucket, source table, then per target region (in
    /// the configured order) the target bucket followed by the target table.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Validation`] when a resolved name violates
    /// service naming rules, for example when the project name pushes a
    /// bucket name past its length limit.
    pub fn resolve(
        context: &RunContext,
        table_attributes: &TableAttributes,
    ) -> Result<Self, BackendError> {
        let mut resources = Vec::with_capacity(2 + context.target_regions.len() * 2);

        resources.push(
            ResourceSpec::builder()
                .name(context.source_bucket_name())
                .region(&context.source_region)
                .bucket(BucketAttributes::default())
                .build()?,
        );
        resources.push(
            ResourceSpec::builder()
                .name(context.source_table_name())
                .region(&context.source_region)
                .table(table_attributes.clone())
                .build()?,
        );

        for region in &context.target_regions {
            resources.push(
                ResourceSpec::builder()
                    .name(context.target_bucket_name(region))
                    .region(region)
                    .bucket(BucketAttributes::default())
                    .build()?,
            );
            // Target tables never carry a stream; only the source table's
            // mutations feed downstream consumers.
            let target_attributes = TableAttributes {
                stream_enabled: false,
                ..table_attributes.clone()
            };
            resources.push(
                ResourceSpec::builder()
                    .name(context.target_table_name(region))
                    .region(region)
                    .table(target_attributes)
                    .build()?,
            );
        }

        Ok(Self { resources })
    }

    /// Returns the planned resources in creation order.
    #[must_use]
    pub fn resources(&self) -> &[ResourceSpec] {
        &self.resources
    }

    /// Number of source-region resources at the front of the plan.
    #[must_use]
    pub const fn source_len(&self) -> usize {
        2
    }
}
