//! Backend abstraction for provisioning managed storage resources.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Kinds of managed resources the provisioner knows how to create.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    /// Object-storage bucket scoped to one region.
    Bucket,
    /// Key-value table with a composite primary key.
    Table,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bucket => f.write_str("bucket"),
            Self::Table => f.write_str("table"),
        }
    }
}

/// Bucket-specific creation attributes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BucketAttributes {
    /// Whether object versioning is enabled after creation. Downstream
    /// correctness depends on retaining all object versions, so a failure to
    /// enable versioning is fatal to the run.
    pub versioning: bool,
}

impl Default for BucketAttributes {
    fn default() -> Self {
        Self { versioning: true }
    }
}

/// Table-specific creation attributes.
///
/// The key schema is fixed to the shape the demo data uses: a string
/// partition attribute and a numeric sort attribute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableAttributes {
    /// Name of the string partition (hash) attribute.
    pub partition_key: String,
    /// Name of the numeric sort (range) attribute.
    pub sort_key: String,
    /// Whether the table bills per request rather than via provisioned
    /// capacity.
    pub on_demand: bool,
    /// Whether a change stream capturing both pre- and post-images of
    /// mutations is attached to the table.
    pub stream_enabled: bool,
}

impl Default for TableAttributes {
    fn default() -> Self {
        Self {
            partition_key: String::from("UserID"),
            sort_key: String::from("Timestamp"),
            on_demand: true,
            stream_enabled: true,
        }
    }
}

/// Kind-specific attributes attached to a [`ResourceSpec`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResourceAttributes {
    /// Attributes for an object-storage bucket.
    Bucket(BucketAttributes),
    /// Attributes for a key-value table.
    Table(TableAttributes),
}

impl ResourceAttributes {
    /// Returns the resource kind described by these attributes.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Bucket(_) => ResourceKind::Bucket,
            Self::Table(_) => ResourceKind::Table,
        }
    }
}

/// Fully resolved description of one resource to create.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceSpec {
    /// Resolved, run-unique resource name.
    pub name: String,
    /// Region the resource is created in.
    pub region: String,
    /// Kind-specific creation attributes.
    pub attributes: ResourceAttributes,
}

impl ResourceSpec {
    /// Starts a builder for a [`ResourceSpec`].
    #[must_use]
    pub fn builder() -> ResourceSpecBuilder {
        ResourceSpecBuilder::default()
    }

    /// Returns the resource kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.attributes.kind()
    }

    /// Returns a lightweight handle referring to this resource.
    #[must_use]
    pub fn handle(&self) -> ResourceRef {
        ResourceRef {
            kind: self.kind(),
            name: self.name.clone(),
            region: self.region.clone(),
        }
    }

    /// Validates the resolved name and region against service naming rules.
    ///
    /// Bucket names must be 3-63 lowercase alphanumeric characters or
    /// hyphens with no leading or trailing hyphen. Table names must be 3-255
    /// characters drawn from letters, digits, underscore, dot, and hyphen.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Validation`] when a rule is violated.
    pub fn validate(&self) -> Result<(), BackendError> {
        if self.region.trim().is_empty() {
            return Err(BackendError::Validation(String::from("region is empty")));
        }
        match self.kind() {
            ResourceKind::Bucket => validate_bucket_name(&self.name),
            ResourceKind::Table => validate_table_name(&self.name),
        }
    }
}

fn validate_bucket_name(name: &str) -> Result<(), BackendError> {
    if name.len() < 3 || name.len() > 63 {
        return Err(BackendError::Validation(format!(
            "bucket name '{name}' must be 3-63 characters"
        )));
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
    {
        return Err(BackendError::Validation(format!(
            "bucket name '{name}' may only contain lowercase letters, digits, and hyphens"
        )));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(BackendError::Validation(format!(
            "bucket name '{name}' must not start or end with a hyphen"
        )));
    }
    Ok(())
}

fn validate_table_name(name: &str) -> Result<(), BackendError> {
    if name.len() < 3 || name.len() > 255 {
        return Err(BackendError::Validation(format!(
            "table name '{name}' must be 3-255 characters"
        )));
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
    {
        return Err(BackendError::Validation(format!(
            "table name '{name}' may only contain letters, digits, underscore, dot, and hyphen"
        )));
    }
    Ok(())
}

/// Builder for [`ResourceSpec`] that defers trimming and validation to
/// construction.
#[derive(Clone, Debug, Default)]
pub struct ResourceSpecBuilder {
    name: String,
    region: String,
    attributes: Option<ResourceAttributes>,
}

impl ResourceSpecBuilder {
    /// Sets the resolved resource name.
    #[must_use]
    pub fn name(mut self, value: impl Into<String>) -> Self {
        self.name = value.into();
        self
    }

    /// Sets the target region.
    #[must_use]
    pub fn region(mut self, value: impl Into<String>) -> Self {
        self.region = value.into();
        self
    }

    /// Marks the spec as a bucket with the given attributes.
    #[must_use]
    pub fn bucket(mut self, attributes: BucketAttributes) -> Self {
        self.attributes = Some(ResourceAttributes::Bucket(attributes));
        self
    }

    /// Marks the spec as a table with the given attributes.
    #[must_use]
    pub fn table(mut self, attributes: TableAttributes) -> Self {
        self.attributes = Some(ResourceAttributes::Table(attributes));
        self
    }

    /// Builds and validates the [`ResourceSpec`], trimming string inputs.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Validation`] when attributes are missing or a
    /// naming rule is violated.
    pub fn build(self) -> Result<ResourceSpec, BackendError> {
        let attributes = self
            .attributes
            .ok_or_else(|| BackendError::Validation(String::from("attributes are missing")))?;
        let spec = ResourceSpec {
            name: self.name.trim().to_owned(),
            region: self.region.trim().to_owned(),
            attributes,
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Handle identifying a resource that has been requested or created.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceRef {
    /// Kind of the resource.
    pub kind: ResourceKind,
    /// Resolved name of the resource.
    pub name: String,
    /// Region the resource lives in.
    pub region: String,
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} in {}", self.kind, self.name, self.region)
    }
}

/// Lifecycle states of a provisioned resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceStatus {
    /// Create request issued; readiness not yet confirmed.
    Creating,
    /// Readiness check succeeded; safe for dependent operations.
    Active,
    /// Creation or readiness confirmation failed.
    Failed,
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creating => f.write_str("creating"),
            Self::Active => f.write_str("active"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Record of one resource created during a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisionedResource {
    /// Handle for the created resource.
    pub resource: ResourceRef,
    /// Current lifecycle state.
    pub status: ResourceStatus,
}

/// Errors raised by backend request validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum BackendError {
    /// Raised when a spec violates service naming or attribute rules.
    #[error("invalid resource spec: {0}")]
    Validation(String),
}

/// Future returned by backend operations.
pub type BackendFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Minimal interface implemented by managed-service control planes.
pub trait Backend {
    /// Provider specific error type returned by the backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Creates a bucket and enables versioning when requested. Versioning is
    /// a separate dependent call; its failure is surfaced, never swallowed.
    fn create_bucket<'a>(
        &'a self,
        spec: &'a ResourceSpec,
    ) -> BackendFuture<'a, ResourceRef, Self::Error>;

    /// Creates a table with a composite key, billing mode, and optional
    /// change stream.
    fn create_table<'a>(
        &'a self,
        spec: &'a ResourceSpec,
    ) -> BackendFuture<'a, ResourceRef, Self::Error>;

    /// Blocks until the resource reports an active state or the configured
    /// deadline elapses.
    fn wait_until_active<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BackendFuture<'a, (), Self::Error>;

    /// Deletes every object version and delete marker from the bucket, then
    /// the bucket itself. Returns the number of objects removed. A bucket
    /// that no longer exists counts as already clean.
    fn purge_bucket<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BackendFuture<'a, usize, Self::Error>;

    /// Deletes the table and waits until the control plane no longer reports
    /// it. A table that no longer exists counts as already deleted.
    fn delete_table<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BackendFuture<'a, (), Self::Error>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn bucket_spec(name: &str) -> Result<ResourceSpec, BackendError> {
        ResourceSpec::builder()
            .name(name)
            .region("us-east-1")
            .bucket(BucketAttributes::default())
            .build()
    }

    #[test]
    fn builder_trims_and_validates() {
        let spec =
            bucket_spec("  demo-source-ab12c  ").unwrap_or_else(|err| panic!("build spec: {err}"));
        assert_eq!(spec.name, "demo-source-ab12c");
        assert_eq!(spec.kind(), ResourceKind::Bucket);
    }

    #[rstest]
    #[case::too_short("ab")]
    #[case::uppercase("Demo-Bucket")]
    #[case::underscore("demo_bucket")]
    #[case::leading_hyphen("-demo")]
    #[case::trailing_hyphen("demo-")]
    fn bucket_names_outside_the_rules_are_rejected(#[case] name: &str) {
        let result = bucket_spec(name);
        assert!(
            matches!(result, Err(BackendError::Validation(_))),
            "'{name}' should be rejected: {result:?}"
        );
    }

    #[rstest]
    #[case::punctuation("migration_demo.user-data")]
    #[case::mixed_case("MigrationDemo-user-data")]
    fn table_names_within_the_rules_are_accepted(#[case] name: &str) {
        let result = ResourceSpec::builder()
            .name(name)
            .region("us-east-1")
            .table(TableAttributes::default())
            .build();
        assert!(result.is_ok(), "'{name}' should be accepted: {result:?}");
    }

    #[test]
    fn table_names_with_spaces_are_rejected() {
        let result = ResourceSpec::builder()
            .name("user data")
            .region("us-east-1")
            .table(TableAttributes::default())
            .build();
        assert!(matches!(result, Err(BackendError::Validation(_))));
    }

    #[test]
    fn specs_without_attributes_are_rejected() {
        let result = ResourceSpec::builder()
            .name("demo-source-ab12c")
            .region("us-east-1")
            .build();
        assert!(matches!(result, Err(BackendError::Validation(_))));
    }

    #[test]
    fn empty_region_is_rejected() {
        let result = ResourceSpec::builder()
            .name("demo-source-ab12c")
            .region("  ")
            .bucket(BucketAttributes::default())
            .build();
        assert!(matches!(result, Err(BackendError::Validation(_))));
    }

    #[test]
    fn handle_carries_kind_name_and_region() {
        let spec = bucket_spec("demo-source-ab12c").unwrap_or_else(|err| panic!("spec: {err}"));
        let resource = spec.handle();
        assert_eq!(resource.kind, ResourceKind::Bucket);
        assert_eq!(resource.to_string(), "bucket demo-source-ab12c in us-east-1");
    }
}
