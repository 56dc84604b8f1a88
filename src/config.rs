//! Configuration loading via `ortho-config`.

use crate::backend::TableAttributes;
use crate::plan::RunContext;
use crate::run_id::RunId;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Provisioning configuration derived from environment variables,
/// configuration files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "CARAVAN")]
pub struct ProvisionConfig {
    /// Project name used as the prefix of every resource name. Must satisfy
    /// bucket naming rules since it lands at the front of bucket names.
    #[ortho_config(default = "migration-demo".to_owned())]
    pub project_name: String,
    /// Region hosting the source bucket and table.
    #[ortho_config(default = "us-east-1".to_owned())]
    pub source_region: String,
    /// Target regions, provisioned in order after the source.
    #[ortho_config(default = vec!["us-west-2".to_owned(), "eu-west-1".to_owned()])]
    pub target_regions: Vec<String>,
    /// Path of the registry file recording created resource names.
    #[ortho_config(default = "caravan-registry.txt".to_owned())]
    pub registry_path: String,
    /// Directory the `seed` command writes fixture files into.
    #[ortho_config(default = "sample-data".to_owned())]
    pub sample_data_dir: String,
    /// Upper bound in seconds on each per-resource readiness wait.
    #[ortho_config(default = 300)]
    pub wait_timeout_secs: u64,
    /// Seconds between readiness polls.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
    /// Whether the source table carries a change stream.
    #[ortho_config(default = true)]
    pub table_stream: bool,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(
        description: &'static str,
        env_var: &'static str,
        toml_key: &'static str,
    ) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl ProvisionConfig {
    fn invalid(metadata: &FieldMetadata, detail: &str) -> ConfigError {
        ConfigError::InvalidField(format!(
            "{} {detail}: set {} or {} in caravan.toml",
            metadata.description, metadata.env_var, metadata.toml_key
        ))
    }

    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to caravan.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments;
    /// subcommand flags belong to clap, so the loader merges defaults,
    /// configuration files, and environment variables only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("caravan")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Builds the run context that resolves this run's resource names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn run_context(&self, run_id: RunId) -> Result<RunContext, ConfigError> {
        self.validate()?;
        Ok(RunContext {
            project: self.project_name.clone(),
            run_id,
            source_region: self.source_region.clone(),
            target_regions: self.target_regions.clone(),
        })
    }

    /// Returns the source table shape this configuration asks for.
    #[must_use]
    pub fn table_attributes(&self) -> TableAttributes {
        TableAttributes {
            stream_enabled: self.table_stream,
            ..TableAttributes::default()
        }
    }

    /// Performs semantic validation. Error messages include guidance on how
    /// to provide corrected values via environment variables or configuration
    /// files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a field is empty or malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let project = FieldMetadata::new("project name", "CARAVAN_PROJECT_NAME", "project_name");
        Self::require_field(&self.project_name, &project)?;
        let valid_project = self
            .project_name
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-');
        if !valid_project {
            return Err(Self::invalid(
                &project,
                "must contain only lowercase letters, digits, and hyphens",
            ));
        }

        let source = FieldMetadata::new("source region", "CARAVAN_SOURCE_REGION", "source_region");
        Self::require_field(&self.source_region, &source)?;

        let targets =
            FieldMetadata::new("target regions", "CARAVAN_TARGET_REGIONS", "target_regions");
        if self.target_regions.is_empty() {
            return Err(Self::invalid(&targets, "must name at least one region"));
        }
        for region in &self.target_regions {
            Self::require_field(region, &targets)?;
            if region == &self.source_region {
                return Err(Self::invalid(
                    &targets,
                    "must not include the source region",
                ));
            }
        }
        let mut seen = self.target_regions.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != self.target_regions.len() {
            return Err(Self::invalid(&targets, "must not repeat a region"));
        }

        if self.wait_timeout_secs == 0 {
            return Err(Self::invalid(
                &FieldMetadata::new(
                    "wait timeout",
                    "CARAVAN_WAIT_TIMEOUT_SECS",
                    "wait_timeout_secs",
                ),
                "must be greater than zero",
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(Self::invalid(
                &FieldMetadata::new(
                    "poll interval",
                    "CARAVAN_POLL_INTERVAL_SECS",
                    "poll_interval_secs",
                ),
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configuration field holds a malformed value.
    #[error("invalid configuration field: {0}")]
    InvalidField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn config() -> ProvisionConfig {
        ProvisionConfig {
            project_name: String::from("migration-demo"),
            source_region: String::from("us-east-1"),
            target_regions: vec![String::from("us-west-2"), String::from("eu-west-1")],
            registry_path: String::from("caravan-registry.txt"),
            sample_data_dir: String::from("sample-data"),
            wait_timeout_secs: 300,
            poll_interval_secs: 5,
            table_stream: true,
        }
    }

    #[test]
    fn default_shape_validates() {
        config()
            .validate()
            .unwrap_or_else(|err| panic!("defaults should validate: {err}"));
    }

    #[rstest]
    #[case::uppercase("Migration-Demo")]
    #[case::underscore("migration_demo")]
    #[case::empty("  ")]
    fn malformed_project_names_are_rejected(#[case] project: &str) {
        let mut cfg = config();
        cfg.project_name = project.to_owned();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn target_regions_must_not_repeat_or_include_the_source() {
        let mut cfg = config();
        cfg.target_regions = vec![String::from("us-west-2"), String::from("us-west-2")];
        assert!(cfg.validate().is_err());

        cfg.target_regions = vec![String::from("us-east-1")];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_timers_are_rejected() {
        let mut cfg = config();
        cfg.wait_timeout_secs = 0;
        assert!(cfg.validate().is_err());

        let mut other = config();
        other.poll_interval_secs = 0;
        assert!(other.validate().is_err());
    }

    #[test]
    fn run_context_carries_the_configured_regions() {
        let run_id = RunId::generate();
        let context = config()
            .run_context(run_id.clone())
            .unwrap_or_else(|err| panic!("context should build: {err}"));
        assert_eq!(context.source_region, "us-east-1");
        assert_eq!(context.target_regions.len(), 2);
        assert!(context.source_bucket_name().starts_with("migration-demo-source-"));
    }

    #[test]
    fn table_attributes_follow_the_stream_flag() {
        let mut cfg = config();
        cfg.table_stream = false;
        assert!(!cfg.table_attributes().stream_enabled);
        assert_eq!(cfg.table_attributes().partition_key, "UserID");
    }
}
