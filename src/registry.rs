//! Persisted record of the resource names a run created.
//!
//! The registry is a flat text file of `KEY=VALUE` lines plus bracketed
//! lists for the per-target-region names, the format downstream upload and
//! sync scripts source directly:
//!
//! ```text
//! SOURCE_REGION=us-east-1
//! SOURCE_BUCKET=demo-source-ab12c
//! TARGET_BUCKETS=(
//!     demo-target-us-west-2-ab12c
//! )
//! ```
//!
//! The file is rewritten in full after every recorded resource via a
//! temp-file-and-rename, so an interrupted run leaves a complete, parseable
//! record of everything created so far and never a truncated last line.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;

use crate::backend::{ResourceKind, ResourceRef};

const SOURCE_REGION_KEY: &str = "SOURCE_REGION";
const SOURCE_BUCKET_KEY: &str = "SOURCE_BUCKET";
const SOURCE_TABLE_KEY: &str = "SOURCE_TABLE";
const TARGET_REGIONS_KEY: &str = "TARGET_REGIONS";
const TARGET_BUCKETS_KEY: &str = "TARGET_BUCKETS";
const TARGET_TABLES_KEY: &str = "TARGET_TABLES";
const LIST_OPEN: &str = "=(";
const LIST_CLOSE: &str = ")";
const LIST_INDENT: &str = "    ";

/// Errors raised while persisting or parsing the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Raised when file system operations fail. Fatal: without the registry,
    /// already-created remote resources have no recorded name.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when registry content does not match the expected format.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that could not be parsed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the registry path has no file name component.
    #[error("registry path {path} is missing a file name")]
    InvalidPath {
        /// Offending path.
        path: Utf8PathBuf,
    },
}

/// Names recorded for one target region.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TargetEntry {
    /// Target region.
    pub region: String,
    /// Bucket created in the region, when reached.
    pub bucket: Option<String>,
    /// Table created in the region, when reached.
    pub table: Option<String>,
}

/// In-memory registry value, rendered to and parsed from the flat file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Registry {
    /// Region hosting the source resources.
    pub source_region: Option<String>,
    /// Source bucket name, once created.
    pub source_bucket: Option<String>,
    /// Source table name, once created.
    pub source_table: Option<String>,
    /// Target entries in provisioning order.
    pub targets: Vec<TargetEntry>,
}

impl Registry {
    /// Records a created source resource.
    pub fn record_source(&mut self, resource: &ResourceRef) {
        self.source_region = Some(resource.region.clone());
        match resource.kind {
            ResourceKind::Bucket => self.source_bucket = Some(resource.name.clone()),
            ResourceKind::Table => self.source_table = Some(resource.name.clone()),
        }
    }

    /// Records a created target resource, appending a new region entry the
    /// first time the region appears.
    pub fn record_target(&mut self, resource: &ResourceRef) {
        if !self
            .targets
            .iter()
            .any(|entry| entry.region == resource.region)
        {
            self.targets.push(TargetEntry {
                region: resource.region.clone(),
                ..TargetEntry::default()
            });
        }
        let Some(entry) = self
            .targets
            .iter_mut()
            .find(|entry| entry.region == resource.region)
        else {
            return;
        };
        match resource.kind {
            ResourceKind::Bucket => entry.bucket = Some(resource.name.clone()),
            ResourceKind::Table => entry.table = Some(resource.name.clone()),
        }
    }

    /// Returns every recorded resource as ordered handles: source resources
    /// first, then targets in provisioning order.
    #[must_use]
    pub fn resources(&self) -> Vec<ResourceRef> {
        let mut refs = Vec::new();
        if let Some(region) = &self.source_region {
            if let Some(name) = &self.source_bucket {
                refs.push(handle(ResourceKind::Bucket, name, region));
            }
            if let Some(name) = &self.source_table {
                refs.push(handle(ResourceKind::Table, name, region));
            }
        }
        for target in &self.targets {
            if let Some(name) = &target.bucket {
                refs.push(handle(ResourceKind::Bucket, name, &target.region));
            }
            if let Some(name) = &target.table {
                refs.push(handle(ResourceKind::Table, name, &target.region));
            }
        }
        refs
    }

    /// Renders the registry to its flat text form.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        push_pair(&mut out, SOURCE_REGION_KEY, self.source_region.as_deref());
        push_pair(&mut out, SOURCE_BUCKET_KEY, self.source_bucket.as_deref());
        push_pair(&mut out, SOURCE_TABLE_KEY, self.source_table.as_deref());
        push_list(
            &mut out,
            TARGET_REGIONS_KEY,
            self.targets.iter().map(|entry| entry.region.as_str()),
        );
        push_list(
            &mut out,
            TARGET_BUCKETS_KEY,
            self.targets.iter().filter_map(|entry| entry.bucket.as_deref()),
        );
        push_list(
            &mut out,
            TARGET_TABLES_KEY,
            self.targets.iter().filter_map(|entry| entry.table.as_deref()),
        );
        out
    }

    /// Parses the flat text form back into a registry value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] on unknown keys, unterminated lists,
    /// or lines that are neither pairs nor list entries.
    pub fn parse(path: &Utf8Path, contents: &str) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        let mut regions = Vec::new();
        let mut buckets = Vec::new();
        let mut tables = Vec::new();

        let mut lines = contents.lines();
        while let Some(line) = lines.next() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(key) = trimmed.strip_suffix(LIST_OPEN) {
                let values = collect_list(path, &mut lines)?;
                match key {
                    TARGET_REGIONS_KEY => regions = values,
                    TARGET_BUCKETS_KEY => buckets = values,
                    TARGET_TABLES_KEY => tables = values,
                    other => {
                        return Err(parse_error(path, format!("unknown list key '{other}'")));
                    }
                }
            } else if let Some((key, value)) = trimmed.split_once('=') {
                match key {
                    SOURCE_REGION_KEY => registry.source_region = Some(value.to_owned()),
                    SOURCE_BUCKET_KEY => registry.source_bucket = Some(value.to_owned()),
                    SOURCE_TABLE_KEY => registry.source_table = Some(value.to_owned()),
                    other => {
                        return Err(parse_error(path, format!("unknown key '{other}'")));
                    }
                }
            } else {
                return Err(parse_error(path, format!("unexpected line '{trimmed}'")));
            }
        }

        // Buckets and tables align with the region list prefix-wise: a run
        // records the region when its first resource in that region lands.
        for (index, region) in regions.into_iter().enumerate() {
            registry.targets.push(TargetEntry {
                region,
                bucket: buckets.get(index).cloned(),
                table: tables.get(index).cloned(),
            });
        }
        Ok(registry)
    }
}

fn handle(kind: ResourceKind, name: &str, region: &str) -> ResourceRef {
    ResourceRef {
        kind,
        name: name.to_owned(),
        region: region.to_owned(),
    }
}

fn push_pair(out: &mut String, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
}

fn push_list<'a>(out: &mut String, key: &str, values: impl Iterator<Item = &'a str>) {
    let collected: Vec<&str> = values.collect();
    if collected.is_empty() {
        return;
    }
    out.push_str(key);
    out.push_str(LIST_OPEN);
    out.push('\n');
    for value in collected {
        out.push_str(LIST_INDENT);
        out.push_str(value);
        out.push('\n');
    }
    out.push_str(LIST_CLOSE);
    out.push('\n');
}

fn collect_list(
    path: &Utf8Path,
    lines: &mut std::str::Lines<'_>,
) -> Result<Vec<String>, RegistryError> {
    let mut values = Vec::new();
    for line in lines.by_ref() {
        let trimmed = line.trim();
        if trimmed == LIST_CLOSE {
            return Ok(values);
        }
        if !trimmed.is_empty() {
            values.push(trimmed.to_owned());
        }
    }
    Err(parse_error(path, String::from("unterminated list")))
}

fn parse_error(path: &Utf8Path, message: String) -> RegistryError {
    RegistryError::Parse {
        path: path.to_path_buf(),
        message,
    }
}

/// Abstraction over registry persistence for dependency injection.
pub trait RegistryWriter {
    /// Persists the registry, replacing any previous contents atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the file cannot be written.
    fn save(&self, registry: &Registry) -> Result<(), RegistryError>;
}

/// Registry persistence rooted at a single file path.
#[derive(Clone, Debug)]
pub struct RegistryStore {
    path: Utf8PathBuf,
}

impl RegistryStore {
    /// Creates a store for the given registry file path.
    #[must_use]
    pub const fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    /// Returns the registry file path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Reads and parses the registry file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the file cannot be read or parsed.
    pub fn load(&self) -> Result<Registry, RegistryError> {
        let (dir, file_name) = self.open_parent()?;
        let contents = dir
            .read_to_string(file_name)
            .map_err(|err| self.io_error(err))?;
        Registry::parse(&self.path, &contents)
    }

    fn open_parent(&self) -> Result<(Dir, &str), RegistryError> {
        let parent = self.path.parent().unwrap_or_else(|| Utf8Path::new("."));
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| RegistryError::InvalidPath {
                path: self.path.clone(),
            })?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| {
            RegistryError::Io {
                path: parent.to_path_buf(),
                message: err.to_string(),
            }
        })?;
        Ok((dir, file_name))
    }

    fn io_error(&self, err: std::io::Error) -> RegistryError {
        RegistryError::Io {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }
}

impl RegistryWriter for RegistryStore {
    fn save(&self, registry: &Registry) -> Result<(), RegistryError> {
        let parent = self.path.parent().unwrap_or_else(|| Utf8Path::new("."));
        Dir::create_ambient_dir_all(parent, ambient_authority()).map_err(|err| {
            RegistryError::Io {
                path: parent.to_path_buf(),
                message: err.to_string(),
            }
        })?;
        let (dir, file_name) = self.open_parent()?;
        let temp_name = format!("{file_name}.tmp");
        dir.write(&temp_name, registry.render())
            .map_err(|err| self.io_error(err))?;
        dir.rename(&temp_name, &dir, file_name)
            .map_err(|err| self.io_error(err))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn bucket(name: &str, region: &str) -> ResourceRef {
        ResourceRef {
            kind: ResourceKind::Bucket,
            name: name.to_owned(),
            region: region.to_owned(),
        }
    }

    fn table(name: &str, region: &str) -> ResourceRef {
        ResourceRef {
            kind: ResourceKind::Table,
            name: name.to_owned(),
            region: region.to_owned(),
        }
    }

    fn full_registry() -> Registry {
        let mut registry = Registry::default();
        registry.record_source(&bucket("demo-source-ab12c", "us-east-1"));
        registry.record_source(&table("demo-user-data-ab12c", "us-east-1"));
        registry.record_target(&bucket("demo-target-us-west-2-ab12c", "us-west-2"));
        registry.record_target(&table("demo-target-us-west-2-user-data-ab12c", "us-west-2"));
        registry.record_target(&bucket("demo-target-eu-west-1-ab12c", "eu-west-1"));
        registry.record_target(&table("demo-target-eu-west-1-user-data-ab12c", "eu-west-1"));
        registry
    }

    fn store_in(tmp: &TempDir) -> RegistryStore {
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("caravan-registry.txt"))
            .unwrap_or_else(|path| panic!("temp path should be utf8: {}", path.display()));
        RegistryStore::new(path)
    }

    #[test]
    fn render_produces_the_expected_lines() {
        let rendered = full_registry().render();
        assert!(rendered.contains("SOURCE_BUCKET=demo-source-ab12c\n"));
        assert!(rendered.contains("SOURCE_REGION=us-east-1\n"));
        assert!(rendered.contains("TARGET_BUCKETS=(\n"));
        assert!(rendered.contains("    demo-target-eu-west-1-ab12c\n"));
        assert!(rendered.contains(")\n"));
    }

    #[test]
    fn round_trip_preserves_every_resource_in_order() {
        let registry = full_registry();
        let parsed = Registry::parse(Utf8Path::new("registry.txt"), &registry.render())
            .unwrap_or_else(|err| panic!("parse rendered registry: {err}"));
        assert_eq!(parsed, registry);
        assert_eq!(parsed.resources(), registry.resources());
        assert_eq!(parsed.resources().len(), 6);
    }

    #[test]
    fn partial_registry_round_trips_without_later_entries() {
        let mut registry = Registry::default();
        registry.record_source(&bucket("demo-source-ab12c", "us-east-1"));
        registry.record_source(&table("demo-user-data-ab12c", "us-east-1"));
        registry.record_target(&bucket("demo-target-us-west-2-ab12c", "us-west-2"));

        let parsed = Registry::parse(Utf8Path::new("registry.txt"), &registry.render())
            .unwrap_or_else(|err| panic!("parse partial registry: {err}"));
        assert_eq!(parsed.targets.len(), 1);
        let entry = parsed.targets.first().unwrap_or_else(|| panic!("entry"));
        assert_eq!(entry.bucket.as_deref(), Some("demo-target-us-west-2-ab12c"));
        assert_eq!(entry.table, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = Registry::parse(Utf8Path::new("registry.txt"), "MYSTERY=value\n");
        assert!(matches!(result, Err(RegistryError::Parse { .. })));
    }

    #[test]
    fn unterminated_lists_are_rejected() {
        let contents = "TARGET_REGIONS=(\n    us-west-2\n";
        let result = Registry::parse(Utf8Path::new("registry.txt"), contents);
        assert!(matches!(result, Err(RegistryError::Parse { .. })));
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let store = store_in(&tmp);
        let registry = full_registry();
        store
            .save(&registry)
            .unwrap_or_else(|err| panic!("save registry: {err}"));
        let loaded = store
            .load()
            .unwrap_or_else(|err| panic!("load registry: {err}"));
        assert_eq!(loaded, registry);
    }

    #[test]
    fn save_overwrites_previous_runs() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let store = store_in(&tmp);
        store
            .save(&full_registry())
            .unwrap_or_else(|err| panic!("seed registry: {err}"));

        let mut second = Registry::default();
        second.record_source(&bucket("demo-source-zz9zz", "us-east-1"));
        store
            .save(&second)
            .unwrap_or_else(|err| panic!("overwrite registry: {err}"));

        let loaded = store
            .load()
            .unwrap_or_else(|err| panic!("load registry: {err}"));
        assert_eq!(loaded, second);
    }

    #[test]
    fn load_missing_file_reports_io_error() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let store = store_in(&tmp);
        let result = store.load();
        assert!(matches!(result, Err(RegistryError::Io { .. })));
    }
}
