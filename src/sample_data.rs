//! Fixture generation for migration demos.
//!
//! Writes a fixed, deterministic set of small files (JSON, delimited text,
//! plain text, structured config) into a local directory. The upload script
//! that copies them into the provisioned bucket lives outside this tool; the
//! same user records also seed the source table via `caravan populate`.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use ortho_config::toml;
use serde::Serialize;
use thiserror::Error;

/// One demo user record, shaped like the source table's items.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SampleUser {
    /// Partition key value.
    #[serde(rename = "UserID")]
    pub user_id: String,
    /// Sort key value, seconds since the epoch.
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
    /// Display name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Contact address.
    #[serde(rename = "Email")]
    pub email: String,
    /// Organisational unit.
    #[serde(rename = "Department")]
    pub department: String,
}

/// Returns the fixed demo user set.
///
/// Timestamps are constants rather than clock readings so repeated runs
/// produce identical fixtures and table items.
#[must_use]
pub fn sample_users() -> Vec<SampleUser> {
    vec![
        SampleUser {
            user_id: String::from("user001"),
            timestamp: 1_695_020_400,
            name: String::from("John Doe"),
            email: String::from("john.doe@example.com"),
            department: String::from("Engineering"),
        },
        SampleUser {
            user_id: String::from("user002"),
            timestamp: 1_695_020_401,
            name: String::from("Jane Smith"),
            email: String::from("jane.smith@example.com"),
            department: String::from("Marketing"),
        },
        SampleUser {
            user_id: String::from("user003"),
            timestamp: 1_695_020_402,
            name: String::from("Bob Johnson"),
            email: String::from("bob.johnson@example.com"),
            department: String::from("Sales"),
        },
    ]
}

/// Errors raised while writing fixture files.
#[derive(Debug, Error)]
pub enum SampleDataError {
    /// Raised when file system operations fail.
    #[error("failed to write {path}: {message}")]
    Io {
        /// Path that could not be written.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when a fixture cannot be rendered.
    #[error("failed to render {path}: {message}")]
    Render {
        /// Fixture being rendered.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// Writes the fixture set into `out_dir`, creating it when missing.
///
/// Returns the paths written, in a fixed order.
///
/// # Errors
///
/// Returns [`SampleDataError`] when the directory cannot be created or a
/// file cannot be rendered or written.
pub fn write_fixtures(out_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SampleDataError> {
    Dir::create_ambient_dir_all(out_dir, ambient_authority()).map_err(|err| {
        SampleDataError::Io {
            path: out_dir.to_path_buf(),
            message: err.to_string(),
        }
    })?;
    let dir = Dir::open_ambient_dir(out_dir, ambient_authority()).map_err(|err| {
        SampleDataError::Io {
            path: out_dir.to_path_buf(),
            message: err.to_string(),
        }
    })?;

    let fixtures = [
        ("users.json", users_json(out_dir)?),
        ("departments.csv", departments_csv()),
        ("notes.txt", String::from(NOTES)),
        ("settings.toml", settings_toml(out_dir)?),
    ];

    let mut written = Vec::with_capacity(fixtures.len());
    for (name, contents) in fixtures {
        let path = out_dir.join(name);
        dir.write(name, contents).map_err(|err| SampleDataError::Io {
            path: path.clone(),
            message: err.to_string(),
        })?;
        written.push(path);
    }
    Ok(written)
}

const NOTES: &str = "\
Migration demo fixtures.

These files are uploaded into the source bucket under fixed key prefixes
so the downstream copy and validation tooling has deterministic inputs.
";

fn users_json(out_dir: &Utf8Path) -> Result<String, SampleDataError> {
    serde_json::to_string_pretty(&sample_users()).map_err(|err| SampleDataError::Render {
        path: out_dir.join("users.json"),
        message: err.to_string(),
    })
}

fn departments_csv() -> String {
    let mut out = String::from("user_id,name,department\n");
    for user in sample_users() {
        out.push_str(&user.user_id);
        out.push(',');
        out.push_str(&user.name);
        out.push(',');
        out.push_str(&user.department);
        out.push('\n');
    }
    out
}

fn settings_toml(out_dir: &Utf8Path) -> Result<String, SampleDataError> {
    let mut upload = toml::value::Table::new();
    upload.insert(
        String::from("json_prefix"),
        toml::Value::String(String::from("data/json/")),
    );
    upload.insert(
        String::from("csv_prefix"),
        toml::Value::String(String::from("data/csv/")),
    );
    upload.insert(
        String::from("text_prefix"),
        toml::Value::String(String::from("data/text/")),
    );
    let mut root = toml::value::Table::new();
    root.insert(String::from("upload"), toml::Value::Table(upload));
    toml::to_string_pretty(&toml::Value::Table(root)).map_err(|err| SampleDataError::Render {
        path: out_dir.join("settings.toml"),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn utf8_dir(tmp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(tmp.path().join("fixtures"))
            .unwrap_or_else(|path| panic!("temp path should be utf8: {}", path.display()))
    }

    #[test]
    fn writes_the_full_fixture_set() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let out_dir = utf8_dir(&tmp);
        let written = write_fixtures(&out_dir).unwrap_or_else(|err| panic!("write: {err}"));
        let names: Vec<&str> = written
            .iter()
            .filter_map(|path| path.file_name())
            .collect();
        assert_eq!(
            names,
            ["users.json", "departments.csv", "notes.txt", "settings.toml"]
        );
    }

    #[test]
    fn users_fixture_parses_back_to_the_sample_set() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let out_dir = utf8_dir(&tmp);
        write_fixtures(&out_dir).unwrap_or_else(|err| panic!("write: {err}"));

        let raw = std::fs::read_to_string(out_dir.join("users.json").as_std_path())
            .unwrap_or_else(|err| panic!("read users.json: {err}"));
        let parsed: serde_json::Value =
            serde_json::from_str(&raw).unwrap_or_else(|err| panic!("parse users.json: {err}"));
        let users = parsed
            .as_array()
            .unwrap_or_else(|| panic!("users.json should be an array"));
        assert_eq!(users.len(), 3);
        assert_eq!(
            users.first().and_then(|user| user.get("UserID")),
            Some(&serde_json::Value::String(String::from("user001")))
        );
    }

    #[test]
    fn csv_fixture_has_a_header_and_one_row_per_user() {
        let csv = departments_csv();
        assert_eq!(csv.lines().count(), 4);
        assert!(csv.starts_with("user_id,name,department\n"));
        assert!(csv.contains("user002,Jane Smith,Marketing\n"));
    }

    #[test]
    fn rerun_overwrites_existing_fixtures() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let out_dir = utf8_dir(&tmp);
        write_fixtures(&out_dir).unwrap_or_else(|err| panic!("first write: {err}"));
        write_fixtures(&out_dir).unwrap_or_else(|err| panic!("second write: {err}"));
    }
}
