use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BackupMode;

use super::Action;

/// Error raised while persisting or loading a serialized record file
/// (the action record or the instance metadata).
#[derive(Debug, Error)]
pub enum RecordError {
    /// The record file could not be written or read.
    #[error("record file '{}' could not be accessed: {source}", path.display())]
    Io {
        /// Path of the record file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The record file is not a valid serialized record.
    #[error("record file '{}' is not valid: {source}", path.display())]
    Format {
        /// Path of the record file.
        path: PathBuf,
        /// Underlying serialization failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Plan and context for one source, as persisted in the action record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Source name; also the backup subfolder name.
    pub name: String,
    /// Absolute root of the source tree.
    pub source_root: PathBuf,
    /// Absolute root of the compare tree for this source, when one was
    /// selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_root: Option<PathBuf>,
    /// Mode the plan was generated under.
    pub mode: BackupMode,
    /// Scan timestamp.
    pub created_at: DateTime<Utc>,
    /// Ordered action list.
    pub actions: Vec<Action>,
}

/// Durable serialization of a full job plan.
///
/// Captures the minimum context a later `apply-actions` run needs; field
/// names are stable for cross-version interoperability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Parent of all backup instances.
    pub backup_root: PathBuf,
    /// Instance directory the plan targets.
    pub instance_dir: PathBuf,
    /// Backup-error budget active when the plan was generated; `-1`
    /// disables the check on resume.
    #[serde(default = "default_max_backup_errors")]
    pub max_backup_errors: i64,
    /// One entry per scanned source.
    pub sources: Vec<SourceRecord>,
}

fn default_max_backup_errors() -> i64 {
    -1
}

impl ActionRecord {
    /// Writes the record atomically (write-then-rename).
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when serialization or the write fails.
    pub fn save_atomic(&self, path: &Path) -> Result<(), RecordError> {
        let serialized =
            serde_json::to_vec_pretty(self).map_err(|source| RecordError::Format {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path.file_name().unwrap_or_default().to_string_lossy();
        let temp_path = path.with_file_name(format!("{file_name}.tmp"));
        fs::write(&temp_path, serialized).map_err(|source| RecordError::Io {
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, path).map_err(|source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads a previously persisted record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, RecordError> {
        let text = fs::read_to_string(path).map_err(|source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| RecordError::Format {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsview::{EntryKind, RelPath};

    fn sample_record() -> ActionRecord {
        ActionRecord {
            backup_root: PathBuf::from("/backups"),
            instance_dir: PathBuf::from("/backups/2026_08_02"),
            max_backup_errors: 50,
            sources: vec![SourceRecord {
                name: "docs".to_string(),
                source_root: PathBuf::from("/data/docs"),
                compare_root: Some(PathBuf::from("/backups/2026_08_01/docs")),
                mode: BackupMode::Hardlink,
                created_at: Utc::now(),
                actions: vec![
                    Action::NewDir {
                        relpath: RelPath::root(),
                        mtime: None,
                    },
                    Action::Copy {
                        relpath: RelPath::new("a.txt").expect("path"),
                        size: 3,
                        mtime: Some(Utc::now()),
                    },
                    Action::Delete {
                        relpath: RelPath::new("old").expect("path"),
                        kind: EntryKind::File,
                    },
                ],
            }],
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("actions.json");
        let record = sample_record();
        record.save_atomic(&path).expect("save");
        let loaded = ActionRecord::load(&path).expect("load");
        assert_eq!(loaded, record);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("actions.json");
        sample_record().save_atomic(&path).expect("save");
        let names: Vec<String> = fs::read_dir(temp.path())
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["actions.json"]);
    }

    #[test]
    fn load_missing_file_reports_io_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let error = ActionRecord::load(&temp.path().join("absent.json")).expect_err("must fail");
        assert!(matches!(error, RecordError::Io { .. }));
    }

    #[test]
    fn load_rejects_malformed_record() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("actions.json");
        fs::write(&path, b"{\"backup_root\": 7}").expect("write");
        let error = ActionRecord::load(&path).expect_err("must fail");
        assert!(matches!(error, RecordError::Format { .. }));
    }

    #[test]
    fn missing_budget_field_defaults_to_disabled() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("actions.json");
        fs::write(
            &path,
            br#"{"backup_root": "/b", "instance_dir": "/b/x", "sources": []}"#,
        )
        .expect("write");
        let record = ActionRecord::load(&path).expect("load");
        assert_eq!(record.max_backup_errors, -1);
    }
}
