//! The typed configuration record consumed by [`crate::job::BackupJob`].
//!
//! The record is a closed schema: unknown fields are rejected so typos fail
//! loudly instead of silently falling back to defaults. Cross-field rules
//! are enforced after parsing; where a field conflicts with an implied
//! setting (hardlink mode forces versioning and last-backup comparison) the
//! configured value is overridden with an error log rather than a hard
//! failure, so existing configurations keep working.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::plan::ActionTag;

/// Error raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("configuration file '{}' could not be read: {source}", path.display())]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The configuration is not valid JSON or violates the schema.
    #[error("the configuration is not valid: {source}")]
    Parse {
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// The configuration parsed but fails a semantic rule.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Backup mode selecting the planner matrix.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMode {
    /// Copy new and changed files; never touch existing target entries.
    Save,
    /// Like save, but additionally delete target entries missing from the
    /// source.
    Mirror,
    /// Materialize every source file into a fresh versioned instance,
    /// hardlinking unchanged files against the latest prior backup.
    #[default]
    Hardlink,
}

/// One comparator of the ordered comparison chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMethod {
    /// Whole-second modification-time comparison with FAT tolerance.
    Moddate,
    /// Byte-length comparison.
    Size,
    /// Full streamed content comparison.
    Bytes,
    /// Stable-digest comparison.
    Hash,
}

/// Reaction to a condition that needs an operator decision.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    /// Continue with a logged error.
    Proceed,
    /// Delegate to the decision handler.
    #[default]
    Prompt,
    /// Fail fast.
    Abort,
}

/// Logging verbosity, matching the original configuration vocabulary.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Only unrecoverable conditions.
    Critical,
    /// Errors and above.
    Error,
    /// Warnings and above.
    Warning,
    /// Informational progress (default).
    #[default]
    Info,
    /// Everything, including per-entry traces.
    Debug,
}

/// One tree to be backed up.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Unique name; becomes the backup subfolder name.
    pub name: String,
    /// Root directory of the source tree.
    pub dir: PathBuf,
    /// Glob patterns excluded from the scan, matched against relative
    /// paths. A trailing `/` restricts a pattern to directories.
    #[serde(default, alias = "exclude-paths")]
    pub exclude_paths: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_version_name() -> String {
    "%Y_%m_%d".to_string()
}

fn default_compare_method() -> Vec<CompareMethod> {
    vec![CompareMethod::Moddate, CompareMethod::Size]
}

fn default_max_errors() -> i64 {
    50
}

/// The full configuration record.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupConfig {
    /// Trees to back up; at least one.
    pub sources: Vec<SourceConfig>,
    /// Parent directory of all backup instances.
    pub backup_root_dir: PathBuf,
    /// Planner matrix selection.
    #[serde(default)]
    pub mode: BackupMode,
    /// Create a fresh timestamped instance per run. Forced `true` in
    /// hardlink mode.
    #[serde(default = "default_true")]
    pub versioned: bool,
    /// strftime pattern for the instance directory name.
    #[serde(default = "default_version_name")]
    pub version_name: String,
    /// Compare against the latest prior instance instead of the target.
    /// Forced `true` in hardlink mode.
    #[serde(default = "default_true")]
    pub compare_with_last_backup: bool,
    /// Whether empty directories are materialized.
    #[serde(default = "default_true")]
    pub copy_empty_dirs: bool,
    /// Persist the plan as `actions.json` before executing.
    #[serde(default = "default_true")]
    pub save_actionfile: bool,
    /// Open the persisted plan after writing it.
    #[serde(default)]
    pub open_actionfile: bool,
    /// Run the executor immediately after planning.
    #[serde(default = "default_true")]
    pub apply_actions: bool,
    /// Ordered comparator chain; short-circuits on the first disagreement.
    #[serde(default = "default_compare_method")]
    pub compare_method: Vec<CompareMethod>,
    /// Logging verbosity.
    #[serde(default)]
    pub log_level: LogLevel,
    /// Render the plan as `actions.html`.
    #[serde(default = "default_true")]
    pub save_actionhtml: bool,
    /// Open the rendered plan after writing it.
    #[serde(default)]
    pub open_actionhtml: bool,
    /// Action types left out of the HTML rendering.
    #[serde(default)]
    pub exclude_actionhtml_actions: Vec<ActionTag>,
    /// Maximum tolerated scan errors; `-1` disables the budget.
    #[serde(default = "default_max_errors")]
    pub max_scanning_errors: i64,
    /// Maximum tolerated backup errors; `-1` disables the budget.
    #[serde(default = "default_max_errors")]
    pub max_backup_errors: i64,
    /// Reaction when the target volume lacks the projected space.
    #[serde(default)]
    pub target_drive_full_action: PolicyAction,
    /// Reaction when a source is unreachable before scanning.
    #[serde(default)]
    pub source_unavailable_action: PolicyAction,
}

impl BackupConfig {
    /// Loads and validates a configuration file.
    ///
    /// The file may contain `//` and `/* */` comments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parses and validates a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let stripped = strip_json_comments(text);
        let mut config: Self = serde_json::from_str(&stripped)
            .map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies the cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for conditions that cannot be
    /// repaired by overriding a field.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one source must be configured".to_string(),
            ));
        }
        for source in &self.sources {
            if source.name.is_empty()
                || source.name.contains('/')
                || source.name.contains('\\')
            {
                return Err(ConfigError::Invalid(format!(
                    "source name '{}' is not usable as a directory name",
                    source.name
                )));
            }
        }
        for (index, source) in self.sources.iter().enumerate() {
            if self.sources[..index].iter().any(|other| other.name == source.name) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
        }
        if self.compare_method.is_empty() {
            return Err(ConfigError::Invalid(
                "compare_method must name at least one comparator".to_string(),
            ));
        }
        if self.max_scanning_errors < -1 || self.max_backup_errors < -1 {
            return Err(ConfigError::Invalid(
                "error budgets must be -1 (disabled) or non-negative".to_string(),
            ));
        }

        if self.mode == BackupMode::Hardlink {
            if !self.versioned {
                error!("hardlink mode forces 'versioned' to true");
                self.versioned = true;
            }
            if !self.compare_with_last_backup {
                error!("hardlink mode forces 'compare_with_last_backup' to true");
                self.compare_with_last_backup = true;
            }
        }
        if !self.save_actionfile && self.open_actionfile {
            error!("'open_actionfile' requires 'save_actionfile'; disabling it");
            self.open_actionfile = false;
        }
        if !self.save_actionhtml && self.open_actionhtml {
            error!("'open_actionhtml' requires 'save_actionhtml'; disabling it");
            self.open_actionhtml = false;
        }
        Ok(())
    }

    /// Scan-error budget; `None` disables the check.
    #[must_use]
    pub fn scan_budget(&self) -> Option<u64> {
        budget(self.max_scanning_errors)
    }

    /// Backup-error budget; `None` disables the check.
    #[must_use]
    pub fn backup_budget(&self) -> Option<u64> {
        budget(self.max_backup_errors)
    }
}

/// Converts a configured limit into an optional budget (`-1` disables).
#[must_use]
pub fn budget(limit: i64) -> Option<u64> {
    u64::try_from(limit).ok()
}

/// Removes `//` line comments and `/* */` block comments outside strings.
///
/// Newlines inside stripped regions are preserved so parse errors keep
/// their line numbers.
#[must_use]
pub fn strip_json_comments(text: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        InString,
        StringEscape,
        LineComment,
        BlockComment,
        BlockCommentStar,
    }

    let mut output = String::with_capacity(text.len());
    let mut state = State::Code;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            State::Code => match ch {
                '"' => {
                    state = State::InString;
                    output.push(ch);
                }
                '/' => match chars.peek() {
                    Some('/') => {
                        chars.next();
                        state = State::LineComment;
                    }
                    Some('*') => {
                        chars.next();
                        state = State::BlockComment;
                    }
                    _ => output.push(ch),
                },
                _ => output.push(ch),
            },
            State::InString => {
                output.push(ch);
                match ch {
                    '\\' => state = State::StringEscape,
                    '"' => state = State::Code,
                    _ => {}
                }
            }
            State::StringEscape => {
                output.push(ch);
                state = State::InString;
            }
            State::LineComment => {
                if ch == '\n' {
                    output.push(ch);
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if ch == '\n' {
                    output.push(ch);
                } else if ch == '*' {
                    state = State::BlockCommentStar;
                }
            }
            State::BlockCommentStar => match ch {
                '/' => state = State::Code,
                '*' => {}
                '\n' => {
                    output.push(ch);
                    state = State::BlockComment;
                }
                _ => state = State::BlockComment,
            },
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json(extra: &str) -> String {
        format!(
            r#"{{
                "sources": [{{"name": "docs", "dir": "/data/docs", "exclude_paths": []}}],
                "backup_root_dir": "/backups"{}{extra}
            }}"#,
            if extra.is_empty() { "" } else { "," },
        )
    }

    #[test]
    fn minimal_config_uses_documented_defaults() {
        let config = BackupConfig::from_json_str(&minimal_json("")).expect("config parses");
        assert_eq!(config.mode, BackupMode::Hardlink);
        assert!(config.versioned);
        assert_eq!(config.version_name, "%Y_%m_%d");
        assert!(config.compare_with_last_backup);
        assert!(config.copy_empty_dirs);
        assert!(config.save_actionfile);
        assert!(!config.open_actionfile);
        assert!(config.apply_actions);
        assert_eq!(
            config.compare_method,
            vec![CompareMethod::Moddate, CompareMethod::Size]
        );
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.max_scanning_errors, 50);
        assert_eq!(config.max_backup_errors, 50);
        assert_eq!(config.target_drive_full_action, PolicyAction::Prompt);
        assert_eq!(config.source_unavailable_action, PolicyAction::Prompt);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = BackupConfig::from_json_str(&minimal_json(r#""verion_name": "%Y""#));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn missing_sources_is_invalid() {
        let result = BackupConfig::from_json_str(
            r#"{"sources": [], "backup_root_dir": "/backups"}"#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn duplicate_source_names_are_invalid() {
        let json = r#"{
            "sources": [
                {"name": "same", "dir": "/a"},
                {"name": "same", "dir": "/b"}
            ],
            "backup_root_dir": "/backups"
        }"#;
        assert!(matches!(
            BackupConfig::from_json_str(json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn source_name_with_separator_is_invalid() {
        let json = r#"{
            "sources": [{"name": "a/b", "dir": "/a"}],
            "backup_root_dir": "/backups"
        }"#;
        assert!(matches!(
            BackupConfig::from_json_str(json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn hardlink_mode_forces_versioning() {
        let json = minimal_json(r#""mode": "hardlink", "versioned": false, "compare_with_last_backup": false"#);
        let config = BackupConfig::from_json_str(&json).expect("config parses");
        assert!(config.versioned);
        assert!(config.compare_with_last_backup);
    }

    #[test]
    fn open_actionfile_requires_save_actionfile() {
        let json = minimal_json(r#""save_actionfile": false, "open_actionfile": true"#);
        let config = BackupConfig::from_json_str(&json).expect("config parses");
        assert!(!config.open_actionfile);
    }

    #[test]
    fn empty_compare_method_is_invalid() {
        let json = minimal_json(r#""compare_method": []"#);
        assert!(matches!(
            BackupConfig::from_json_str(&json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn budgets_below_minus_one_are_invalid() {
        let json = minimal_json(r#""max_backup_errors": -2"#);
        assert!(matches!(
            BackupConfig::from_json_str(&json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn minus_one_disables_a_budget() {
        let json = minimal_json(r#""max_backup_errors": -1, "max_scanning_errors": -1"#);
        let config = BackupConfig::from_json_str(&json).expect("config parses");
        assert_eq!(config.scan_budget(), None);
        assert_eq!(config.backup_budget(), None);
    }

    #[test]
    fn hyphenated_exclude_paths_alias_is_accepted() {
        let json = r#"{
            "sources": [{"name": "docs", "dir": "/d", "exclude-paths": ["*.tmp"]}],
            "backup_root_dir": "/backups"
        }"#;
        let config = BackupConfig::from_json_str(json).expect("config parses");
        assert_eq!(config.sources[0].exclude_paths, vec!["*.tmp"]);
    }

    #[test]
    fn comments_are_stripped_outside_strings() {
        let json = r#"{
            // chosen mode
            "sources": [{"name": "docs", "dir": "/d // not a comment"}],
            /* block
               comment */
            "backup_root_dir": "/backups"
        }"#;
        let config = BackupConfig::from_json_str(json).expect("config parses");
        assert_eq!(config.sources[0].dir.to_string_lossy(), "/d // not a comment");
    }

    #[test]
    fn strip_preserves_line_numbers() {
        let stripped = strip_json_comments("1 // x\n/* a\nb */ 2");
        assert_eq!(stripped, "1 \n\n 2");
    }

    #[test]
    fn log_level_uses_uppercase_names() {
        let json = minimal_json(r#""log_level": "DEBUG""#);
        let config = BackupConfig::from_json_str(&json).expect("config parses");
        assert_eq!(config.log_level, LogLevel::Debug);
    }
}
