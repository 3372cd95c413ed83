//! Orchestration of one backup invocation over N sources.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use filters::ExcludeSet;
use fsview::{FilesystemView, LocalView};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use walk::Scanner;

use crate::cancel::CancelFlag;
use crate::compare::{validate_methods, Comparator};
use crate::config::{budget, BackupConfig, ConfigError, PolicyAction, SourceConfig};
use crate::decision::DecisionHandler;
use crate::diff::pair_entries;
use crate::error::BackupError;
use crate::executor::{ExecuteError, Executor};
use crate::plan::{build_plan, Action, ActionRecord, Plan, PlanSettings, RecordError, SourceRecord};
use crate::progress::ProgressSink;
use crate::stats::{format_bytes, BackupStatistics};
use crate::{ACTIONS_FILENAME, METADATA_FILENAME};

/// Instance metadata, persisted as `metadata.json` next to the backed-up
/// trees.
///
/// The file is written pessimistically (`successful: false`) before any
/// action runs and finalized afterwards, so an interrupted or scan-only
/// instance is never selected as a compare base by later runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Instance directory name.
    pub name: String,
    /// Whether the instance completed within its error budgets.
    pub successful: bool,
    /// Scan start; orders instances when selecting a compare base.
    pub started: DateTime<Utc>,
    /// Sources that participated in the run.
    pub sources: Vec<SourceConfig>,
    /// Compare base selected for the run, when one existed.
    pub compare_backup: Option<PathBuf>,
    /// Absolute instance directory.
    pub backup_directory: PathBuf,
    /// Statistics snapshot; planning counters before execution, the full
    /// set afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<BackupStatistics>,
}

impl BackupMetadata {
    /// Writes the metadata into `instance_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when serialization or the write fails.
    pub fn save(&self, instance_dir: &Path) -> Result<(), RecordError> {
        let path = instance_dir.join(METADATA_FILENAME);
        let serialized =
            serde_json::to_vec_pretty(self).map_err(|source| RecordError::Format {
                path: path.clone(),
                source,
            })?;
        fs::write(&path, serialized).map_err(|source| RecordError::Io { path, source })
    }

    /// Loads the metadata from `instance_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when the file cannot be read or parsed.
    pub fn load(instance_dir: &Path) -> Result<Self, RecordError> {
        let path = instance_dir.join(METADATA_FILENAME);
        let text = fs::read_to_string(&path).map_err(|source| RecordError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| RecordError::Format { path, source })
    }
}

/// How a job run ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobOutcome {
    /// All phases ran within their budgets.
    Completed,
    /// The scan-error budget was exhausted; nothing was applied.
    ScanBudgetExceeded,
    /// The backup-error budget was exhausted mid-execution.
    BackupBudgetExceeded,
}

/// Result of a completed (possibly unsuccessful) job run.
#[derive(Clone, Debug)]
pub struct JobReport {
    /// Whether the run stayed within its budgets and at least one source
    /// completed.
    pub successful: bool,
    /// Whether actions were applied (false for scan-only runs).
    pub applied: bool,
    /// Terminal phase classification.
    pub outcome: JobOutcome,
    /// Final statistics.
    pub statistics: BackupStatistics,
    /// Instance directory of the run.
    pub instance_dir: PathBuf,
    /// The generated plan, for report rendering.
    pub record: ActionRecord,
}

struct SourceTree {
    name: String,
    source_view: LocalView,
    target_dir: PathBuf,
    compare_dir: Option<PathBuf>,
    plan: Plan,
}

/// One backup invocation: scanning, planning, recording, and execution
/// over all configured sources.
pub struct BackupJob {
    config: BackupConfig,
    backup_root: PathBuf,
    target_root: PathBuf,
}

impl BackupJob {
    /// Prepares a job: creates the backup root and resolves the instance
    /// directory (with `_2`, `_3`, … disambiguation in versioned mode).
    ///
    /// # Errors
    ///
    /// Returns [`BackupError`] when the backup root cannot be created or
    /// the version-name pattern is invalid.
    pub fn new(config: BackupConfig) -> Result<Self, BackupError> {
        let backup_root = config.backup_root_dir.clone();
        fs::create_dir_all(&backup_root).map_err(|source| BackupError::TargetUnavailable {
            path: backup_root.clone(),
            source,
        })?;
        let target_root = if config.versioned {
            find_target_root(&backup_root, &config.version_name)?
        } else {
            backup_root.clone()
        };
        Ok(Self {
            config,
            backup_root,
            target_root,
        })
    }

    /// Returns the configuration the job runs under.
    #[must_use]
    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Returns the resolved instance directory.
    #[must_use]
    pub fn instance_dir(&self) -> &Path {
        &self.target_root
    }

    /// Runs the job: scan, diff, plan, record, and (unless disabled)
    /// execute.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError`] for fatal conditions (unavailable roots with
    /// an abort policy, record persistence failures, cancellation). Budget
    /// exhaustion is not an error: it yields an unsuccessful [`JobReport`].
    pub fn run(
        &mut self,
        handler: &mut dyn DecisionHandler,
        progress: &mut dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<JobReport, BackupError> {
        let mut stats = BackupStatistics {
            start_time: Some(Utc::now()),
            ..Default::default()
        };
        let compare_root = self.find_compare_root();
        let mut metadata = BackupMetadata {
            name: self
                .target_root
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            successful: false,
            started: Utc::now(),
            sources: self.config.sources.clone(),
            compare_backup: compare_root.clone(),
            backup_directory: self.target_root.clone(),
            statistics: None,
        };
        metadata.save(&self.target_root)?;

        info!("building file sets");
        let scan_budget = self.config.scan_budget();
        let mut trees: Vec<SourceTree> = Vec::new();
        let mut scan_failed = false;
        for source in &self.config.sources {
            let source_view = LocalView::new(&source.dir);
            if !source_view.is_available() {
                if self.resolve_missing_source(source, handler)? {
                    continue;
                }
                return Err(BackupError::SourceUnavailable {
                    name: source.name.clone(),
                    dir: source.dir.clone(),
                });
            }
            validate_methods(&self.config.compare_method, source_view.provides_mtime())
                .map_err(|message| BackupError::Config(ConfigError::Invalid(message)))?;

            let tree = self.scan_source(source, source_view, compare_root.as_deref(), &mut stats)?;
            trees.push(tree);
            if exceeded(stats.scan_errors, scan_budget) {
                scan_failed = true;
                break;
            }
        }
        info!("scanning statistics:\n{}", stats.scanning_protocol());
        info!("statistics pre-execution:\n{}", stats.action_protocol());

        let record = ActionRecord {
            backup_root: self.backup_root.clone(),
            instance_dir: self.target_root.clone(),
            max_backup_errors: self.config.max_backup_errors,
            sources: trees
                .iter()
                .map(|tree| SourceRecord {
                    name: tree.name.clone(),
                    source_root: tree.source_view.root().to_path_buf(),
                    compare_root: tree.compare_dir.clone(),
                    mode: self.config.mode,
                    created_at: Utc::now(),
                    actions: tree.plan.actions().to_vec(),
                })
                .collect(),
        };
        if self.config.save_actionfile {
            let path = self.target_root.join(ACTIONS_FILENAME);
            info!("saving the action file to '{}'", path.display());
            record.save_atomic(&path)?;
        }

        if scan_failed {
            error!(
                "too many errors occurred during scanning: {} occurred, {} permitted",
                stats.scan_errors,
                self.config.max_scanning_errors
            );
            return self.finish(
                metadata,
                stats,
                record,
                false,
                false,
                JobOutcome::ScanBudgetExceeded,
            );
        }

        // persist the planning statistics so a later apply-actions run can
        // report the full picture
        metadata.statistics = Some(stats.clone());
        metadata.save(&self.target_root)?;

        if !self.config.apply_actions {
            info!("'apply_actions' is disabled; no actions are performed");
            // the instance stays marked unsuccessful: a scanned-but-never
            // -applied instance must not become a compare base
            let scanned_any = !trees.is_empty();
            return self.finish(metadata, stats, record, scanned_any, false, JobOutcome::Completed);
        }

        self.check_free_space(&trees, handler)?;

        info!("starting to apply the actions");
        progress.begin(trees.iter().map(|tree| tree.plan.total_weight()).sum());
        let mut completed_sources = 0usize;
        let mut backup_failed = false;
        for tree in &trees {
            if tree.plan.actions().is_empty() {
                warn!("there is nothing to do for the source '{}'", tree.name);
                completed_sources += 1;
                continue;
            }
            info!("applying actions for the source '{}'", tree.name);
            let target_view = LocalView::new(&tree.target_dir);
            let mut executor = Executor::new(
                &tree.source_view,
                &target_view,
                tree.compare_dir.clone(),
                self.config.backup_budget(),
                cancel,
            );
            match executor.execute(tree.plan.actions(), &mut stats, progress) {
                Ok(()) => completed_sources += 1,
                Err(ExecuteError::BudgetExceeded { errors, permitted }) => {
                    error!(
                        "too many errors occurred during the backup: {errors} occurred, \
                         {permitted} permitted"
                    );
                    backup_failed = true;
                    break;
                }
                Err(ExecuteError::Cancelled) => {
                    warn!("cancellation requested; finalizing the record");
                    stats.end_time = Some(Utc::now());
                    metadata.statistics = Some(stats);
                    metadata.save(&self.target_root)?;
                    return Err(BackupError::Cancelled);
                }
            }
        }

        let successful = !backup_failed && completed_sources > 0;
        let outcome = if backup_failed {
            JobOutcome::BackupBudgetExceeded
        } else {
            JobOutcome::Completed
        };
        self.finish(metadata, stats, record, successful, true, outcome)
    }

    fn finish(
        &self,
        mut metadata: BackupMetadata,
        mut stats: BackupStatistics,
        record: ActionRecord,
        successful: bool,
        applied: bool,
        outcome: JobOutcome,
    ) -> Result<JobReport, BackupError> {
        stats.end_time = Some(Utc::now());
        metadata.successful = successful && applied;
        metadata.statistics = Some(stats.clone());
        metadata.save(&self.target_root)?;
        if successful {
            info!("job finished successfully");
        } else {
            error!(
                "the number of errors was higher than the threshold; the backup is \
                 considered to have failed"
            );
        }
        info!("final statistics:\n{}", stats.full_protocol());
        Ok(JobReport {
            successful,
            applied,
            outcome,
            statistics: stats,
            instance_dir: self.target_root.clone(),
            record,
        })
    }

    /// Resolves the missing-source policy. Returns `true` when the source
    /// is to be skipped.
    fn resolve_missing_source(
        &self,
        source: &SourceConfig,
        handler: &mut dyn DecisionHandler,
    ) -> Result<bool, BackupError> {
        match self.config.source_unavailable_action {
            PolicyAction::Proceed => {
                error!(
                    "source '{}' at '{}' is not available; skipping it",
                    source.name,
                    source.dir.display()
                );
                Ok(true)
            }
            PolicyAction::Prompt => {
                if handler.confirm_source_skip(&source.name, &source.dir) {
                    warn!("skipping source '{}' on operator decision", source.name);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            PolicyAction::Abort => Ok(false),
        }
    }

    fn scan_source(
        &self,
        source: &SourceConfig,
        source_view: LocalView,
        compare_root: Option<&Path>,
        stats: &mut BackupStatistics,
    ) -> Result<SourceTree, BackupError> {
        let excludes = ExcludeSet::new(source.exclude_paths.iter().cloned())
            .map_err(|pattern_error| ConfigError::Invalid(pattern_error.to_string()))?;
        let scan_budget = self.config.scan_budget();

        info!(
            "scanning source '{}' at '{}'",
            source.name,
            source.dir.display()
        );
        let mut scanner =
            Scanner::new(&source_view, &excludes).with_error_budget(stats.scan_errors, scan_budget);
        let mut source_entries = Vec::new();
        for entry in scanner.by_ref() {
            stats.record_source_entry(&entry);
            source_entries.push(entry);
        }
        stats.scan_errors += scanner.errors();

        let compare_dir = if self.config.versioned && self.config.compare_with_last_backup {
            compare_root.map(|root| root.join(&source.name))
        } else if !self.config.versioned {
            Some(self.target_root.join(&source.name))
        } else {
            None
        };

        let compare_view = compare_dir.as_deref().map(LocalView::new);
        let mut compare_entries = Vec::new();
        if let Some(view) = compare_view.as_ref().filter(|view| view.is_available()) {
            info!("comparing with '{}'", view.root().display());
            let no_excludes = ExcludeSet::empty();
            let mut compare_scanner =
                Scanner::new(view, &no_excludes).with_error_budget(stats.scan_errors, scan_budget);
            for entry in compare_scanner.by_ref() {
                stats.record_compare_entry(&entry);
                compare_entries.push(entry);
            }
            stats.scan_errors += compare_scanner.errors();
        }

        let mut comparison_errors = 0;
        let paired = match compare_view.as_ref() {
            Some(view) => {
                let comparator =
                    Comparator::new(&self.config.compare_method, &source_view, view);
                pair_entries(
                    source_entries,
                    compare_entries,
                    Some(&comparator),
                    &mut comparison_errors,
                )
            }
            None => pair_entries(source_entries, compare_entries, None, &mut comparison_errors),
        };
        stats.scan_errors += comparison_errors;

        let settings = PlanSettings {
            mode: self.config.mode,
            copy_empty_dirs: self.config.copy_empty_dirs,
            fresh_target: self.config.versioned,
        };
        let plan = build_plan(&paired, &settings, stats);
        info!(
            "generated {} actions for source '{}'",
            plan.actions().len(),
            source.name
        );
        Ok(SourceTree {
            name: source.name.clone(),
            source_view,
            target_dir: self.target_root.join(&source.name),
            compare_dir,
            plan,
        })
    }

    fn check_free_space(
        &self,
        trees: &[SourceTree],
        handler: &mut dyn DecisionHandler,
    ) -> Result<(), BackupError> {
        let needed: u64 = trees
            .iter()
            .map(|tree| tree.plan.expected_bytes_copied())
            .sum();
        let target_view = LocalView::new(&self.target_root);
        let Some(available) = target_view.free_space()? else {
            debug!("no free-space probe on this platform; skipping the check");
            return Ok(());
        };
        if available >= needed {
            return Ok(());
        }
        let message = format!(
            "the target drive has {} free; the backup is expected to need another {}",
            format_bytes(available),
            format_bytes(needed)
        );
        match self.config.target_drive_full_action {
            PolicyAction::Proceed => {
                error!("{message}; trying to proceed anyway");
                Ok(())
            }
            PolicyAction::Prompt => {
                if handler.confirm_drive_full(needed, available) {
                    Ok(())
                } else {
                    error!("{message}; the backup was interrupted by the operator");
                    Err(BackupError::DriveFull { needed, available })
                }
            }
            PolicyAction::Abort => {
                error!("{message}; aborting in accordance with the settings");
                Err(BackupError::DriveFull { needed, available })
            }
        }
    }

    fn find_compare_root(&self) -> Option<PathBuf> {
        if !(self.config.versioned && self.config.compare_with_last_backup) {
            return None;
        }
        match find_most_recent_successful_backup(&self.backup_root, &self.target_root) {
            Some(path) => {
                info!("chose old backup to compare to: '{}'", path.display());
                Some(path)
            }
            None => {
                warn!("no old backup found; creating first backup");
                None
            }
        }
    }

    /// Applies a previously persisted action record found in
    /// `instance_dir`, rehydrating the statistics the scanning phase
    /// stored in the instance metadata.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError`] when the record is missing or invalid, a
    /// recorded source is unreachable, or the run is cancelled.
    pub fn apply_recorded(
        instance_dir: &Path,
        handler: &mut dyn DecisionHandler,
        progress: &mut dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<JobReport, BackupError> {
        let record = ActionRecord::load(&instance_dir.join(ACTIONS_FILENAME))?;
        let mut metadata = match BackupMetadata::load(instance_dir) {
            Ok(metadata) => Some(metadata),
            Err(record_error) => {
                warn!(
                    "instance metadata could not be loaded ({record_error}); \
                     statistics will only cover this execution"
                );
                None
            }
        };
        let mut stats = metadata
            .as_ref()
            .and_then(|metadata| metadata.statistics.clone())
            .unwrap_or_default();
        if stats.start_time.is_none() {
            stats.start_time = Some(Utc::now());
        }
        let execution_budget = budget(record.max_backup_errors);

        let needed: u64 = record
            .sources
            .iter()
            .flat_map(|source| source.actions.iter())
            .filter(|action| matches!(action, Action::Copy { .. }))
            .map(Action::size)
            .sum();
        let instance_view = LocalView::new(instance_dir);
        if let Some(available) = instance_view.free_space()? {
            if available < needed && !handler.confirm_drive_full(needed, available) {
                return Err(BackupError::DriveFull { needed, available });
            }
        }

        progress.begin(
            record
                .sources
                .iter()
                .flat_map(|source| source.actions.iter())
                .map(crate::progress::action_weight)
                .sum(),
        );

        let mut backup_failed = false;
        for source_record in &record.sources {
            let source_view = LocalView::new(&source_record.source_root);
            if !source_view.is_available() {
                return Err(BackupError::SourceUnavailable {
                    name: source_record.name.clone(),
                    dir: source_record.source_root.clone(),
                });
            }
            info!("applying recorded actions for the source '{}'", source_record.name);
            let target_view = LocalView::new(instance_dir.join(&source_record.name));
            let mut executor = Executor::new(
                &source_view,
                &target_view,
                source_record.compare_root.clone(),
                execution_budget,
                cancel,
            );
            match executor.execute(&source_record.actions, &mut stats, progress) {
                Ok(()) => {}
                Err(ExecuteError::BudgetExceeded { errors, permitted }) => {
                    error!(
                        "too many errors occurred during the backup: {errors} occurred, \
                         {permitted} permitted"
                    );
                    backup_failed = true;
                    break;
                }
                Err(ExecuteError::Cancelled) => {
                    if let Some(metadata) = &mut metadata {
                        stats.end_time = Some(Utc::now());
                        metadata.statistics = Some(stats);
                        metadata.save(instance_dir)?;
                    }
                    return Err(BackupError::Cancelled);
                }
            }
        }

        stats.end_time = Some(Utc::now());
        let successful = !backup_failed && !record.sources.is_empty();
        if let Some(metadata) = &mut metadata {
            metadata.successful = successful;
            metadata.statistics = Some(stats.clone());
            metadata.save(instance_dir)?;
        }
        info!("final statistics:\n{}", stats.full_protocol());
        Ok(JobReport {
            successful,
            applied: true,
            outcome: if backup_failed {
                JobOutcome::BackupBudgetExceeded
            } else {
                JobOutcome::Completed
            },
            statistics: stats,
            instance_dir: instance_dir.to_path_buf(),
            record,
        })
    }
}

fn exceeded(errors: u64, permitted: Option<u64>) -> bool {
    permitted.is_some_and(|permitted| errors > permitted)
}

/// Resolves the instance directory from the strftime pattern, appending
/// `_2`, `_3`, … until an unused name is found. The directory is created
/// exclusively, so two concurrent runs cannot claim the same instance.
fn find_target_root(backup_root: &Path, version_name: &str) -> Result<PathBuf, BackupError> {
    let mut suffix: u32 = 1;
    loop {
        let mut dirname = format_version_name(version_name)?;
        if suffix > 1 {
            dirname.push_str(&format!("_{suffix}"));
        }
        let candidate = backup_root.join(&dirname);
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(source) if source.kind() == io::ErrorKind::AlreadyExists => {
                suffix += 1;
                error!(
                    "target backup directory '{}' already exists; appending suffix '_{suffix}'",
                    candidate.display()
                );
            }
            Err(source) => {
                return Err(BackupError::TargetUnavailable {
                    path: candidate,
                    source,
                });
            }
        }
    }
}

/// Expands a strftime pattern against the local wall clock.
fn format_version_name(pattern: &str) -> Result<String, BackupError> {
    let items: Vec<chrono::format::Item<'_>> =
        chrono::format::StrftimeItems::new(pattern).collect();
    if items
        .iter()
        .any(|item| matches!(item, chrono::format::Item::Error))
    {
        return Err(BackupError::Config(ConfigError::Invalid(format!(
            "invalid version_name pattern '{pattern}'"
        ))));
    }
    Ok(Local::now().format_with_items(items.into_iter()).to_string())
}

/// Finds the most recent successful backup instance under `root`,
/// excluding the instance currently being written.
///
/// Instances are recognized by their metadata file and ordered by the
/// recorded start time. Unsuccessful newer instances are skipped with an
/// error log, matching the rule that only completed backups may serve as a
/// compare base.
fn find_most_recent_successful_backup(root: &Path, excluded: &Path) -> Option<PathBuf> {
    let read_dir = match fs::read_dir(root) {
        Ok(read_dir) => read_dir,
        Err(error) => {
            error!("could not list backup root '{}': {error}", root.display());
            return None;
        }
    };

    let mut candidates: Vec<(DateTime<Utc>, bool, PathBuf)> = Vec::new();
    for entry in read_dir.flatten() {
        let path = entry.path();
        if !path.is_dir() || path == excluded {
            continue;
        }
        if !path.join(METADATA_FILENAME).is_file() {
            warn!(
                "directory '{}' in the backup root does not appear to be a backup instance",
                path.display()
            );
            continue;
        }
        match BackupMetadata::load(&path) {
            Ok(metadata) => candidates.push((metadata.started, metadata.successful, path)),
            Err(record_error) => {
                error!(
                    "could not load metadata of old backup '{}': {record_error}",
                    path.display()
                );
            }
        }
    }
    debug!("found {} existing backup instances", candidates.len());

    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, successful, path) in candidates {
        if successful {
            return Some(path);
        }
        error!(
            "the most recent backup '{}' failed or did not run and is skipped as a \
             compare base",
            path.display()
        );
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exceeded_respects_disabled_budget() {
        assert!(!exceeded(1_000, None));
        assert!(!exceeded(3, Some(3)));
        assert!(exceeded(4, Some(3)));
    }

    #[test]
    fn version_name_expansion_accepts_strftime() {
        let name = format_version_name("%Y_%m_%d").expect("pattern expands");
        assert_eq!(name.len(), 10);
        assert!(name.chars().next().expect("nonempty").is_ascii_digit());
    }

    #[test]
    fn version_name_expansion_rejects_bad_pattern() {
        assert!(format_version_name("%Q").is_err());
    }

    #[test]
    fn target_root_disambiguates_with_suffixes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let first = find_target_root(temp.path(), "static").expect("create");
        let second = find_target_root(temp.path(), "static").expect("create");
        let third = find_target_root(temp.path(), "static").expect("create");
        assert_eq!(first.file_name().expect("name"), "static");
        assert_eq!(second.file_name().expect("name"), "static_2");
        assert_eq!(third.file_name().expect("name"), "static_3");
    }

    #[test]
    fn compare_base_selection_skips_failed_instances() {
        let temp = tempfile::tempdir().expect("tempdir");
        let make_instance = |name: &str, successful: bool, started: DateTime<Utc>| {
            let dir = temp.path().join(name);
            fs::create_dir(&dir).expect("mkdir");
            let metadata = BackupMetadata {
                name: name.to_string(),
                successful,
                started,
                sources: Vec::new(),
                compare_backup: None,
                backup_directory: dir.clone(),
                statistics: None,
            };
            metadata.save(&dir).expect("save");
            dir
        };
        let old = make_instance(
            "2026_01_01",
            true,
            "2026-01-01T10:00:00Z".parse().expect("timestamp"),
        );
        let _failed = make_instance(
            "2026_02_01",
            false,
            "2026-02-01T10:00:00Z".parse().expect("timestamp"),
        );
        let current = temp.path().join("2026_03_01");
        fs::create_dir(&current).expect("mkdir");

        let chosen = find_most_recent_successful_backup(temp.path(), &current)
            .expect("a successful instance exists");
        assert_eq!(chosen, old);
    }

    #[test]
    fn compare_base_selection_ignores_foreign_directories() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("not_a_backup")).expect("mkdir");
        let current = temp.path().join("current");
        fs::create_dir(&current).expect("mkdir");
        assert!(find_most_recent_successful_backup(temp.path(), &current).is_none());
    }
}
