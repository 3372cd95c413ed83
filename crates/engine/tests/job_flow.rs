//! Full job runs through [`engine::BackupJob`].

use std::fs;
use std::path::Path;

use engine::config::{BackupConfig, BackupMode, CompareMethod, LogLevel, PolicyAction};
use engine::{
    AbortOnPrompt, BackupJob, BackupMetadata, CancelFlag, JobOutcome, NullProgress, SourceConfig,
    ACTIONS_FILENAME, METADATA_FILENAME,
};

fn test_config(source_dir: &Path, backup_root: &Path, mode: BackupMode) -> BackupConfig {
    BackupConfig {
        sources: vec![SourceConfig {
            name: "data".to_string(),
            dir: source_dir.to_path_buf(),
            exclude_paths: Vec::new(),
        }],
        backup_root_dir: backup_root.to_path_buf(),
        mode,
        versioned: true,
        version_name: "%Y_%m_%d_%H%M%S".to_string(),
        compare_with_last_backup: true,
        copy_empty_dirs: true,
        save_actionfile: true,
        open_actionfile: false,
        apply_actions: true,
        compare_method: vec![CompareMethod::Size, CompareMethod::Bytes],
        log_level: LogLevel::Info,
        save_actionhtml: false,
        open_actionhtml: false,
        exclude_actionhtml_actions: Vec::new(),
        max_scanning_errors: 50,
        max_backup_errors: 50,
        target_drive_full_action: PolicyAction::Proceed,
        source_unavailable_action: PolicyAction::Abort,
    }
}

fn run_job(config: BackupConfig) -> engine::JobReport {
    let mut job = BackupJob::new(config).expect("job prepares");
    let cancel = CancelFlag::new();
    job.run(&mut AbortOnPrompt, &mut NullProgress, &cancel)
        .expect("job runs")
}

#[test]
fn first_hardlink_run_copies_and_marks_success() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("source");
    let backups = temp.path().join("backups");
    fs::create_dir_all(source.join("sub")).expect("mkdir");
    fs::write(source.join("a.txt"), b"alpha").expect("write");
    fs::write(source.join("sub/b.txt"), b"beta").expect("write");

    let report = run_job(test_config(&source, &backups, BackupMode::Hardlink));
    assert!(report.successful);
    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(report.statistics.files_copied, 2);
    assert_eq!(report.statistics.files_hardlinked, 0);

    let instance = &report.instance_dir;
    assert!(instance.join("data/a.txt").is_file());
    assert!(instance.join("data/sub/b.txt").is_file());
    assert!(instance.join(ACTIONS_FILENAME).is_file());
    let metadata = BackupMetadata::load(instance).expect("metadata readable");
    assert!(metadata.successful);
    assert!(metadata.statistics.is_some());
}

#[cfg(unix)]
#[test]
fn second_hardlink_run_links_against_the_first() {
    use std::os::unix::fs::MetadataExt;

    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("source");
    let backups = temp.path().join("backups");
    fs::create_dir_all(&source).expect("mkdir");
    fs::write(source.join("keep.txt"), b"stable").expect("write");

    let first = run_job(test_config(&source, &backups, BackupMode::Hardlink));
    let second = run_job(test_config(&source, &backups, BackupMode::Hardlink));
    assert!(second.successful);
    assert_ne!(first.instance_dir, second.instance_dir);
    assert_eq!(second.statistics.files_hardlinked, 1);
    assert_eq!(second.statistics.bytes_copied, 0);

    let first_ino = fs::metadata(first.instance_dir.join("data/keep.txt"))
        .expect("metadata")
        .ino();
    let second_ino = fs::metadata(second.instance_dir.join("data/keep.txt"))
        .expect("metadata")
        .ino();
    assert_eq!(first_ino, second_ino);
}

#[test]
fn failed_instance_is_not_used_as_compare_base() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("source");
    let backups = temp.path().join("backups");
    fs::create_dir_all(&source).expect("mkdir");
    fs::write(source.join("f"), b"contents").expect("write");

    let first = run_job(test_config(&source, &backups, BackupMode::Hardlink));
    assert!(first.successful);

    // forge a newer instance that claims to have failed
    let mut forged = BackupMetadata::load(&first.instance_dir).expect("metadata");
    forged.successful = false;
    forged.started = chrono::Utc::now();
    let failed_dir = backups.join("9999_failed");
    fs::create_dir(&failed_dir).expect("mkdir");
    forged.save(&failed_dir).expect("save");

    let second = run_job(test_config(&source, &backups, BackupMode::Hardlink));
    // the failed instance was skipped; the first (successful) one served as
    // the compare base, so the unchanged file was hardlinked, not copied
    assert_eq!(second.statistics.files_hardlinked, 1);
    assert_eq!(second.statistics.files_copied, 0);
}

#[test]
fn scan_only_run_stays_unsuccessful_and_resume_applies_it() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("source");
    let backups = temp.path().join("backups");
    fs::create_dir_all(source.join("sub")).expect("mkdir");
    fs::write(source.join("a.txt"), b"aaaa").expect("write");
    fs::write(source.join("sub/b.txt"), b"bb").expect("write");

    let mut config = test_config(&source, &backups, BackupMode::Hardlink);
    config.apply_actions = false;
    let report = run_job(config);
    assert!(report.successful, "a clean scan-only run succeeds");
    assert!(!report.applied);

    let instance = report.instance_dir.clone();
    assert!(instance.join(ACTIONS_FILENAME).is_file());
    assert!(!instance.join("data/a.txt").exists(), "nothing was applied");
    let metadata = BackupMetadata::load(&instance).expect("metadata");
    assert!(
        !metadata.successful,
        "a scan-only instance must never become a compare base"
    );

    let cancel = CancelFlag::new();
    let resumed = BackupJob::apply_recorded(
        &instance,
        &mut AbortOnPrompt,
        &mut NullProgress,
        &cancel,
    )
    .expect("resume applies the record");
    assert!(resumed.successful);
    assert_eq!(resumed.statistics.files_copied, 2);
    assert_eq!(resumed.statistics.bytes_copied, 6);
    // the planning statistics were rehydrated from the metadata
    assert_eq!(resumed.statistics.files_to_copy, 2);
    assert!(instance.join("data/a.txt").is_file());
    assert!(instance.join("data/sub/b.txt").is_file());
    let metadata = BackupMetadata::load(&instance).expect("metadata");
    assert!(metadata.successful);
}

#[test]
fn resumed_statistics_match_inline_execution() {
    let temp = tempfile::tempdir().expect("tempdir");
    let backups_inline = temp.path().join("inline");
    let backups_resumed = temp.path().join("resumed");
    let source = temp.path().join("source");
    fs::create_dir_all(source.join("sub")).expect("mkdir");
    fs::write(source.join("one"), vec![7u8; 111]).expect("write");
    fs::write(source.join("sub/two"), vec![8u8; 222]).expect("write");

    let inline = run_job(test_config(&source, &backups_inline, BackupMode::Hardlink));

    let mut scan_only = test_config(&source, &backups_resumed, BackupMode::Hardlink);
    scan_only.apply_actions = false;
    let scanned = run_job(scan_only);
    let cancel = CancelFlag::new();
    let resumed = BackupJob::apply_recorded(
        &scanned.instance_dir,
        &mut AbortOnPrompt,
        &mut NullProgress,
        &cancel,
    )
    .expect("resume applies");

    assert_eq!(inline.statistics.files_copied, resumed.statistics.files_copied);
    assert_eq!(inline.statistics.bytes_copied, resumed.statistics.bytes_copied);
    assert_eq!(inline.statistics.files_hardlinked, resumed.statistics.files_hardlinked);
    assert_eq!(inline.statistics.dirs_created, resumed.statistics.dirs_created);
    assert_eq!(inline.statistics.backup_errors, resumed.statistics.backup_errors);
}

#[test]
fn unversioned_mirror_runs_in_place() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("source");
    let backups = temp.path().join("backups");
    fs::create_dir_all(&source).expect("mkdir");
    fs::write(source.join("fresh"), b"fresh").expect("write");

    let mut config = test_config(&source, &backups, BackupMode::Mirror);
    config.versioned = false;
    config.compare_with_last_backup = false;
    // seed the in-place target with a stale entry
    fs::create_dir_all(backups.join("data")).expect("mkdir");
    fs::write(backups.join("data/stale"), b"old").expect("write");

    let report = run_job(config);
    assert!(report.successful);
    assert_eq!(report.instance_dir, backups);
    assert!(backups.join("data/fresh").is_file());
    assert!(!backups.join("data/stale").exists());
    assert!(backups.join(METADATA_FILENAME).is_file());
}

#[test]
fn missing_source_with_abort_policy_fails_fast() {
    let temp = tempfile::tempdir().expect("tempdir");
    let backups = temp.path().join("backups");
    let config = test_config(&temp.path().join("missing"), &backups, BackupMode::Save);
    let mut job = BackupJob::new(config).expect("job prepares");
    let cancel = CancelFlag::new();
    let error = job
        .run(&mut AbortOnPrompt, &mut NullProgress, &cancel)
        .expect_err("must abort");
    assert!(matches!(
        error,
        engine::BackupError::SourceUnavailable { .. }
    ));
}

#[test]
fn missing_source_with_proceed_policy_is_skipped() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("present");
    let backups = temp.path().join("backups");
    fs::create_dir_all(&source).expect("mkdir");
    fs::write(source.join("f"), b"x").expect("write");

    let mut config = test_config(&source, &backups, BackupMode::Save);
    config.sources.push(SourceConfig {
        name: "absent".to_string(),
        dir: temp.path().join("missing"),
        exclude_paths: Vec::new(),
    });
    config.source_unavailable_action = PolicyAction::Proceed;

    let report = run_job(config);
    assert!(report.successful, "one completed source suffices");
    assert!(report.instance_dir.join("present").exists() || report.instance_dir.join("data").exists());
}

#[test]
fn scan_budget_exhaustion_marks_the_job_failed() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("source");
    let backups = temp.path().join("backups");
    fs::create_dir_all(&source).expect("mkdir");

    let mut config = test_config(&source, &backups, BackupMode::Save);
    config.max_scanning_errors = 0;
    // a second, vanishing source produces the scan error
    config.source_unavailable_action = PolicyAction::Proceed;
    config.sources.push(SourceConfig {
        name: "flaky".to_string(),
        dir: source.clone(),
        exclude_paths: Vec::new(),
    });

    // sabotage: make the second source's directory unreadable by removing
    // it between the availability check and the scan is racy, so instead
    // exercise the budget with a directly unreadable tree
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let locked = source.join("locked");
        fs::create_dir(&locked).expect("mkdir");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("chmod");
        if fs::read_dir(&locked).is_err() {
            let report = run_job(config);
            assert!(!report.successful);
            assert_eq!(report.outcome, JobOutcome::ScanBudgetExceeded);
            assert!(!report.applied);
            let metadata = BackupMetadata::load(&report.instance_dir).expect("metadata");
            assert!(!metadata.successful);
        }
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("chmod back");
    }
}
