//! Plan-ordering invariants and executor error handling.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use engine::compare::Comparator;
use engine::config::{BackupMode, CompareMethod};
use engine::diff::pair_entries;
use engine::executor::{ExecuteError, Executor};
use engine::plan::{build_plan, Action, Plan, PlanSettings};
use engine::progress::NullProgress;
use engine::stats::BackupStatistics;
use engine::CancelFlag;
use filters::ExcludeSet;
use fsview::{EntryKind, LocalView, RelPath};
use walk::Scanner;

fn plan_trees(
    source: &Path,
    compare: Option<&Path>,
    mode: BackupMode,
    fresh_target: bool,
) -> Plan {
    let source_view = LocalView::new(source);
    let excludes = ExcludeSet::empty();
    let source_entries: Vec<walk::Entry> = Scanner::new(&source_view, &excludes).collect();
    let compare_entries: Vec<walk::Entry> = match compare {
        Some(dir) if dir.is_dir() => {
            let view = LocalView::new(dir);
            Scanner::new(&view, &excludes).collect()
        }
        _ => Vec::new(),
    };
    let methods = [CompareMethod::Size, CompareMethod::Bytes];
    let mut errors = 0;
    let paired = match compare {
        Some(dir) => {
            let compare_view = LocalView::new(dir);
            let comparator = Comparator::new(&methods, &source_view, &compare_view);
            pair_entries(source_entries, compare_entries, Some(&comparator), &mut errors)
        }
        None => pair_entries(source_entries, compare_entries, None, &mut errors),
    };
    let mut stats = BackupStatistics::default();
    build_plan(
        &paired,
        &PlanSettings {
            mode,
            copy_empty_dirs: true,
            fresh_target,
        },
        &mut stats,
    )
}

#[test]
fn every_file_action_is_preceded_by_its_ancestor_directories() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("source");
    fs::create_dir_all(source.join("a/b/c")).expect("mkdir");
    fs::write(source.join("top"), b"t").expect("write");
    fs::write(source.join("a/f1"), b"1").expect("write");
    fs::write(source.join("a/b/f2"), b"2").expect("write");
    fs::write(source.join("a/b/c/f3"), b"3").expect("write");

    let plan = plan_trees(&source, None, BackupMode::Save, true);

    let mut seen_dirs: HashSet<String> = HashSet::new();
    for action in plan.actions() {
        if action.is_directory_action() {
            seen_dirs.insert(action.relpath().to_slash_string());
            continue;
        }
        let mut ancestor = action.relpath().parent();
        while let Some(dir) = ancestor {
            assert!(
                seen_dirs.contains(&dir.to_slash_string()),
                "ancestor '{}' of '{}' must be created first",
                dir,
                action.relpath()
            );
            ancestor = dir.parent();
        }
    }
}

#[test]
fn deletions_come_last_in_reverse_depth_order() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("source");
    let target = temp.path().join("target");
    fs::create_dir(&source).expect("mkdir");
    fs::create_dir_all(target.join("gone/deeper")).expect("mkdir");
    fs::write(target.join("gone/file"), b"f").expect("write");
    fs::write(target.join("gone/deeper/leaf"), b"l").expect("write");

    let plan = plan_trees(&source, Some(&target), BackupMode::Mirror, false);

    let first_delete = plan
        .actions()
        .iter()
        .position(|action| matches!(action, Action::Delete { .. }))
        .expect("plan contains deletions");
    assert!(
        plan.actions()[first_delete..]
            .iter()
            .all(|action| matches!(action, Action::Delete { .. })),
        "no non-delete action may follow the first deletion"
    );
    let depths: Vec<usize> = plan.actions()[first_delete..]
        .iter()
        .map(|action| action.relpath().depth())
        .collect();
    let mut sorted = depths.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(depths, sorted, "deletions must run deepest-first");
}

#[test]
fn mirror_deletion_of_a_subtree_succeeds_bottom_up() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("source");
    let target = temp.path().join("target");
    fs::create_dir(&source).expect("mkdir");
    fs::create_dir_all(target.join("old/nested")).expect("mkdir");
    fs::write(target.join("old/a"), b"a").expect("write");
    fs::write(target.join("old/nested/b"), b"b").expect("write");

    let plan = plan_trees(&source, Some(&target), BackupMode::Mirror, false);

    let source_view = LocalView::new(&source);
    let target_view = LocalView::new(&target);
    let cancel = CancelFlag::new();
    let mut stats = BackupStatistics::default();
    let mut executor = Executor::new(&source_view, &target_view, None, None, &cancel);
    executor
        .execute(plan.actions(), &mut stats, &mut NullProgress)
        .expect("bottom-up deletion succeeds");

    assert!(!target.join("old").exists());
    assert_eq!(stats.backup_errors, 0);
    assert_eq!(stats.files_deleted, 4);
}

fn failing_copy_actions(count: usize) -> Vec<Action> {
    let mut actions = vec![Action::NewDir {
        relpath: RelPath::root(),
        mtime: None,
    }];
    for index in 0..count {
        actions.push(Action::Copy {
            relpath: RelPath::new(format!("missing-{index}")).expect("path"),
            size: 10,
            mtime: None,
        });
    }
    actions
}

#[test]
fn error_budget_stops_execution_at_the_offending_action() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("source");
    let target = temp.path().join("target");
    fs::create_dir(&source).expect("mkdir");
    fs::create_dir(&target).expect("mkdir");

    let source_view = LocalView::new(&source);
    let target_view = LocalView::new(&target);
    let cancel = CancelFlag::new();
    let mut stats = BackupStatistics::default();
    let mut executor = Executor::new(&source_view, &target_view, None, Some(1), &cancel);
    let actions = failing_copy_actions(3);
    let error = executor
        .execute(&actions, &mut stats, &mut NullProgress)
        .expect_err("budget must be exceeded");

    assert!(matches!(
        error,
        ExecuteError::BudgetExceeded {
            errors: 2,
            permitted: 1
        }
    ));
    assert_eq!(stats.backup_errors, 2, "executor stops after the second failure");
}

#[test]
fn disabled_budget_absorbs_every_failure() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("source");
    let target = temp.path().join("target");
    fs::create_dir(&source).expect("mkdir");
    fs::create_dir(&target).expect("mkdir");

    let source_view = LocalView::new(&source);
    let target_view = LocalView::new(&target);
    let cancel = CancelFlag::new();
    let mut stats = BackupStatistics::default();
    let mut executor = Executor::new(&source_view, &target_view, None, None, &cancel);
    executor
        .execute(&failing_copy_actions(25), &mut stats, &mut NullProgress)
        .expect("disabled budget never stops execution");
    assert_eq!(stats.backup_errors, 25);
}

#[test]
fn cancellation_stops_before_the_next_action() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("source");
    let target = temp.path().join("target");
    fs::create_dir(&source).expect("mkdir");
    fs::create_dir(&target).expect("mkdir");

    let source_view = LocalView::new(&source);
    let target_view = LocalView::new(&target);
    let cancel = CancelFlag::new();
    cancel.cancel();
    let mut stats = BackupStatistics::default();
    let mut executor = Executor::new(&source_view, &target_view, None, None, &cancel);
    let error = executor
        .execute(&failing_copy_actions(1), &mut stats, &mut NullProgress)
        .expect_err("cancellation must surface");
    assert!(matches!(error, ExecuteError::Cancelled));
    assert_eq!(stats.backup_errors, 0, "no action ran");
}

#[test]
fn failed_copy_leaves_no_partial_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("source");
    let target = temp.path().join("target");
    fs::create_dir(&source).expect("mkdir");
    fs::create_dir(&target).expect("mkdir");
    // the scanned size no longer matches the file contents
    fs::write(source.join("shrunk"), b"now-much-longer-than-recorded").expect("write");

    let source_view = LocalView::new(&source);
    let target_view = LocalView::new(&target);
    let cancel = CancelFlag::new();
    let mut stats = BackupStatistics::default();
    let mut executor = Executor::new(&source_view, &target_view, None, None, &cancel);
    let actions = vec![
        Action::NewDir {
            relpath: RelPath::root(),
            mtime: None,
        },
        Action::Copy {
            relpath: RelPath::new("shrunk").expect("path"),
            size: 4,
            mtime: None,
        },
    ];
    executor
        .execute(&actions, &mut stats, &mut NullProgress)
        .expect("single failure stays within the disabled budget");

    assert_eq!(stats.backup_errors, 1);
    assert_eq!(stats.files_copied, 0);
    assert!(
        !target.join("shrunk").exists(),
        "partial output must be removed"
    );
}

#[test]
fn delete_action_removes_only_the_named_kind() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("source");
    let target = temp.path().join("target");
    fs::create_dir(&source).expect("mkdir");
    fs::create_dir(&target).expect("mkdir");
    fs::write(target.join("stale"), b"bytes").expect("write");

    let source_view = LocalView::new(&source);
    let target_view = LocalView::new(&target);
    let cancel = CancelFlag::new();
    let mut stats = BackupStatistics::default();
    let mut executor = Executor::new(&source_view, &target_view, None, None, &cancel);
    let actions = vec![Action::Delete {
        relpath: RelPath::new("stale").expect("path"),
        kind: EntryKind::File,
    }];
    executor
        .execute(&actions, &mut stats, &mut NullProgress)
        .expect("delete succeeds");
    assert_eq!(stats.files_deleted, 1);
    assert_eq!(stats.bytes_deleted, 5);
}
