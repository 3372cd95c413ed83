use chrono::{DateTime, Utc};
use fsview::EntryKind;
use walk::Entry;

use crate::config::BackupMode;
use crate::diff::{PairedEntry, Verdict};
use crate::progress::action_weight;
use crate::stats::BackupStatistics;

use super::Action;

/// Inputs selecting the planner matrix.
#[derive(Clone, Copy, Debug)]
pub struct PlanSettings {
    /// Backup mode.
    pub mode: BackupMode,
    /// Whether empty directories are materialized.
    pub copy_empty_dirs: bool,
    /// Whether the plan targets a fresh versioned instance directory
    /// (selects `new_dir` over `existing_dir` for the root).
    pub fresh_target: bool,
}

/// Ordered action list for one source.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Plan {
    actions: Vec<Action>,
    expected_bytes_copied: u64,
}

impl Plan {
    /// Returns the actions in application order.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Consumes the plan, yielding the action list.
    #[must_use]
    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    /// Total bytes the copy actions are expected to write, for the
    /// free-space check.
    #[must_use]
    pub const fn expected_bytes_copied(&self) -> u64 {
        self.expected_bytes_copied
    }

    /// Total progress weight of the plan.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.actions.iter().map(action_weight).sum()
    }
}

fn entry_mtime(entry: &Entry) -> Option<DateTime<Utc>> {
    entry.mtime().map(DateTime::<Utc>::from)
}

/// Builds the action list for one paired scan under the mode matrix.
///
/// The emitted order satisfies the plan invariants: every directory action
/// precedes the file actions inside that directory (the directory group is
/// emitted first, in scan order, which is pre-order), file actions follow in
/// scan order, and deletions come last in reverse depth order so directories
/// are empty when their own deletion runs.
#[must_use]
pub fn build_plan(
    paired: &[PairedEntry],
    settings: &PlanSettings,
    stats: &mut BackupStatistics,
) -> Plan {
    let mut dirs: Vec<Action> = Vec::new();
    let mut files: Vec<Action> = Vec::new();
    let mut deletes: Vec<Action> = Vec::new();
    let mut expected_bytes_copied = 0u64;

    // the instance (or target) root is always materialized
    dirs.push(if settings.fresh_target {
        Action::NewDir {
            relpath: fsview::RelPath::root(),
            mtime: None,
        }
    } else {
        Action::ExistingDir {
            relpath: fsview::RelPath::root(),
            mtime: None,
        }
    });

    for pair in paired {
        match (pair.source(), pair.compare()) {
            (Some(source), compare) if source.is_dir() => {
                if source.is_empty_dir() {
                    if settings.copy_empty_dirs {
                        dirs.push(Action::EmptyDir {
                            relpath: source.relpath().clone(),
                            mtime: entry_mtime(source),
                        });
                    }
                } else if compare.is_some() {
                    dirs.push(Action::ExistingDir {
                        relpath: source.relpath().clone(),
                        mtime: entry_mtime(source),
                    });
                } else {
                    dirs.push(Action::NewDir {
                        relpath: source.relpath().clone(),
                        mtime: entry_mtime(source),
                    });
                }
            }
            (Some(source), None) => {
                stats.files_to_copy += 1;
                stats.bytes_to_copy += source.size();
                expected_bytes_copied += source.size();
                files.push(Action::Copy {
                    relpath: source.relpath().clone(),
                    size: source.size(),
                    mtime: entry_mtime(source),
                });
            }
            (Some(source), Some(_)) => match pair.verdict() {
                Some(Verdict::Same) => {
                    if settings.mode == BackupMode::Hardlink {
                        stats.files_to_hardlink += 1;
                        stats.bytes_to_hardlink += source.size();
                        files.push(Action::Hardlink {
                            relpath: source.relpath().clone(),
                            size: source.size(),
                            mtime: entry_mtime(source),
                        });
                    }
                }
                Some(Verdict::Different) | None => {
                    stats.files_to_copy += 1;
                    stats.bytes_to_copy += source.size();
                    expected_bytes_copied += source.size();
                    files.push(Action::Copy {
                        relpath: source.relpath().clone(),
                        size: source.size(),
                        mtime: entry_mtime(source),
                    });
                }
            },
            (None, Some(compare)) => {
                // deletions only apply when the compare side is the target
                // itself; a fresh versioned instance has nothing to delete
                if settings.mode == BackupMode::Mirror && !settings.fresh_target {
                    stats.files_to_delete += 1;
                    stats.bytes_to_delete += compare.size();
                    deletes.push(Action::Delete {
                        relpath: compare.relpath().clone(),
                        kind: if compare.is_dir() {
                            EntryKind::Directory
                        } else {
                            EntryKind::File
                        },
                    });
                }
            }
            (None, None) => unreachable!("paired entry has at least one side"),
        }
    }

    // children are removed before their parent directory
    deletes.sort_by_key(|action| std::cmp::Reverse(action.relpath().depth()));

    let mut actions = dirs;
    actions.append(&mut files);
    actions.append(&mut deletes);
    Plan {
        actions,
        expected_bytes_copied,
    }
}
