//! Applies an action list against the target tree.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::SystemTime;

use fsview::{EntryKind, FilesystemView, FsError, RelPath};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::cancel::CancelFlag;
use crate::plan::Action;
use crate::progress::{action_weight, ProgressSink};
use crate::stats::BackupStatistics;
use crate::COPY_BUFFER_SIZE;

/// Terminal conditions of an execution run.
///
/// Per-action failures are absorbed into the error budget and never surface
/// here; only budget exhaustion and cancellation stop the run.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// The error budget was exhausted; execution stopped at the current
    /// action. Already-applied actions are not rolled back.
    #[error("too many errors during backup: {errors} occurred, {permitted} permitted")]
    BudgetExceeded {
        /// Errors recorded so far.
        errors: u64,
        /// Configured maximum.
        permitted: u64,
    },
    /// Cooperative cancellation was observed between actions.
    #[error("the backup was cancelled")]
    Cancelled,
}

/// Applies plans for one source against its target tree.
pub struct Executor<'a> {
    source: &'a dyn FilesystemView,
    target: &'a dyn FilesystemView,
    compare_root: Option<PathBuf>,
    budget: Option<u64>,
    cancel: &'a CancelFlag,
}

impl<'a> Executor<'a> {
    /// Creates an executor copying from `source` into `target`.
    ///
    /// `compare_root` is the absolute per-source root of the prior backup
    /// (or the target itself for in-place runs); hardlink actions resolve
    /// their link targets against it.
    #[must_use]
    pub fn new(
        source: &'a dyn FilesystemView,
        target: &'a dyn FilesystemView,
        compare_root: Option<PathBuf>,
        budget: Option<u64>,
        cancel: &'a CancelFlag,
    ) -> Self {
        Self {
            source,
            target,
            compare_root,
            budget,
            cancel,
        }
    }

    /// Applies `actions` in order, then restores directory timestamps.
    ///
    /// Copying into a directory disturbs its modification time, so
    /// directory timestamps are applied in a second pass after all file
    /// actions have settled.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError`] on budget exhaustion or cancellation.
    /// Individual action failures are counted in `stats.backup_errors`.
    pub fn execute(
        &mut self,
        actions: &[Action],
        stats: &mut BackupStatistics,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ExecuteError> {
        for action in actions {
            if self.cancel.is_cancelled() {
                return Err(ExecuteError::Cancelled);
            }
            if let Err(fs_error) = self.apply(action, stats) {
                error!(action = action.tag().as_str(), path = %action.relpath(), error = %fs_error, "action failed");
                self.count_error(stats)?;
            }
            progress.advance(action_weight(action));
        }

        for action in actions {
            if !action.is_directory_action() {
                continue;
            }
            if self.cancel.is_cancelled() {
                return Err(ExecuteError::Cancelled);
            }
            let Some(mtime) = action.mtime() else {
                continue;
            };
            if let Err(fs_error) = self
                .target
                .set_mtime(action.relpath(), SystemTime::from(mtime))
            {
                error!(path = %action.relpath(), error = %fs_error, "failed to restore directory timestamp");
                self.count_error(stats)?;
            }
        }
        Ok(())
    }

    fn count_error(&self, stats: &mut BackupStatistics) -> Result<(), ExecuteError> {
        stats.backup_errors += 1;
        if let Some(permitted) = self.budget {
            if stats.backup_errors > permitted {
                return Err(ExecuteError::BudgetExceeded {
                    errors: stats.backup_errors,
                    permitted,
                });
            }
        }
        Ok(())
    }

    fn apply(&mut self, action: &Action, stats: &mut BackupStatistics) -> Result<(), FsError> {
        match action {
            Action::NewDir { relpath, .. } | Action::EmptyDir { relpath, .. } => {
                self.ensure_dir(relpath, stats)
            }
            Action::ExistingDir { relpath, .. } => {
                // sanity check against the compare base; mismatch is logged
                // and execution continues
                if let Some(base) = &self.compare_root {
                    if base.as_path() != self.target.root()
                        && !base.join(relpath.as_path()).is_dir()
                    {
                        warn!(
                            path = %relpath,
                            compare_root = %base.display(),
                            "directory tracked as existing is missing from the compare base"
                        );
                    }
                }
                self.ensure_dir(relpath, stats)
            }
            Action::Copy {
                relpath,
                size,
                mtime,
            } => {
                debug!(path = %relpath, "copy");
                let copied = self.copy_file(relpath, *size, *mtime)?;
                stats.files_copied += 1;
                stats.bytes_copied += copied;
                Ok(())
            }
            Action::Hardlink {
                relpath,
                size,
                mtime,
            } => self.hardlink(relpath, *size, *mtime, stats),
            Action::Delete { relpath, kind } => {
                debug!(path = %relpath, "delete");
                let freed = if kind.is_dir() {
                    0
                } else {
                    self.target
                        .stat(relpath)
                        .map(|info| info.size)
                        .unwrap_or(0)
                };
                self.target.remove(relpath, *kind)?;
                stats.files_deleted += 1;
                stats.bytes_deleted += freed;
                Ok(())
            }
        }
    }

    fn ensure_dir(&self, relpath: &RelPath, stats: &mut BackupStatistics) -> Result<(), FsError> {
        if self.target.mkdir(relpath)? {
            stats.dirs_created += 1;
        }
        Ok(())
    }

    fn hardlink(
        &mut self,
        relpath: &RelPath,
        size: u64,
        mtime: Option<chrono::DateTime<chrono::Utc>>,
        stats: &mut BackupStatistics,
    ) -> Result<(), FsError> {
        let Some(base) = &self.compare_root else {
            // the planner only schedules hardlinks when a compare root
            // exists, so a missing one means the record is inconsistent
            return Err(FsError::NotFound {
                path: self.target.full_path(relpath),
            });
        };
        let link_target = base.join(relpath.as_path());
        debug!(path = %relpath, target = %link_target.display(), "hardlink");
        match self.target.hardlink(&link_target, relpath) {
            Ok(()) => {
                stats.files_hardlinked += 1;
                stats.bytes_hardlinked += size;
                Ok(())
            }
            Err(fs_error) if fs_error.hardlink_degradable() => {
                warn!(
                    path = %relpath,
                    error = %fs_error,
                    "hard link not possible, falling back to copy"
                );
                let copied = self.copy_file(relpath, size, mtime)?;
                stats.files_copied += 1;
                stats.bytes_copied += copied;
                Ok(())
            }
            Err(fs_error) => Err(fs_error),
        }
    }

    /// Streams one file from source to target, verifying its size and
    /// applying the recorded timestamp. Partial output is removed on every
    /// failure path.
    fn copy_file(
        &mut self,
        relpath: &RelPath,
        expected_size: u64,
        mtime: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<u64, FsError> {
        let mut reader = self.source.open_read(relpath)?;
        let mut writer = self.target.open_write(relpath)?;

        let copied = match stream_copy(&mut reader, &mut writer) {
            Ok(copied) => copied,
            Err(source) => {
                drop(writer);
                self.remove_partial(relpath);
                return Err(FsError::classify(self.target.full_path(relpath), source));
            }
        };
        if let Err(source) = writer.flush() {
            drop(writer);
            self.remove_partial(relpath);
            return Err(FsError::classify(self.target.full_path(relpath), source));
        }
        drop(writer);

        if copied != expected_size {
            self.remove_partial(relpath);
            return Err(FsError::classify(
                self.target.full_path(relpath),
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected {expected_size} bytes, copied {copied}"),
                ),
            ));
        }

        if let Some(mtime) = mtime {
            self.target.set_mtime(relpath, SystemTime::from(mtime))?;
        }
        Ok(copied)
    }

    fn remove_partial(&self, relpath: &RelPath) {
        if let Err(fs_error) = self.target.remove(relpath, EntryKind::File) {
            if !fs_error.is_not_found() {
                warn!(path = %relpath, error = %fs_error, "failed to remove partial file");
            }
        }
    }
}

fn stream_copy(reader: &mut impl Read, writer: &mut impl Write) -> io::Result<u64> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut copied = 0u64;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(copied),
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        };
        writer.write_all(&buffer[..read])?;
        copied += read as u64;
    }
}
