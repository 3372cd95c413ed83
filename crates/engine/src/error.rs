//! Fatal error conditions of a backup job.
//!
//! Per-item failures never surface here; the scanner and the executor
//! absorb them into the error budgets. This type covers the conditions that
//! terminate a job: invalid configuration, unreachable roots, an operator
//! abort, and cancellation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::plan::RecordError;
use crate::stats::format_bytes;

/// Terminal failure of a backup job.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The configuration is invalid; nothing was touched.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A source is unreachable and the policy demands an abort.
    #[error("source '{name}' at '{}' is not available", dir.display())]
    SourceUnavailable {
        /// Configured source name.
        name: String,
        /// Configured source directory.
        dir: PathBuf,
    },
    /// The backup root could not be created or accessed.
    #[error("backup target '{}' is not available: {source}", path.display())]
    TargetUnavailable {
        /// Path of the backup root or instance directory.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The projected copy volume exceeds the free space and the policy
    /// demands an abort.
    #[error(
        "the target drive has {} free but the backup needs another {}",
        format_bytes(*available),
        format_bytes(*needed)
    )]
    DriveFull {
        /// Bytes the plan expects to write.
        needed: u64,
        /// Bytes available on the target volume.
        available: u64,
    },
    /// The action record could not be written or read.
    #[error(transparent)]
    Record(#[from] RecordError),
    /// Cooperative cancellation was observed.
    #[error("the backup was cancelled")]
    Cancelled,
    /// Filesystem failure outside the per-action error accounting.
    #[error(transparent)]
    Fs(#[from] fsview::FsError),
    /// I/O failure during job bookkeeping (metadata, instance directory).
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// Affected path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}
