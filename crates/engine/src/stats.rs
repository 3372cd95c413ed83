//! Statistics accumulated across scanning, planning, and execution.
//!
//! The accumulator is owned by the job and handed down by mutable borrow;
//! there is no process-wide state, so concurrent or nested jobs stay
//! isolated and tests can inspect the counters directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walk::Entry;

/// Counter block for one backup job.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupStatistics {
    /// Scan errors across all sources; folder and file failures cannot
    /// always be distinguished, so a single counter covers both.
    pub scan_errors: u64,
    /// Files enumerated on the source side.
    pub files_in_source: u64,
    /// Directories enumerated on the source side.
    pub folders_in_source: u64,
    /// Total source bytes.
    pub bytes_in_source: u64,
    /// Files enumerated on the compare side.
    pub files_in_compare: u64,
    /// Directories enumerated on the compare side.
    pub folders_in_compare: u64,
    /// Total compare bytes.
    pub bytes_in_compare: u64,

    /// Files the plan schedules for copying.
    pub files_to_copy: u64,
    /// Bytes the plan schedules for copying.
    pub bytes_to_copy: u64,
    /// Files the plan schedules for hardlinking.
    pub files_to_hardlink: u64,
    /// Bytes the plan schedules for hardlinking.
    pub bytes_to_hardlink: u64,
    /// Entries the plan schedules for deletion.
    pub files_to_delete: u64,
    /// Bytes the plan schedules for deletion.
    pub bytes_to_delete: u64,

    /// Files actually copied.
    pub files_copied: u64,
    /// Bytes actually copied.
    pub bytes_copied: u64,
    /// Files actually hardlinked.
    pub files_hardlinked: u64,
    /// Bytes referenced through hardlinks.
    pub bytes_hardlinked: u64,
    /// Entries actually deleted.
    pub files_deleted: u64,
    /// Bytes freed by deletions.
    pub bytes_deleted: u64,
    /// Directories created on the target.
    pub dirs_created: u64,
    /// Failed actions during execution.
    pub backup_errors: u64,

    /// Job start.
    pub start_time: Option<DateTime<Utc>>,
    /// Job end.
    pub end_time: Option<DateTime<Utc>>,
}

impl BackupStatistics {
    /// Folds one source-side scan entry into the counters.
    pub fn record_source_entry(&mut self, entry: &Entry) {
        if entry.is_dir() {
            self.folders_in_source += 1;
        } else {
            self.files_in_source += 1;
        }
        self.bytes_in_source += entry.size();
    }

    /// Folds one compare-side scan entry into the counters.
    pub fn record_compare_entry(&mut self, entry: &Entry) {
        if entry.is_dir() {
            self.folders_in_compare += 1;
        } else {
            self.files_in_compare += 1;
        }
        self.bytes_in_compare += entry.size();
    }

    /// Renders the scanning-phase block.
    #[must_use]
    pub fn scanning_protocol(&self) -> String {
        format!(
            "\tSource:\t\t\t{} folders, {} files, {}\n\
             \tCompare:\t\t{} folders, {} files, {}\n\
             \tScanning errors:\t{}",
            self.folders_in_source,
            self.files_in_source,
            format_bytes(self.bytes_in_source),
            self.folders_in_compare,
            self.files_in_compare,
            format_bytes(self.bytes_in_compare),
            self.scan_errors
        )
    }

    /// Renders the planning-phase block.
    #[must_use]
    pub fn action_protocol(&self) -> String {
        format!(
            "\tTo copy:\t\t{} files, {}\n\
             \tTo hardlink:\t\t{} files, {}\n\
             \tTo delete:\t\t{} files, {}",
            self.files_to_copy,
            format_bytes(self.bytes_to_copy),
            self.files_to_hardlink,
            format_bytes(self.bytes_to_hardlink),
            self.files_to_delete,
            format_bytes(self.bytes_to_delete)
        )
    }

    /// Renders the execution-phase block.
    #[must_use]
    pub fn backup_protocol(&self) -> String {
        format!(
            "\tCopied:\t\t\t{} files, {}\n\
             \tHardlinked:\t\t{} files, {}\n\
             \tDeleted:\t\t{} files, {}\n\
             \tBackup errors:\t\t{}",
            self.files_copied,
            format_bytes(self.bytes_copied),
            self.files_hardlinked,
            format_bytes(self.bytes_hardlinked),
            self.files_deleted,
            format_bytes(self.bytes_deleted),
            self.backup_errors
        )
    }

    /// Renders all three blocks.
    #[must_use]
    pub fn full_protocol(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.scanning_protocol(),
            self.action_protocol(),
            self.backup_protocol()
        )
    }
}

/// Converts a byte count into a human-readable string.
///
/// Plain bytes are rendered without decimals, scaled units with one.
#[must_use]
pub fn format_bytes(num: u64) -> String {
    let mut value = num as f64;
    if value < 1024.0 {
        return format!("{value:.0} B");
    }
    for unit in ["Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"] {
        value /= 1024.0;
        if value < 1024.0 {
            return format!("{value:.1} {unit}B");
        }
    }
    format!("{:.1} YiB", value / 1024.0)
}
