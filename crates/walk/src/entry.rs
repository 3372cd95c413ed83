use std::time::SystemTime;

use fsview::{EntryKind, RelPath};

/// One enumerated item of a scanned tree.
///
/// Entries are produced by the scanner in canonical order and are immutable
/// afterwards; the diff and the planner only ever read them.
#[derive(Clone, Debug)]
pub struct Entry {
    relpath: RelPath,
    kind: EntryKind,
    size: u64,
    mtime: Option<SystemTime>,
    is_empty_dir: bool,
}

impl Entry {
    pub(crate) fn file(relpath: RelPath, size: u64, mtime: Option<SystemTime>) -> Self {
        Self {
            relpath,
            kind: EntryKind::File,
            size,
            mtime,
            is_empty_dir: false,
        }
    }

    pub(crate) fn directory(
        relpath: RelPath,
        mtime: Option<SystemTime>,
        is_empty_dir: bool,
    ) -> Self {
        Self {
            relpath,
            kind: EntryKind::Directory,
            size: 0,
            mtime,
            is_empty_dir,
        }
    }

    /// Returns the path relative to the scan root.
    #[must_use]
    pub fn relpath(&self) -> &RelPath {
        &self.relpath
    }

    /// Returns the entry kind.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Reports whether the entry is a directory.
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Returns the byte size (0 for directories).
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the modification time, when the view provided one.
    #[must_use]
    pub const fn mtime(&self) -> Option<SystemTime> {
        self.mtime
    }

    /// Reports whether a directory had no surviving children after
    /// exclusion. Always `false` for files.
    #[must_use]
    pub const fn is_empty_dir(&self) -> bool {
        self.is_empty_dir
    }
}
