#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `fsview` abstracts the trees the backup engine reads from and writes to.
//! Scanning, comparison, and action execution all consume the
//! [`FilesystemView`] trait, so the engine never switches on the concrete
//! kind of a source. The crate ships the local implementation
//! ([`LocalView`]); read-only remote adapters (FTP, portable devices) live
//! outside the core and plug in through the same trait.
//!
//! # Design
//!
//! - [`RelPath`] is the normalized relative-path newtype shared by every
//!   layer above. Its ordering matches scan order, which is what makes the
//!   two-sided merge join in the diff cheap.
//! - [`FilesystemView`] exposes exactly the primitive set the engine needs:
//!   listing, stat, streaming open, single-level mkdir, hardlink, removal,
//!   mtime application, and a free-space probe.
//! - Views that cannot report modification times advertise it through
//!   [`FilesystemView::provides_mtime`] so the planner can refuse a
//!   timestamp-based comparison chain up front.
//!
//! # Errors
//!
//! All operations surface [`FsError`], which classifies the underlying
//! [`std::io::Error`] into the categories the engine's error policy reacts
//! to (missing entry, access denied, cross-device link, unsupported
//! operation, transient failure).

mod error;
mod local;
mod rel_path;

use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub use error::FsError;
pub use local::LocalView;
pub use rel_path::{RelPath, RelPathError};

/// Kind of a tree entry.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

impl EntryKind {
    /// Reports whether the kind is [`EntryKind::Directory`].
    #[must_use]
    pub const fn is_dir(self) -> bool {
        matches!(self, Self::Directory)
    }
}

/// One child of a listed directory.
#[derive(Clone, Debug)]
pub struct DirEntryInfo {
    /// Plain file name within the listed directory.
    pub name: OsString,
    /// Entry kind. Symlinks pointing at directories are reported as
    /// directories with [`Self::is_symlink`] set.
    pub kind: EntryKind,
    /// Byte size; 0 for directories.
    pub size: u64,
    /// Modification time, when the view can provide one.
    pub mtime: Option<SystemTime>,
    /// Whether the entry is a symbolic link or directory junction.
    pub is_symlink: bool,
}

/// Result of listing one directory.
///
/// Entry-level stat failures do not abort the listing; they are skipped and
/// counted in [`Self::errors`] so the scanner can fold them into its
/// scan-error budget.
#[derive(Debug, Default)]
pub struct DirListing {
    /// Surviving entries, sorted by name under the platform case rule.
    pub entries: Vec<DirEntryInfo>,
    /// Number of children that could not be inspected.
    pub errors: u64,
}

/// Metadata for a single entry.
#[derive(Clone, Copy, Debug)]
pub struct FileInfo {
    /// Entry kind.
    pub kind: EntryKind,
    /// Byte size; 0 for directories.
    pub size: u64,
    /// Modification time, when available.
    pub mtime: Option<SystemTime>,
}

/// Uniform read/write/stat/hardlink/delete primitives over a tree.
///
/// Implementations must be usable behind `&dyn FilesystemView`; the engine
/// holds at most one view per role (source, compare, target) and never
/// downcasts.
pub trait FilesystemView {
    /// Absolute root this view is anchored at, for diagnostics and
    /// hardlink-target construction.
    fn root(&self) -> &Path;

    /// Whether [`DirEntryInfo::mtime`] is populated by this view.
    ///
    /// Remote views without modification times must return `false`; the
    /// planner rejects a `moddate`-led comparison chain against them unless
    /// a content comparator follows.
    fn provides_mtime(&self) -> bool {
        true
    }

    /// Returns the absolute path of `relpath` inside this view.
    fn full_path(&self, relpath: &RelPath) -> PathBuf;

    /// Lists the children of `dir`, sorted by name.
    ///
    /// # Errors
    ///
    /// Fails with [`FsError`] when the directory itself cannot be read;
    /// per-child failures are absorbed into [`DirListing::errors`].
    fn list(&self, dir: &RelPath) -> Result<DirListing, FsError>;

    /// Returns metadata for `relpath` without following symlinks.
    ///
    /// # Errors
    ///
    /// Fails with [`FsError::NotFound`] for missing entries.
    fn stat(&self, relpath: &RelPath) -> Result<FileInfo, FsError>;

    /// Reports whether `relpath` exists.
    fn exists(&self, relpath: &RelPath) -> bool;

    /// Opens `relpath` for streaming reads.
    ///
    /// # Errors
    ///
    /// Fails with [`FsError`] when the file cannot be opened.
    fn open_read(&self, relpath: &RelPath) -> Result<Box<dyn Read + Send>, FsError>;

    /// Opens `relpath` for streaming writes, truncating an existing file.
    ///
    /// Parent directories are *not* created; the caller schedules directory
    /// actions ahead of file actions.
    ///
    /// # Errors
    ///
    /// Fails with [`FsError`] when the file cannot be created.
    fn open_write(&self, relpath: &RelPath) -> Result<Box<dyn Write + Send>, FsError>;

    /// Creates the directory `relpath` (single level; the parent must
    /// exist). Returns `true` when the directory was created, `false` when
    /// it already existed.
    ///
    /// # Errors
    ///
    /// Fails with [`FsError`] when creation fails for any other reason,
    /// including an existing non-directory entry at `relpath`.
    fn mkdir(&self, relpath: &RelPath) -> Result<bool, FsError>;

    /// Creates a hard link at `new_relpath` pointing at the absolute
    /// `link_target` (typically a file inside a prior backup instance).
    ///
    /// # Errors
    ///
    /// Fails with [`FsError::CrossDevice`] or [`FsError::Unsupported`] when
    /// the platform cannot link; callers degrade those to a copy.
    fn hardlink(&self, link_target: &Path, new_relpath: &RelPath) -> Result<(), FsError>;

    /// Removes a file or an empty directory.
    ///
    /// # Errors
    ///
    /// Fails with [`FsError`] when removal fails; removing a non-empty
    /// directory is an error.
    fn remove(&self, relpath: &RelPath, kind: EntryKind) -> Result<(), FsError>;

    /// Applies a modification time to `relpath`.
    ///
    /// # Errors
    ///
    /// Fails with [`FsError`] when the timestamp cannot be applied.
    fn set_mtime(&self, relpath: &RelPath, mtime: SystemTime) -> Result<(), FsError>;

    /// Returns the free space of the volume backing this view, when the
    /// platform exposes it.
    ///
    /// # Errors
    ///
    /// Fails with [`FsError`] when the probe itself errors; `Ok(None)`
    /// means the platform offers no probe.
    fn free_space(&self) -> Result<Option<u64>, FsError>;
}
