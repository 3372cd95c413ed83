use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use filetime::FileTime;
use tracing::warn;

use crate::error::FsError;
use crate::rel_path::RelPath;
use crate::{DirEntryInfo, DirListing, EntryKind, FileInfo, FilesystemView};

/// Filesystem view over a locally mounted directory tree.
///
/// Symbolic links are never followed: a link pointing at a directory is
/// listed as a directory but the scanner will not descend into it, and
/// Windows directory junctions get the same treatment. Paths that meet the
/// platform's length threshold are transparently rewritten to the
/// extended-length form on Windows.
#[derive(Clone, Debug)]
pub struct LocalView {
    root: PathBuf,
}

impl LocalView {
    /// Creates a view rooted at `root`. The root is not required to exist
    /// yet; target views are rooted at directories the executor creates.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reports whether the root currently exists and is a directory.
    #[must_use]
    pub fn is_available(&self) -> bool {
        platform_path(self.root.clone()).is_dir()
    }

    fn os_path(&self, relpath: &RelPath) -> PathBuf {
        platform_path(self.root.join(relpath.as_path()))
    }
}

impl FilesystemView for LocalView {
    fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, relpath: &RelPath) -> PathBuf {
        self.root.join(relpath.as_path())
    }

    fn list(&self, dir: &RelPath) -> Result<DirListing, FsError> {
        let dir_path = self.os_path(dir);
        let read_dir =
            fs::read_dir(&dir_path).map_err(|error| FsError::classify(dir_path.clone(), error))?;

        let mut listing = DirListing::default();
        for entry in read_dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(dir = %dir_path.display(), %error, "failed to read directory entry");
                    listing.errors += 1;
                    continue;
                }
            };
            // DirEntry::metadata does not traverse symlinks
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(error) => {
                    warn!(path = %entry.path().display(), %error, "failed to inspect entry");
                    listing.errors += 1;
                    continue;
                }
            };

            let file_type = metadata.file_type();
            let (kind, size, mtime, is_symlink) = if file_type.is_symlink() {
                // resolve only far enough to learn the target kind
                match fs::metadata(entry.path()) {
                    Ok(target) if target.is_dir() => {
                        (EntryKind::Directory, 0, target.modified().ok(), true)
                    }
                    Ok(target) => (EntryKind::File, target.len(), target.modified().ok(), true),
                    Err(error) => {
                        warn!(path = %entry.path().display(), %error, "broken symlink skipped");
                        listing.errors += 1;
                        continue;
                    }
                }
            } else if file_type.is_dir() {
                (EntryKind::Directory, 0, metadata.modified().ok(), false)
            } else {
                (EntryKind::File, metadata.len(), metadata.modified().ok(), false)
            };

            listing.entries.push(DirEntryInfo {
                name: entry.file_name(),
                kind,
                size,
                mtime,
                is_symlink,
            });
        }

        listing.entries.sort_by(|a, b| compare_names(&a.name, &b.name));
        Ok(listing)
    }

    fn stat(&self, relpath: &RelPath) -> Result<FileInfo, FsError> {
        let path = self.os_path(relpath);
        let metadata =
            fs::symlink_metadata(&path).map_err(|error| FsError::classify(path, error))?;
        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Ok(FileInfo {
            kind,
            size: if kind.is_dir() { 0 } else { metadata.len() },
            mtime: metadata.modified().ok(),
        })
    }

    fn exists(&self, relpath: &RelPath) -> bool {
        fs::symlink_metadata(self.os_path(relpath)).is_ok()
    }

    fn open_read(&self, relpath: &RelPath) -> Result<Box<dyn Read + Send>, FsError> {
        let path = self.os_path(relpath);
        let file = fs::File::open(&path).map_err(|error| FsError::classify(path, error))?;
        Ok(Box::new(file))
    }

    fn open_write(&self, relpath: &RelPath) -> Result<Box<dyn Write + Send>, FsError> {
        let path = self.os_path(relpath);
        let file = fs::File::create(&path).map_err(|error| FsError::classify(path, error))?;
        Ok(Box::new(file))
    }

    fn mkdir(&self, relpath: &RelPath) -> Result<bool, FsError> {
        let path = self.os_path(relpath);
        match fs::create_dir(&path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists && path.is_dir() => {
                Ok(false)
            }
            Err(error) => Err(FsError::classify(path, error)),
        }
    }

    fn hardlink(&self, link_target: &Path, new_relpath: &RelPath) -> Result<(), FsError> {
        let path = self.os_path(new_relpath);
        fs::hard_link(platform_path(link_target.to_path_buf()), &path)
            .map_err(|error| FsError::classify(path, error))
    }

    fn remove(&self, relpath: &RelPath, kind: EntryKind) -> Result<(), FsError> {
        let path = self.os_path(relpath);
        let result = match kind {
            EntryKind::File => fs::remove_file(&path),
            EntryKind::Directory => fs::remove_dir(&path),
        };
        result.map_err(|error| FsError::classify(path, error))
    }

    fn set_mtime(&self, relpath: &RelPath, mtime: SystemTime) -> Result<(), FsError> {
        let path = self.os_path(relpath);
        filetime::set_file_mtime(&path, FileTime::from_system_time(mtime))
            .map_err(|error| FsError::classify(path, error))
    }

    #[cfg(unix)]
    fn free_space(&self) -> Result<Option<u64>, FsError> {
        let stat = rustix::fs::statvfs(&self.root)
            .map_err(|errno| FsError::classify(self.root.clone(), errno.into()))?;
        Ok(Some(stat.f_bavail.saturating_mul(stat.f_frsize)))
    }

    #[cfg(not(unix))]
    fn free_space(&self) -> Result<Option<u64>, FsError> {
        Ok(None)
    }
}

/// Compares child names under the platform case rule.
fn compare_names(a: &std::ffi::OsStr, b: &std::ffi::OsStr) -> std::cmp::Ordering {
    if cfg!(any(windows, target_os = "macos")) {
        let a = a.to_string_lossy().to_lowercase();
        let b = b.to_string_lossy().to_lowercase();
        a.cmp(&b)
    } else {
        a.cmp(b)
    }
}

/// Windows: rewrite paths at or beyond MAX_PATH to the extended-length form.
#[cfg(windows)]
fn platform_path(path: PathBuf) -> PathBuf {
    const MAX_PATH: usize = 260;
    let rendered = path.as_os_str();
    if rendered.len() >= MAX_PATH && !rendered.to_string_lossy().starts_with(r"\\?\") {
        PathBuf::from(format!(r"\\?\{}", path.display()))
    } else {
        path
    }
}

#[cfg(not(windows))]
fn platform_path(path: PathBuf) -> PathBuf {
    path
}
