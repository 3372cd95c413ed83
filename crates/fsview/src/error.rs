use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error raised by [`crate::FilesystemView`] operations.
///
/// The variants mirror the failure classes the backup engine reacts to:
/// `NotFound` and `AccessDenied` feed the scan-error accounting,
/// `CrossDevice` and `Unsupported` trigger the hardlink-to-copy fallback,
/// and `Transient` marks conditions worth retrying at a higher level.
#[derive(Debug, Error)]
pub enum FsError {
    /// The entry does not exist.
    #[error("'{}' does not exist or cannot be accessed", path.display())]
    NotFound {
        /// Path that could not be found.
        path: PathBuf,
    },
    /// Permission was denied by the operating system.
    #[error("access denied to '{}'", path.display())]
    AccessDenied {
        /// Path the operation was denied on.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        #[source]
        source: io::Error,
    },
    /// A hard link target lies on a different device or volume.
    #[error("hard link for '{}' crosses devices", path.display())]
    CrossDevice {
        /// Path of the link that could not be created.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        #[source]
        source: io::Error,
    },
    /// The filesystem does not support the requested operation.
    #[error("operation not supported on '{}'", path.display())]
    Unsupported {
        /// Path the operation was attempted on.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        #[source]
        source: io::Error,
    },
    /// A transient condition (interrupted call, timeout) interrupted the
    /// operation.
    #[error("transient I/O failure on '{}': {source}", path.display())]
    Transient {
        /// Path the operation was attempted on.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        #[source]
        source: io::Error,
    },
    /// Any other I/O failure.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// Path the operation was attempted on.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Classifies an [`io::Error`] for `path`.
    #[must_use]
    pub fn classify(path: PathBuf, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::AccessDenied { path, source },
            io::ErrorKind::CrossesDevices => Self::CrossDevice { path, source },
            io::ErrorKind::Unsupported => Self::Unsupported { path, source },
            io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                Self::Transient { path, source }
            }
            _ => Self::Io { path, source },
        }
    }

    /// Returns the filesystem path tied to the failure.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path }
            | Self::AccessDenied { path, .. }
            | Self::CrossDevice { path, .. }
            | Self::Unsupported { path, .. }
            | Self::Transient { path, .. }
            | Self::Io { path, .. } => path,
        }
    }

    /// Reports whether the entry was missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Reports whether a hard link failed in a way that copying can repair.
    #[must_use]
    pub fn hardlink_degradable(&self) -> bool {
        matches!(self, Self::CrossDevice { .. } | Self::Unsupported { .. })
    }
}
