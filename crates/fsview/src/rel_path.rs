use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use thiserror::Error;

/// Error returned when a path cannot be used as a [`RelPath`].
#[derive(Debug, Error)]
pub enum RelPathError {
    /// The path is absolute or carries a drive/UNC prefix.
    #[error("'{}' is not a relative path", .0.display())]
    NotRelative(PathBuf),
    /// The path contains `.` or `..` components.
    #[error("'{}' contains '.' or '..' components", .0.display())]
    Unnormalized(PathBuf),
}

/// A normalized path relative to a scan or backup root.
///
/// Invariants: no leading separator, no `.`/`..` components. The empty path
/// denotes the root itself. Equality of relative paths across the source and
/// compare sides drives entry pairing, and the derived ordering compares
/// component-wise, so a directory always sorts immediately before its
/// contents (`sub` < `sub/file` < `sub2`).
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RelPath(PathBuf);

impl RelPath {
    /// Validates `path` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`RelPathError`] when the path is absolute or contains
    /// `.`/`..` components.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, RelPathError> {
        let path = path.as_ref();
        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {
                    return Err(RelPathError::Unnormalized(path.to_path_buf()));
                }
                Component::ParentDir => {
                    return Err(RelPathError::Unnormalized(path.to_path_buf()));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(RelPathError::NotRelative(path.to_path_buf()));
                }
            }
        }
        Ok(Self(normalized))
    }

    /// Returns the root path (the empty relative path).
    #[must_use]
    pub fn root() -> Self {
        Self(PathBuf::new())
    }

    /// Reports whether this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.as_os_str().is_empty()
    }

    /// Returns the wrapped path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Appends a single name component.
    ///
    /// `name` must be a plain file name; separators inside it would break
    /// the normalization invariant.
    #[must_use]
    pub fn join(&self, name: &OsStr) -> Self {
        debug_assert!(
            Path::new(name).components().count() <= 1,
            "join expects a single component"
        );
        let mut joined = self.0.clone();
        joined.push(name);
        Self(joined)
    }

    /// Returns the parent path, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            None
        } else {
            Some(Self(
                self.0.parent().map(Path::to_path_buf).unwrap_or_default(),
            ))
        }
    }

    /// Returns the final name component, or `None` for the root.
    #[must_use]
    pub fn file_name(&self) -> Option<&OsStr> {
        self.0.file_name()
    }

    /// Returns the number of components (0 for the root).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.components().count()
    }

    /// Reports whether `self` equals `ancestor` or lies below it.
    #[must_use]
    pub fn starts_with(&self, ancestor: &Self) -> bool {
        self.0.starts_with(&ancestor.0)
    }

    /// Renders the path with forward slashes, as used in serialized records.
    ///
    /// Non-UTF-8 components are rendered lossily; such paths round-trip
    /// through the action record only on platforms where they are valid
    /// Unicode.
    #[must_use]
    pub fn to_slash_string(&self) -> String {
        let mut rendered = String::new();
        for component in self.0.components() {
            if !rendered.is_empty() {
                rendered.push('/');
            }
            rendered.push_str(&component.as_os_str().to_string_lossy());
        }
        rendered
    }

    /// Parses a forward-slash rendering produced by [`Self::to_slash_string`].
    ///
    /// # Errors
    ///
    /// Returns [`RelPathError`] when the rendering violates the invariants.
    pub fn from_slash_str(rendered: &str) -> Result<Self, RelPathError> {
        let mut path = PathBuf::new();
        for part in rendered.split('/').filter(|part| !part.is_empty()) {
            path.push(part);
        }
        Self::new(path)
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str(".")
        } else {
            f.write_str(&self.to_slash_string())
        }
    }
}

impl Serialize for RelPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_slash_string())
    }
}

impl<'de> Deserialize<'de> for RelPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rendered = String::deserialize(deserializer)?;
        Self::from_slash_str(&rendered).map_err(de::Error::custom)
    }
}
