use chrono::{DateTime, Utc};
use fsview::{EntryKind, RelPath};
use serde::{Deserialize, Serialize};

/// One atomic filesystem operation of a plan.
///
/// The serialized tags and field names are stable; persisted action records
/// remain readable across versions. Absolute roots live on the per-source
/// record, so actions only carry relative paths.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Stream a file from the source into the target.
    Copy {
        /// Path relative to the source and target roots.
        relpath: RelPath,
        /// Size recorded at scan time, verified after the copy.
        size: u64,
        /// Modification time to apply to the target file.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mtime: Option<DateTime<Utc>>,
    },
    /// Hard-link an unchanged file from the prior backup into the target.
    Hardlink {
        /// Path relative to the compare and target roots.
        relpath: RelPath,
        /// Size recorded at scan time, counted as hardlinked bytes.
        size: u64,
        /// Modification time of the linked file.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mtime: Option<DateTime<Utc>>,
    },
    /// Remove a file or an empty directory from the target.
    Delete {
        /// Path relative to the target root.
        relpath: RelPath,
        /// Kind of the entry being removed.
        kind: EntryKind,
    },
    /// Create a directory that has no counterpart on the compare side.
    NewDir {
        /// Path relative to the target root.
        relpath: RelPath,
        /// Modification time restored after the contained files are in
        /// place.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mtime: Option<DateTime<Utc>>,
    },
    /// Create a directory that also exists on the compare side.
    ExistingDir {
        /// Path relative to the target root.
        relpath: RelPath,
        /// Modification time restored after the contained files are in
        /// place.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mtime: Option<DateTime<Utc>>,
    },
    /// Materialize a directory that has no surviving children.
    EmptyDir {
        /// Path relative to the target root.
        relpath: RelPath,
        /// Modification time to apply.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mtime: Option<DateTime<Utc>>,
    },
}

impl Action {
    /// Returns the relative path the action operates on.
    #[must_use]
    pub fn relpath(&self) -> &RelPath {
        match self {
            Self::Copy { relpath, .. }
            | Self::Hardlink { relpath, .. }
            | Self::Delete { relpath, .. }
            | Self::NewDir { relpath, .. }
            | Self::ExistingDir { relpath, .. }
            | Self::EmptyDir { relpath, .. } => relpath,
        }
    }

    /// Returns the payload size (0 for directory and delete actions).
    #[must_use]
    pub const fn size(&self) -> u64 {
        match self {
            Self::Copy { size, .. } | Self::Hardlink { size, .. } => *size,
            _ => 0,
        }
    }

    /// Returns the recorded modification time, when the action carries one.
    #[must_use]
    pub const fn mtime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Copy { mtime, .. }
            | Self::Hardlink { mtime, .. }
            | Self::NewDir { mtime, .. }
            | Self::ExistingDir { mtime, .. }
            | Self::EmptyDir { mtime, .. } => *mtime,
            Self::Delete { .. } => None,
        }
    }

    /// Reports whether the action creates or tracks a directory.
    #[must_use]
    pub const fn is_directory_action(&self) -> bool {
        matches!(
            self,
            Self::NewDir { .. } | Self::ExistingDir { .. } | Self::EmptyDir { .. }
        )
    }

    /// Returns the action's type tag.
    #[must_use]
    pub const fn tag(&self) -> ActionTag {
        match self {
            Self::Copy { .. } => ActionTag::Copy,
            Self::Hardlink { .. } => ActionTag::Hardlink,
            Self::Delete { .. } => ActionTag::Delete,
            Self::NewDir { .. } => ActionTag::NewDir,
            Self::ExistingDir { .. } => ActionTag::ExistingDir,
            Self::EmptyDir { .. } => ActionTag::EmptyDir,
        }
    }
}

/// Type tag of an [`Action`], used for report filtering.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTag {
    /// [`Action::Copy`].
    Copy,
    /// [`Action::Hardlink`].
    Hardlink,
    /// [`Action::Delete`].
    Delete,
    /// [`Action::NewDir`].
    NewDir,
    /// [`Action::ExistingDir`].
    ExistingDir,
    /// [`Action::EmptyDir`].
    EmptyDir,
}

impl ActionTag {
    /// Returns the serialized tag name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Hardlink => "hardlink",
            Self::Delete => "delete",
            Self::NewDir => "new_dir",
            Self::ExistingDir => "existing_dir",
            Self::EmptyDir => "empty_dir",
        }
    }
}
