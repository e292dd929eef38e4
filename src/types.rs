//! Core types shared by every filesystem implementation.

use std::time::SystemTime;

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (only reported by symlink-aware stat).
    Symlink,
}

/// Metadata for a filesystem entry.
///
/// Returned by [`FsRead::metadata`](crate::FsRead::metadata), by
/// [`File::metadata`](crate::File::metadata) and, one per entry, by
/// [`File::read_dir`](crate::File::read_dir).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metadata {
    /// Final path component (`/` for the root).
    pub name: String,
    /// Type of the entry (file, directory, symlink).
    pub file_type: FileType,
    /// Size in bytes.
    pub size: u64,
    /// Permissions.
    pub permissions: Permissions,
    /// Last modification time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub modified: SystemTime,
    /// Last access time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub accessed: SystemTime,
}

impl Metadata {
    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// Returns `true` if this is a symbolic link.
    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.file_type == FileType::Symlink
    }

    /// Build metadata from what `std::fs` reports.
    pub(crate) fn from_std(name: String, meta: &std::fs::Metadata) -> Self {
        let file_type = if meta.file_type().is_symlink() {
            FileType::Symlink
        } else if meta.is_dir() {
            FileType::Directory
        } else {
            FileType::File
        };
        Self {
            name,
            file_type,
            size: meta.len(),
            permissions: Permissions::from_std(&meta.permissions()),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            accessed: meta.accessed().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            file_type: FileType::File,
            size: 0,
            permissions: Permissions::default_file(),
            modified: SystemTime::UNIX_EPOCH,
            accessed: SystemTime::UNIX_EPOCH,
        }
    }
}

/// Unix-style permissions stored as a mode bitmask.
///
/// Uses the standard Unix permission bits (rwxrwxrwx).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permissions(u32);

impl Permissions {
    /// Create permissions from a Unix mode (e.g., 0o755).
    #[inline]
    pub const fn from_mode(mode: u32) -> Self {
        Self(mode & 0o7777)
    }

    /// Get the raw mode value.
    #[inline]
    pub const fn mode(&self) -> u32 {
        self.0
    }

    /// Returns `true` if these permissions deny writing.
    #[inline]
    pub const fn readonly(&self) -> bool {
        // No write bit for user, group or other.
        (self.0 & 0o222) == 0
    }

    /// Default permissions for a new file (0o644 = rw-r--r--).
    #[inline]
    pub const fn default_file() -> Self {
        Self(0o644)
    }

    /// Default permissions for a new directory (0o755 = rwxr-xr-x).
    #[inline]
    pub const fn default_dir() -> Self {
        Self(0o755)
    }

    #[cfg(unix)]
    fn from_std(perm: &std::fs::Permissions) -> Self {
        use std::os::unix::fs::PermissionsExt;
        Self::from_mode(perm.mode())
    }

    #[cfg(not(unix))]
    fn from_std(perm: &std::fs::Permissions) -> Self {
        if perm.readonly() {
            Self(0o444)
        } else {
            Self(0o666)
        }
    }

    #[cfg(unix)]
    pub(crate) fn to_std(self) -> std::fs::Permissions {
        use std::os::unix::fs::PermissionsExt;
        std::fs::Permissions::from_mode(self.0)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::default_file()
    }
}

/// Flags for opening a file.
///
/// Any of `write`, `append`, `create`, `truncate` or `exclusive` counts as
/// write intent (see [`has_write_intent`](Self::has_write_intent)); a value
/// with none of them set opens for reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpenFlags {
    /// Open for reading.
    pub read: bool,
    /// Open for writing.
    pub write: bool,
    /// Create file if it doesn't exist.
    pub create: bool,
    /// Truncate file to zero length.
    pub truncate: bool,
    /// Append to end of file.
    pub append: bool,
    /// With `create`, fail if the file already exists.
    pub exclusive: bool,
}

impl OpenFlags {
    /// Read-only access.
    pub const READ: Self = Self {
        read: true,
        write: false,
        create: false,
        truncate: false,
        append: false,
        exclusive: false,
    };

    /// Write access with create and truncate.
    pub const WRITE: Self = Self {
        read: false,
        write: true,
        create: true,
        truncate: true,
        append: false,
        exclusive: false,
    };

    /// Read and write access.
    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
        create: false,
        truncate: false,
        append: false,
        exclusive: false,
    };

    /// Append mode - writes go to end of file.
    pub const APPEND: Self = Self {
        read: false,
        write: true,
        create: true,
        truncate: false,
        append: true,
        exclusive: false,
    };

    /// Read and write, creating or truncating (what `create` uses).
    pub const CREATE: Self = Self {
        read: true,
        write: true,
        create: true,
        truncate: true,
        append: false,
        exclusive: false,
    };

    /// Read and write, creating a file that must not exist yet.
    pub const CREATE_NEW: Self = Self {
        read: true,
        write: true,
        create: true,
        truncate: false,
        append: false,
        exclusive: true,
    };

    /// Returns `true` if opening with these flags may modify the filesystem.
    #[inline]
    pub const fn has_write_intent(&self) -> bool {
        self.write || self.append || self.create || self.truncate || self.exclusive
    }

    /// Returns `true` if a handle opened with these flags accepts writes.
    #[inline]
    pub(crate) const fn writable(&self) -> bool {
        self.write || self.append
    }

    /// Returns `true` if a handle opened with these flags accepts reads.
    #[inline]
    pub(crate) const fn readable(&self) -> bool {
        self.read || !self.writable()
    }
}

/// Serde support for SystemTime (when serde feature is enabled).
#[cfg(feature = "serde")]
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        (duration.as_secs(), duration.subsec_nanos()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (secs, nanos): (u64, u32) = Deserialize::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::new(secs, nanos))
    }
}
