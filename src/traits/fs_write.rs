//! Write operations for swappable filesystems.

use std::path::Path;
use std::time::SystemTime;

use crate::{File, FsError, OpenFlags, Permissions};

/// Write operations for a filesystem.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access. Backends should use interior mutability (`RwLock`, `Mutex`)
/// for thread-safe state management.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsWrite`.
pub trait FsWrite: Send + Sync {
    /// Create a file for reading and writing, truncating it if it exists.
    ///
    /// Equivalent to [`open_file`](Self::open_file) with [`OpenFlags::CREATE`]
    /// and [`Permissions::default_file`].
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the parent directory does not exist
    /// - [`FsError::IsADirectory`] if the path is a directory
    fn create(&self, path: &Path) -> Result<Box<dyn File>, FsError> {
        self.open_file(path, OpenFlags::CREATE, Permissions::default_file())
    }

    /// Open a file with explicit flags.
    ///
    /// `perm` is applied when the call creates the file.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the file doesn't exist and `create` is false
    /// - [`FsError::AlreadyExists`] if `create` and `exclusive` are set and the file exists
    /// - [`FsError::IsADirectory`] if the path is a directory and the flags carry write intent
    fn open_file(
        &self,
        path: &Path,
        flags: OpenFlags,
        perm: Permissions,
    ) -> Result<Box<dyn File>, FsError>;

    /// Remove a file or an empty directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::DirectoryNotEmpty`] if the path is a non-empty directory
    fn remove(&self, path: &Path) -> Result<(), FsError>;

    /// Remove a path and everything below it.
    ///
    /// Succeeds without doing anything if the path does not exist.
    fn remove_all(&self, path: &Path) -> Result<(), FsError>;

    /// Rename/move a file or directory, replacing an existing destination file.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the source path does not exist
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Set permissions on a file or directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn set_permissions(&self, path: &Path, perm: Permissions) -> Result<(), FsError>;

    /// Set access and modification times.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn set_times(
        &self,
        path: &Path,
        accessed: SystemTime,
        modified: SystemTime,
    ) -> Result<(), FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_write_is_object_safe() {
        fn _check(_: &dyn FsWrite) {}
    }
}
