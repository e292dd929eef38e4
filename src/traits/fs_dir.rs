//! Directory operations for swappable filesystems.

use std::path::Path;

use crate::{FsError, Permissions};

/// Directory creation.
///
/// Listing goes through a handle: [`open`](crate::FsRead::open) the directory
/// and call [`File::read_dir`](crate::File::read_dir). Removal lives in
/// [`FsWrite`](crate::FsWrite) because it applies to files and directories alike.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsDir`.
pub trait FsDir: Send + Sync {
    /// Create a directory (parent must exist).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if parent directory does not exist
    /// - [`FsError::AlreadyExists`] if the path already exists
    fn create_dir(&self, path: &Path, perm: Permissions) -> Result<(), FsError>;

    /// Create a directory and all parent directories.
    ///
    /// This is idempotent - succeeds if the directory already exists.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotADirectory`] if a component of the path exists but is not a directory
    fn create_dir_all(&self, path: &Path, perm: Permissions) -> Result<(), FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_dir_is_object_safe() {
        fn _check(_: &dyn FsDir) {}
    }
}
