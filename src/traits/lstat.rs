//! Optional symlink-aware stat.

use std::path::Path;

use crate::{FsError, Metadata};

/// Stat without following symlinks, where the backend can.
///
/// Obtained through [`FsRead::as_lstater`](crate::FsRead::as_lstater).
/// The returned flag says whether an lstat really happened; backends without
/// symlinks report `false` and plain metadata.
pub trait Lstater: Send + Sync {
    /// Stat `path`, not following a final symlink if possible.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn lstat_if_possible(&self, path: &Path) -> Result<(Metadata, bool), FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lstater_is_object_safe() {
        fn _check(_: &dyn Lstater) {}
    }
}
