//! # Read-Only Wrapper

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::{
    File, FsDir, FsError, FsRead, FsWrite, Lstater, Metadata, OpenFlags, Permissions,
};

/// Rejects every mutation with [`FsError::ReadOnly`] and forwards reads.
///
/// The wrapped filesystem is never touched by a rejected call.
///
/// # Example
///
/// ```rust
/// use swapfs::{FsError, FsWrite, MemoryFs, ReadOnlyFs};
/// use std::path::Path;
///
/// let fs = ReadOnlyFs::new(MemoryFs::new());
/// let err = fs.create(Path::new("/a")).unwrap_err();
/// assert!(matches!(err, FsError::ReadOnly { operation: "create" }));
/// ```
#[derive(Debug, Clone)]
pub struct ReadOnlyFs<F> {
    source: F,
}

impl<F> ReadOnlyFs<F> {
    /// Wrap `source` read-only.
    pub fn new(source: F) -> Self {
        Self { source }
    }

    /// The wrapped filesystem.
    pub fn inner(&self) -> &F {
        &self.source
    }

    /// Consume the wrapper and return the wrapped filesystem.
    pub fn into_inner(self) -> F {
        self.source
    }
}

fn rejected(operation: &'static str, path: &Path) -> FsError {
    debug!(operation, path = %path.display(), "read_only: rejected");
    FsError::ReadOnly { operation }
}

impl<F: FsRead> FsRead for ReadOnlyFs<F> {
    fn name(&self) -> &'static str {
        "ReadOnlyFs"
    }

    fn open(&self, path: &Path) -> Result<Box<dyn File>, FsError> {
        self.source.open(path)
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        self.source.metadata(path)
    }

    fn as_lstater(&self) -> Option<&dyn Lstater> {
        Some(self)
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        self.source.resolve_path(path)
    }
}

impl<F: FsWrite> FsWrite for ReadOnlyFs<F> {
    fn create(&self, path: &Path) -> Result<Box<dyn File>, FsError> {
        Err(rejected("create", path))
    }

    fn open_file(
        &self,
        path: &Path,
        flags: OpenFlags,
        perm: Permissions,
    ) -> Result<Box<dyn File>, FsError> {
        if flags.has_write_intent() {
            return Err(rejected("open_file", path));
        }
        self.source.open_file(path, flags, perm)
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        Err(rejected("remove", path))
    }

    fn remove_all(&self, path: &Path) -> Result<(), FsError> {
        Err(rejected("remove_all", path))
    }

    fn rename(&self, from: &Path, _to: &Path) -> Result<(), FsError> {
        Err(rejected("rename", from))
    }

    fn set_permissions(&self, path: &Path, _perm: Permissions) -> Result<(), FsError> {
        Err(rejected("set_permissions", path))
    }

    fn set_times(
        &self,
        path: &Path,
        _accessed: SystemTime,
        _modified: SystemTime,
    ) -> Result<(), FsError> {
        Err(rejected("set_times", path))
    }
}

impl<F: FsDir> FsDir for ReadOnlyFs<F> {
    fn create_dir(&self, path: &Path, _perm: Permissions) -> Result<(), FsError> {
        Err(rejected("create_dir", path))
    }

    fn create_dir_all(&self, path: &Path, _perm: Permissions) -> Result<(), FsError> {
        Err(rejected("create_dir_all", path))
    }
}

impl<F: FsRead> Lstater for ReadOnlyFs<F> {
    fn lstat_if_possible(&self, path: &Path) -> Result<(Metadata, bool), FsError> {
        match self.source.as_lstater() {
            Some(lstater) => lstater.lstat_if_possible(path),
            None => Ok((self.source.metadata(path)?, false)),
        }
    }
}
