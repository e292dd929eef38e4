//! # Base-Path Wrapper
//!
//! [`BasePathFs`] confines every operation to one directory of another
//! filesystem. Callers see that directory as `/`; nothing they pass can
//! reach outside it.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::trace;

use crate::path::{clean, join_under};
use crate::{
    File, FsDir, FsError, FsRead, FsWrite, Lstater, Metadata, OpenFlags, Permissions,
};

/// Restricts a filesystem to the subtree under `root`.
///
/// Incoming paths are cleaned as rooted paths (so `..` stops at `/`) and
/// joined under the root. Errors and handle names report the caller's path,
/// never the hidden prefix.
///
/// # Example
///
/// ```rust
/// use swapfs::{BasePathFs, FsDir, FsExt, FsRead, MemoryFs, Permissions};
/// use std::path::Path;
///
/// let mem = MemoryFs::new();
/// mem.create_dir_all(Path::new("/work"), Permissions::default_dir()).unwrap();
///
/// let fs = BasePathFs::new(&mem, "/work");
/// fs.write_file(Path::new("/../../a.txt"), b"x", Permissions::default_file()).unwrap();
/// assert!(mem.exists(Path::new("/work/a.txt")).unwrap());
/// assert_eq!(fs.full_path(Path::new("/a.txt")), Path::new("/work/a.txt"));
/// ```
#[derive(Debug, Clone)]
pub struct BasePathFs<F> {
    source: F,
    root: PathBuf,
}

impl<F> BasePathFs<F> {
    /// Confine `source` to `root`.
    pub fn new(source: F, root: impl Into<PathBuf>) -> Self {
        Self {
            source,
            root: clean(&root.into()),
        }
    }

    /// The directory every path is resolved under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The wrapped filesystem.
    pub fn inner(&self) -> &F {
        &self.source
    }

    /// Consume the wrapper and return the wrapped filesystem.
    pub fn into_inner(self) -> F {
        self.source
    }

    fn real_path(&self, path: &Path) -> PathBuf {
        let real = join_under(&self.root, path);
        trace!(path = %path.display(), real = %real.display(), "base_path: resolve");
        real
    }

    /// Map a path under the root back to the caller's view of it.
    fn visible_path(&self, real: &Path) -> Option<PathBuf> {
        real.strip_prefix(&self.root)
            .ok()
            .map(|rest| Path::new("/").join(rest))
    }

    fn wrap(&self, inner: Box<dyn File>) -> Box<dyn File> {
        let name = match self.visible_path(Path::new(inner.name())) {
            Some(visible) => visible.to_string_lossy().into_owned(),
            None => inner.name().to_owned(),
        };
        Box::new(BasePathFile { inner, name })
    }
}

impl<F: FsRead> BasePathFs<F> {
    /// The path `path` resolves to in the innermost filesystem.
    ///
    /// Nested base paths compose component-wise, so an absolute inner root
    /// is nested under the outer one rather than replacing it.
    pub fn full_path(&self, path: &Path) -> PathBuf {
        self.resolve_path(path)
    }
}

impl<F: FsRead> FsRead for BasePathFs<F> {
    fn name(&self) -> &'static str {
        "BasePathFs"
    }

    fn open(&self, path: &Path) -> Result<Box<dyn File>, FsError> {
        self.source
            .open(&self.real_path(path))
            .map(|inner| self.wrap(inner))
            .map_err(|e| e.with_path(path))
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        self.source
            .metadata(&self.real_path(path))
            .map_err(|e| e.with_path(path))
    }

    fn as_lstater(&self) -> Option<&dyn Lstater> {
        Some(self)
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        self.source.resolve_path(&self.real_path(path))
    }
}

impl<F: FsWrite> FsWrite for BasePathFs<F> {
    fn open_file(
        &self,
        path: &Path,
        flags: OpenFlags,
        perm: Permissions,
    ) -> Result<Box<dyn File>, FsError> {
        self.source
            .open_file(&self.real_path(path), flags, perm)
            .map(|inner| self.wrap(inner))
            .map_err(|e| e.with_path(path))
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        self.source
            .remove(&self.real_path(path))
            .map_err(|e| e.with_path(path))
    }

    fn remove_all(&self, path: &Path) -> Result<(), FsError> {
        self.source
            .remove_all(&self.real_path(path))
            .map_err(|e| e.with_path(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.source
            .rename(&self.real_path(from), &self.real_path(to))
            .map_err(|e| {
                let shown = e
                    .path()
                    .and_then(|real| self.visible_path(real))
                    .unwrap_or_else(|| from.to_path_buf());
                e.with_path(&shown)
            })
    }

    fn set_permissions(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        self.source
            .set_permissions(&self.real_path(path), perm)
            .map_err(|e| e.with_path(path))
    }

    fn set_times(
        &self,
        path: &Path,
        accessed: SystemTime,
        modified: SystemTime,
    ) -> Result<(), FsError> {
        self.source
            .set_times(&self.real_path(path), accessed, modified)
            .map_err(|e| e.with_path(path))
    }
}

impl<F: FsDir> FsDir for BasePathFs<F> {
    fn create_dir(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        self.source
            .create_dir(&self.real_path(path), perm)
            .map_err(|e| e.with_path(path))
    }

    fn create_dir_all(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        self.source
            .create_dir_all(&self.real_path(path), perm)
            .map_err(|e| e.with_path(path))
    }
}

impl<F: FsRead> Lstater for BasePathFs<F> {
    fn lstat_if_possible(&self, path: &Path) -> Result<(Metadata, bool), FsError> {
        let real = self.real_path(path);
        let result = match self.source.as_lstater() {
            Some(lstater) => lstater.lstat_if_possible(&real),
            None => self.source.metadata(&real).map(|meta| (meta, false)),
        };
        result.map_err(|e| e.with_path(path))
    }
}

/// Handle returned by [`BasePathFs`], named relative to the base path.
pub struct BasePathFile {
    inner: Box<dyn File>,
    name: String,
}

impl BasePathFile {
    fn hide(&self, e: FsError) -> FsError {
        e.with_path(Path::new(&self.name))
    }

    fn hide_io(&self, e: io::Error) -> io::Error {
        self.hide(FsError::from_io("io", &self.name, e)).into()
    }
}

impl std::fmt::Debug for BasePathFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasePathFile")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Read for BasePathFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).map_err(|e| self.hide_io(e))
    }
}

impl Write for BasePathFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf).map_err(|e| self.hide_io(e))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().map_err(|e| self.hide_io(e))
    }
}

impl Seek for BasePathFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos).map_err(|e| self.hide_io(e))
    }
}

impl File for BasePathFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, FsError> {
        self.inner.read_at(buf, offset).map_err(|e| self.hide(e))
    }

    fn write_at(&self, data: &[u8], offset: u64) -> Result<usize, FsError> {
        self.inner.write_at(data, offset).map_err(|e| self.hide(e))
    }

    fn truncate(&self, size: u64) -> Result<(), FsError> {
        self.inner.truncate(size).map_err(|e| self.hide(e))
    }

    fn sync(&self) -> Result<(), FsError> {
        self.inner.sync().map_err(|e| self.hide(e))
    }

    fn metadata(&self) -> Result<Metadata, FsError> {
        self.inner.metadata().map_err(|e| self.hide(e))
    }

    fn close(&mut self) -> Result<(), FsError> {
        self.inner.close().map_err(|e| self.hide(e))
    }

    fn read_dir(&mut self, count: usize) -> Result<Vec<Metadata>, FsError> {
        self.inner.read_dir(count).map_err(|e| self.hide(e))
    }
}
