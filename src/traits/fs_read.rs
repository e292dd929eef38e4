//! Read operations for swappable filesystems.

use std::path::{Path, PathBuf};

use crate::{File, FsError, Lstater, Metadata};

/// Read operations for a filesystem.
///
/// All methods use `&self` (interior mutability). Backends manage their own synchronization.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access. Backends should use interior mutability (`RwLock`, `Mutex`)
/// for thread-safe state management.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsRead`.
pub trait FsRead: Send + Sync {
    /// Human-readable name of the backend or wrapper (e.g. `"MemoryFs"`).
    fn name(&self) -> &'static str;

    /// Open a file or directory for reading.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn open(&self, path: &Path) -> Result<Box<dyn File>, FsError>;

    /// Get metadata for a path (follows symlinks).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn metadata(&self, path: &Path) -> Result<Metadata, FsError>;

    /// Query the optional symlink-aware stat capability.
    ///
    /// Returns `None` unless this filesystem (or something it wraps) can
    /// stat without following symlinks. Callers that get `None` should fall
    /// back to [`metadata`](Self::metadata).
    fn as_lstater(&self) -> Option<&dyn Lstater> {
        None
    }

    /// The path an operation on `path` ends up using in the innermost backend.
    ///
    /// Identity for leaves; path-rewriting wrappers compose their mapping
    /// with the one of the filesystem they wrap.
    fn resolve_path(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }
}
