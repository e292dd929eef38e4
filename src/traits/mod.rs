//! # Filesystem Traits
//!
//! The capability contract every backend and wrapper satisfies.
//!
//! ```text
//! FsRead + FsWrite + FsDir = Fs
//!                      open/open_file ──▶ Box<dyn File>
//!                      as_lstater     ──▶ Option<&dyn Lstater>
//! ```
//!
//! | Trait | Role |
//! |-------|------|
//! | [`FsRead`] | open for reading, stat, capability queries |
//! | [`FsWrite`] | create/open with flags, remove, rename, metadata mutation |
//! | [`FsDir`] | directory creation |
//! | [`Fs`] | composite of the three, blanket-implemented |
//! | [`File`] | an open handle: std I/O plus positioned I/O and paged listings |
//! | [`Lstater`] | optional symlink-aware stat |
//!
//! ## Blanket Implementations
//!
//! Implement the three component traits and you get [`Fs`] for free. Shared
//! and borrowed filesystems forward too: `&T`, `Box<T>` and `Arc<T>` are
//! `Fs` whenever `T` is, so one base can back several wrappers.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`. Methods take `&self` to enable concurrent
//! access. Backends use interior mutability for thread-safe state management.
//!
//! ## Object Safety
//!
//! All traits are object-safe and can be used as trait objects:
//!
//! ```rust
//! use swapfs::{Fs, FsRead};
//!
//! fn process(fs: &dyn Fs) {
//!     let _ = fs.metadata(std::path::Path::new("/file.txt"));
//! }
//! ```

mod file;
mod fs_dir;
mod fs_read;
mod fs_write;
mod lstat;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::{FsError, Metadata, OpenFlags, Permissions};

pub(crate) use file::next_page;
pub use file::File;
pub use fs_dir::FsDir;
pub use fs_read::FsRead;
pub use fs_write::FsWrite;
pub use lstat::Lstater;

/// A complete swappable filesystem.
///
/// Combines reading ([`FsRead`]), writing ([`FsWrite`]) and directory
/// creation ([`FsDir`]).
///
/// # Blanket Implementation
///
/// Automatically implemented for any type that implements all three component traits.
/// You never need to implement `Fs` directly; just implement the components.
///
/// # Example
///
/// ```rust
/// use swapfs::{Fs, FsError, FsExt, MemoryFs, Permissions};
/// use std::path::Path;
///
/// // Generic function that works with any Fs implementation
/// fn backup_file<B: Fs + ?Sized>(fs: &B, src: &Path, dst: &Path) -> Result<(), FsError> {
///     let data = fs.read_file(src)?;
///     if let Some(parent) = dst.parent() {
///         fs.create_dir_all(parent, Permissions::default_dir())?;
///     }
///     fs.write_file(dst, &data, Permissions::default_file())
/// }
///
/// let fs = MemoryFs::new();
/// fs.write_file(Path::new("/a.txt"), b"data", Permissions::default_file()).unwrap();
/// backup_file(&fs, Path::new("/a.txt"), Path::new("/backup/a.txt")).unwrap();
/// assert_eq!(fs.read_file(Path::new("/backup/a.txt")).unwrap(), b"data");
/// ```
pub trait Fs: FsRead + FsWrite + FsDir {}

// Blanket implementation - any type implementing all three gets Fs for free
impl<T: FsRead + FsWrite + FsDir + ?Sized> Fs for T {}

macro_rules! forward_fs {
    ($($wrapper:ty),+ $(,)?) => {$(
        impl<T: FsRead + ?Sized> FsRead for $wrapper {
            fn name(&self) -> &'static str {
                (**self).name()
            }

            fn open(&self, path: &Path) -> Result<Box<dyn File>, FsError> {
                (**self).open(path)
            }

            fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
                (**self).metadata(path)
            }

            fn as_lstater(&self) -> Option<&dyn Lstater> {
                (**self).as_lstater()
            }

            fn resolve_path(&self, path: &Path) -> PathBuf {
                (**self).resolve_path(path)
            }
        }

        impl<T: FsWrite + ?Sized> FsWrite for $wrapper {
            fn create(&self, path: &Path) -> Result<Box<dyn File>, FsError> {
                (**self).create(path)
            }

            fn open_file(
                &self,
                path: &Path,
                flags: OpenFlags,
                perm: Permissions,
            ) -> Result<Box<dyn File>, FsError> {
                (**self).open_file(path, flags, perm)
            }

            fn remove(&self, path: &Path) -> Result<(), FsError> {
                (**self).remove(path)
            }

            fn remove_all(&self, path: &Path) -> Result<(), FsError> {
                (**self).remove_all(path)
            }

            fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
                (**self).rename(from, to)
            }

            fn set_permissions(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
                (**self).set_permissions(path, perm)
            }

            fn set_times(
                &self,
                path: &Path,
                accessed: SystemTime,
                modified: SystemTime,
            ) -> Result<(), FsError> {
                (**self).set_times(path, accessed, modified)
            }
        }

        impl<T: FsDir + ?Sized> FsDir for $wrapper {
            fn create_dir(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
                (**self).create_dir(path, perm)
            }

            fn create_dir_all(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
                (**self).create_dir_all(path, perm)
            }
        }
    )+};
}

forward_fs!(&T, Box<T>, Arc<T>);
