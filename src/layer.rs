//! # Layer Trait
//!
//! Tower-style composition of wrappers around filesystems.
//!
//! ## How It Works
//!
//! ```text
//! Backend ──▶ Layer::layer() ──▶ Wrapped Backend
//! ```
//!
//! Each wrapper provides:
//! 1. A wrapper struct that implements the filesystem traits
//! 2. A `Layer` implementation that creates the wrapper
//!
//! | Layer | Produces |
//! |-------|----------|
//! | [`BasePathLayer`] | [`BasePathFs`] |
//! | [`ReadOnlyLayer`] | [`ReadOnlyFs`] |
//! | [`CopyOnWriteLayer`] | [`CopyOnWriteFs`] with the layered filesystem as base |
//!
//! ## Fluent Composition
//!
//! Use [`LayerExt`] for fluent chaining:
//!
//! ```rust
//! use swapfs::{BasePathLayer, CopyOnWriteLayer, FsDir, FsExt, LayerExt, MemoryFs, Permissions, ReadOnlyLayer};
//! use std::path::Path;
//!
//! let disk = MemoryFs::new();
//! disk.create_dir_all(Path::new("/srv/site"), Permissions::default_dir()).unwrap();
//!
//! // A sandbox: read-only view of /srv/site with an in-memory scratch layer.
//! let fs = disk
//!     .layer(BasePathLayer::new("/srv/site"))
//!     .layer(ReadOnlyLayer)
//!     .layer(CopyOnWriteLayer::new(MemoryFs::new()));
//! fs.write_file(Path::new("/draft.txt"), b"scratch", Permissions::default_file()).unwrap();
//! ```

use std::path::PathBuf;

use crate::{BasePathFs, CopyOnWriteFs, Fs, ReadOnlyFs};

/// A layer that wraps a backend to add functionality.
///
/// Inspired by Tower's `Layer` trait, this enables composable wrappers.
/// Each wrapper provides a corresponding `Layer` implementation.
///
/// # Type Parameters
///
/// - `B`: The backend type being wrapped (must implement [`Fs`])
///
/// # Design Notes
///
/// - `layer(self, backend)` consumes both the layer and backend
/// - The resulting `Backend` type must also implement `Fs`
pub trait Layer<B> {
    /// The resulting backend type after applying this layer.
    type Backend;

    /// Wrap the given backend with this layer's functionality.
    ///
    /// Consumes both the layer configuration and the backend,
    /// returning a new wrapped backend.
    fn layer(self, backend: B) -> Self::Backend;
}

/// Extension trait for fluent layer composition.
///
/// Provides the `.layer()` method on any `Fs` backend for ergonomic chaining.
pub trait LayerExt: Fs + Sized {
    /// Apply a layer to this backend.
    ///
    /// Returns the wrapped backend with the layer's functionality added.
    fn layer<L: Layer<Self>>(self, layer: L) -> L::Backend {
        layer.layer(self)
    }
}

// Blanket implementation - any Fs backend gets LayerExt for free
impl<B: Fs> LayerExt for B {}

/// Confines the wrapped filesystem to a directory. Produces [`BasePathFs`].
#[derive(Debug, Clone)]
pub struct BasePathLayer {
    root: PathBuf,
}

impl BasePathLayer {
    /// Layer rooting everything at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl<B: Fs> Layer<B> for BasePathLayer {
    type Backend = BasePathFs<B>;

    fn layer(self, backend: B) -> Self::Backend {
        BasePathFs::new(backend, self.root)
    }
}

/// Makes the wrapped filesystem read-only. Produces [`ReadOnlyFs`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyLayer;

impl<B: Fs> Layer<B> for ReadOnlyLayer {
    type Backend = ReadOnlyFs<B>;

    fn layer(self, backend: B) -> Self::Backend {
        ReadOnlyFs::new(backend)
    }
}

/// Overlays a writable filesystem on the wrapped one, which becomes the
/// read-only base. Produces [`CopyOnWriteFs`].
#[derive(Debug, Clone)]
pub struct CopyOnWriteLayer<L> {
    layer: L,
}

impl<L: Fs> CopyOnWriteLayer<L> {
    /// Layer writing into `layer`.
    pub fn new(layer: L) -> Self {
        Self { layer }
    }
}

impl<B: Fs, L: Fs> Layer<B> for CopyOnWriteLayer<L> {
    type Backend = CopyOnWriteFs<B, L>;

    fn layer(self, backend: B) -> Self::Backend {
        CopyOnWriteFs::new(backend, self.layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FsError, FsExt, FsRead, FsWrite, MemoryFs, Permissions};
    use std::path::Path;

    #[test]
    fn layer_ext_is_auto_implemented() {
        // LayerExt is blanket-implemented for all Fs types
        fn _check<B: Fs + LayerExt>() {}
    }

    #[test]
    fn layers_compose_types() {
        let wrapped = MemoryFs::new()
            .layer(BasePathLayer::new("/"))
            .layer(ReadOnlyLayer);

        fn _takes_fs<T: Fs>(_: &T) {}
        _takes_fs(&wrapped);
        assert_eq!(wrapped.name(), "ReadOnlyFs");
    }

    #[test]
    fn read_only_under_copy_on_write_still_accepts_writes() {
        let disk = MemoryFs::new();
        disk.write_file(Path::new("/a"), b"disk", Permissions::default_file())
            .unwrap();
        let fs = (&disk)
            .layer(ReadOnlyLayer)
            .layer(CopyOnWriteLayer::new(MemoryFs::new()));

        fs.write_file(Path::new("/a"), b"overlay", Permissions::default_file())
            .unwrap();
        assert_eq!(fs.read_file(Path::new("/a")).unwrap(), b"overlay");
        assert_eq!(disk.read_file(Path::new("/a")).unwrap(), b"disk");

        let read_only = (&disk).layer(ReadOnlyLayer);
        assert!(matches!(
            read_only.remove(Path::new("/a")),
            Err(FsError::ReadOnly { .. })
        ));
    }
}
