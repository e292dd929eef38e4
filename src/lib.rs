//! # swapfs
//!
//! A **swappable filesystem abstraction**: write file logic once against one
//! set of traits, then pick an in-memory tree, the host OS, or a layered
//! combination of both when you construct it.
//!
//! ---
//!
//! ## Quick Start
//!
//! Most code only needs [`Fs`] plus the helpers in [`FsExt`].
//!
//! ```rust
//! use swapfs::{Fs, FsDir, FsError, FsExt, MemoryFs, Permissions};
//! use std::path::Path;
//!
//! // Generic function that works with any Fs implementation
//! fn archive(fs: &dyn Fs) -> Result<(), FsError> {
//!     let data = fs.read_file(Path::new("/input.txt"))?;
//!     fs.create_dir_all(Path::new("/archive/2024"), Permissions::default_dir())?;
//!     fs.write_file(Path::new("/archive/2024/input.txt"), &data, Permissions::default_file())?;
//!     for entry in fs.read_dir(Path::new("/"))? {
//!         println!("{}", entry.name);
//!     }
//!     Ok(())
//! }
//!
//! let fs = MemoryFs::new();
//! fs.write_file(Path::new("/input.txt"), b"hello", Permissions::default_file()).unwrap();
//! archive(&fs).unwrap();
//! ```
//!
//! ---
//!
//! ## Backends and Wrappers
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`MemoryFs`] | In-memory tree; fast, isolated, ideal for tests |
//! | [`OsFs`] | Host filesystem through `std::fs` |
//! | [`BasePathFs`] | Confines an inner filesystem to one directory |
//! | [`ReadOnlyFs`] | Rejects every mutation of an inner filesystem |
//! | [`CopyOnWriteFs`] | Writable layer over a read-only base, with whiteouts |
//!
//! Wrappers take any [`Fs`] (including `&T`, `Box<T>` and `Arc<T>`) and are
//! themselves [`Fs`], so they nest freely. [`LayerExt`] gives the same
//! composition in fluent form:
//!
//! ```rust
//! use swapfs::{CopyOnWriteLayer, FsExt, LayerExt, MemoryFs, OsFs, Permissions, ReadOnlyLayer};
//! use std::path::Path;
//!
//! // Reads come from disk, writes stay in memory.
//! let fs = OsFs::new()
//!     .layer(ReadOnlyLayer)
//!     .layer(CopyOnWriteLayer::new(MemoryFs::new()));
//! fs.write_file(Path::new("/scratch.txt"), b"never on disk", Permissions::default_file()).unwrap();
//! ```
//!
//! ---
//!
//! ## Trait Hierarchy
//!
//! ```text
//! FsRead + FsWrite + FsDir = Fs
//!                            ├─ open / open_file ──▶ Box<dyn File>
//!                            └─ as_lstater       ──▶ Option<&dyn Lstater>
//! ```
//!
//! [`Fs`] has a **blanket implementation**: implement the three component
//! traits and you get it for free. Every trait is object-safe.
//!
//! ---
//!
//! ## Error Handling
//!
//! All operations return `Result<T, FsError>`. Errors include context:
//!
//! ```rust
//! use swapfs::FsError;
//! use std::path::PathBuf;
//!
//! // Errors include the path that caused the problem
//! let err = FsError::NotFound { path: PathBuf::from("/missing.txt") };
//! assert_eq!(err.to_string(), "not found: /missing.txt");
//!
//! // Read-only rejections include the operation
//! let err = FsError::ReadOnly { operation: "remove" };
//! assert_eq!(err.to_string(), "read-only filesystem: remove");
//! ```
//!
//! ---
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`. Methods take `&self` (not `&mut self`),
//! enabling safe concurrent access. Backends use interior mutability internally.
//!
//! You can safely share a backend across threads using `Arc<B>` and spawn
//! concurrent operations without explicit locking at the call site.
//!
//! ---
//!
//! ## Logging
//!
//! Overlay decisions and read-only rejections are reported at `debug`,
//! memory-tree mutations and path resolution at `trace`, through
//! [`tracing`](https://docs.rs/tracing). No subscriber is installed.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`Metadata`], [`Permissions`], [`Event`], etc., plus `FsExtJson` |

// Private modules
mod base_path;
mod cow;
mod error;
mod ext;
mod layer;
mod memory;
mod notify;
mod os;
mod path;
mod read_only;
mod temp;
mod traits;
mod types;

// Public re-exports - error types
pub use error::FsError;

// Public re-exports - core types
pub use types::{FileType, Metadata, OpenFlags, Permissions};

// Public re-exports - traits
pub use traits::{File, Fs, FsDir, FsRead, FsWrite, Lstater};

// Public re-exports - backends
pub use memory::{MemoryFile, MemoryFs};
pub use os::{OsFile, OsFs};

// Public re-exports - wrappers
pub use base_path::{BasePathFile, BasePathFs};
pub use cow::{CopyOnWriteFs, UnionDir};
pub use read_only::ReadOnlyFs;

// Public re-exports - infrastructure
pub use ext::{FsExt, Walk};
pub use layer::{BasePathLayer, CopyOnWriteLayer, Layer, LayerExt, ReadOnlyLayer};
pub use notify::{Event, Op, Watcher};
pub use temp::TempNames;

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::FsExtJson;
