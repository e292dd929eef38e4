//! Error types shared by every backend and wrapper.

use std::io;
use std::path::{Path, PathBuf};

/// Filesystem error type with contextual variants.
///
/// Every backend and wrapper maps its failures onto these variants, so code
/// written against one backend can branch on the error kind and behave the
/// same against another. Uses `#[non_exhaustive]` for forward compatibility.
///
/// # Examples
///
/// ```rust
/// use swapfs::FsError;
/// use std::path::PathBuf;
///
/// let err = FsError::NotFound { path: PathBuf::from("/missing") };
/// assert!(err.is_not_found());
/// assert_eq!(err.to_string(), "not found: /missing");
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    // Path/File Errors
    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: PathBuf,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Expected a directory but found something else.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The path that is not a directory.
        path: PathBuf,
    },

    /// Expected a file but found a directory.
    #[error("is a directory: {path}")]
    IsADirectory {
        /// The path that is a directory.
        path: PathBuf,
    },

    /// Directory is not empty when it should be.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty {
        /// The path to the non-empty directory.
        path: PathBuf,
    },

    // Handle Errors
    /// Operation does not apply to this kind of handle.
    #[error("{operation}: invalid operation on {path}")]
    InvalidOperation {
        /// The handle's path.
        path: PathBuf,
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// The handle has already been closed.
    #[error("file already closed: {path}")]
    FileClosed {
        /// The handle's path.
        path: PathBuf,
    },

    /// A paged directory listing has delivered every entry.
    #[error("end of directory: {path}")]
    EndOfDirectory {
        /// The directory being listed.
        path: PathBuf,
    },

    /// Argument rejected (negative seek, directory moved into itself, ...).
    #[error("invalid input: {path} ({details})")]
    InvalidInput {
        /// The path involved.
        path: PathBuf,
        /// What was wrong with the input.
        details: String,
    },

    // Permission/Access Errors
    /// Permission denied for operation.
    #[error("{operation}: permission denied: {path}")]
    PermissionDenied {
        /// The path where permission was denied.
        path: PathBuf,
        /// The operation that was denied.
        operation: &'static str,
    },

    /// Filesystem is read-only.
    #[error("read-only filesystem: {operation}")]
    ReadOnly {
        /// The operation that was attempted.
        operation: &'static str,
    },

    // Data Errors
    /// Invalid data encountered (e.g. a file that is not UTF-8).
    #[error("invalid data: {path} ({details})")]
    InvalidData {
        /// The path with invalid data.
        path: PathBuf,
        /// Details about the invalid data.
        details: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    // Notification Errors
    /// A watcher dropped events because its queue was full.
    #[error("event queue overflow")]
    EventOverflow,

    // Backend Errors
    /// Unclassified I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Classify an [`io::Error`] with operation and path context.
    ///
    /// Kinds with a dedicated variant are mapped onto it; anything else ends
    /// up in [`FsError::Io`] unchanged.
    /// An `io::Error` that already carries an `FsError` (as produced by the
    /// std trait impls on handles) yields that error back unchanged.
    pub fn from_io(operation: &'static str, path: impl Into<PathBuf>, error: io::Error) -> Self {
        let error = match unwrap_fs_error(error) {
            Ok(fs_error) => return fs_error,
            Err(error) => error,
        };
        let path = path.into();
        match error.kind() {
            io::ErrorKind::NotFound => FsError::NotFound { path },
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists { path, operation },
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied { path, operation },
            io::ErrorKind::NotADirectory => FsError::NotADirectory { path },
            io::ErrorKind::IsADirectory => FsError::IsADirectory { path },
            io::ErrorKind::DirectoryNotEmpty => FsError::DirectoryNotEmpty { path },
            io::ErrorKind::ReadOnlyFilesystem => FsError::ReadOnly { operation },
            io::ErrorKind::InvalidInput => FsError::InvalidInput {
                path,
                details: error.to_string(),
            },
            _ => FsError::Io {
                operation,
                path,
                source: error,
            },
        }
    }

    /// Returns `true` for the "does not exist" kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound { .. })
    }

    /// Returns `true` for the "already exists" kind.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, FsError::AlreadyExists { .. })
    }

    /// The path this error is about, if it carries one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            FsError::NotFound { path }
            | FsError::AlreadyExists { path, .. }
            | FsError::NotADirectory { path }
            | FsError::IsADirectory { path }
            | FsError::DirectoryNotEmpty { path }
            | FsError::InvalidOperation { path, .. }
            | FsError::FileClosed { path }
            | FsError::EndOfDirectory { path }
            | FsError::InvalidInput { path, .. }
            | FsError::InvalidData { path, .. }
            | FsError::PermissionDenied { path, .. }
            | FsError::Io { path, .. } => Some(path),
            FsError::ReadOnly { .. }
            | FsError::Serialization(_)
            | FsError::Deserialization(_)
            | FsError::EventOverflow => None,
        }
    }

    /// Replace the path carried by this error, if it carries one.
    ///
    /// Wrappers that rewrite paths use this so callers only ever see the
    /// path they asked for.
    pub fn with_path(mut self, new_path: &Path) -> Self {
        match &mut self {
            FsError::NotFound { path }
            | FsError::AlreadyExists { path, .. }
            | FsError::NotADirectory { path }
            | FsError::IsADirectory { path }
            | FsError::DirectoryNotEmpty { path }
            | FsError::InvalidOperation { path, .. }
            | FsError::FileClosed { path }
            | FsError::EndOfDirectory { path }
            | FsError::InvalidInput { path, .. }
            | FsError::InvalidData { path, .. }
            | FsError::PermissionDenied { path, .. }
            | FsError::Io { path, .. } => *path = new_path.to_path_buf(),
            FsError::ReadOnly { .. }
            | FsError::Serialization(_)
            | FsError::Deserialization(_)
            | FsError::EventOverflow => {}
        }
        self
    }
}

fn unwrap_fs_error(error: io::Error) -> Result<FsError, io::Error> {
    if !error.get_ref().is_some_and(|inner| inner.is::<FsError>()) {
        return Err(error);
    }
    let kind = error.kind();
    match error.into_inner().map(|inner| inner.downcast::<FsError>()) {
        Some(Ok(fs_error)) => Ok(*fs_error),
        Some(Err(inner)) => Err(io::Error::new(kind, inner)),
        None => Err(io::Error::from(kind)),
    }
}

impl From<io::Error> for FsError {
    fn from(error: io::Error) -> Self {
        FsError::from_io("io", PathBuf::new(), error)
    }
}

impl From<FsError> for io::Error {
    fn from(error: FsError) -> Self {
        let kind = match error {
            FsError::Io { source, .. } => return source,
            FsError::NotFound { .. } => io::ErrorKind::NotFound,
            FsError::AlreadyExists { .. } => io::ErrorKind::AlreadyExists,
            FsError::NotADirectory { .. } => io::ErrorKind::NotADirectory,
            FsError::IsADirectory { .. } => io::ErrorKind::IsADirectory,
            FsError::DirectoryNotEmpty { .. } => io::ErrorKind::DirectoryNotEmpty,
            FsError::PermissionDenied { .. } => io::ErrorKind::PermissionDenied,
            FsError::ReadOnly { .. } => io::ErrorKind::ReadOnlyFilesystem,
            FsError::InvalidInput { .. } => io::ErrorKind::InvalidInput,
            FsError::EndOfDirectory { .. } => io::ErrorKind::UnexpectedEof,
            FsError::InvalidData { .. }
            | FsError::Serialization(_)
            | FsError::Deserialization(_) => io::ErrorKind::InvalidData,
            FsError::InvalidOperation { .. }
            | FsError::FileClosed { .. }
            | FsError::EventOverflow => io::ErrorKind::Other,
        };
        io::Error::new(kind, error)
    }
}
