//! # Extension Traits
//!
//! Convenience methods for filesystem backends.
//!
//! ## Overview
//!
//! [`FsExt`] provides commonly-needed utility methods that aren't part of
//! the core trait hierarchy. These are implemented as default methods with
//! blanket implementations, so any `Fs` backend (including `dyn Fs`) gets
//! them for free.
//!
//! ## Available Methods
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`read_file`](FsExt::read_file) | Read a whole file |
//! | [`read_to_string`](FsExt::read_to_string) | Read a whole UTF-8 file |
//! | [`write_file`](FsExt::write_file) | Create or replace a file |
//! | [`read_dir`](FsExt::read_dir) | List a directory, sorted by name |
//! | [`lstat`](FsExt::lstat) | Symlink-aware stat where the backend supports it |
//! | [`walk`](FsExt::walk) | Depth-first lexical walk |
//! | [`exists`](FsExt::exists) / [`dir_exists`](FsExt::dir_exists) | Existence checks |
//! | [`is_dir`](FsExt::is_dir) / [`is_file`](FsExt::is_file) / [`is_empty`](FsExt::is_empty) | Kind and emptiness checks |
//! | [`write_reader`](FsExt::write_reader) / [`safe_write_reader`](FsExt::safe_write_reader) | Stream a reader into a file |
//! | [`file_contains_bytes`](FsExt::file_contains_bytes) / [`file_contains_any_bytes`](FsExt::file_contains_any_bytes) | Streaming content search |
//! | [`temp_file`](FsExt::temp_file) / [`temp_dir`](FsExt::temp_dir) | Uniquely named scratch entries |
//!
//! ## JSON Support (Feature-Gated)
//!
//! With the `serde` feature enabled, additional methods are available:
//!
//! | Method | Description |
//! |--------|-------------|
//! | `read_json` | Read and deserialize JSON file |
//! | `write_json` | Serialize and write JSON file |
//!
//! Enable with:
//! ```toml
//! [dependencies]
//! swapfs = { version = "0.1", features = ["serde"] }
//! ```

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::{File, Fs, FsError, Metadata, OpenFlags, Permissions, TempNames};

/// Attempts made by [`FsExt::temp_file`] and [`FsExt::temp_dir`] before
/// giving up.
const TEMP_ATTEMPTS: usize = 10_000;

/// Collisions tolerated before the name generator is reseeded.
const TEMP_RESEED_AFTER: usize = 10;

const SEARCH_CHUNK: usize = 8 * 1024;

/// What [`FsExt::walk`] should do after visiting an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Keep walking.
    Continue,
    /// On a directory: do not descend into it. On a file: skip the file's
    /// remaining siblings.
    SkipDir,
}

/// Extension methods for any filesystem backend.
///
/// Provides convenience methods not in the core traits but commonly needed.
/// All methods have default implementations, so backends get them automatically.
///
/// # Example
///
/// ```rust
/// use swapfs::{Fs, FsExt, FsError, MemoryFs, Permissions};
/// use std::path::Path;
///
/// fn check_paths(fs: &dyn Fs) -> Result<(), FsError> {
///     if fs.exists(Path::new("/config.json"))? {
///         println!("Config exists!");
///     }
///     if fs.dir_exists(Path::new("/data"))? {
///         println!("Data directory exists!");
///     }
///     Ok(())
/// }
///
/// let fs = MemoryFs::new();
/// fs.write_file(Path::new("/config.json"), b"{}", Permissions::default_file()).unwrap();
/// check_paths(&fs).unwrap();
/// ```
pub trait FsExt: Fs {
    /// Read the whole file at `path`.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let mut file = self.open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| FsError::from_io("read", path, e))?;
        file.close()?;
        Ok(data)
    }

    /// Read the whole file at `path` as UTF-8.
    ///
    /// # Errors
    ///
    /// - `FsError::InvalidData` if the content is not valid UTF-8
    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        let data = self.read_file(path)?;
        String::from_utf8(data).map_err(|e| FsError::InvalidData {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
    }

    /// Create or truncate `path` and write `data` to it. `perm` applies when
    /// the file is created.
    fn write_file(&self, path: &Path, data: &[u8], perm: Permissions) -> Result<(), FsError> {
        let mut file = self.open_file(path, OpenFlags::WRITE, perm)?;
        file.write_all(data)
            .map_err(|e| FsError::from_io("write", path, e))?;
        file.close()
    }

    /// List the directory at `path`, sorted by name.
    ///
    /// # Errors
    ///
    /// - `FsError::InvalidOperation` (or a backend-specific error) if `path`
    ///   is not a directory
    fn read_dir(&self, path: &Path) -> Result<Vec<Metadata>, FsError> {
        let mut dir = self.open(path)?;
        let mut entries = dir.read_dir(0)?;
        dir.close()?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Stat `path` without following a final symlink when the backend can,
    /// otherwise plain [`metadata`](crate::FsRead::metadata).
    ///
    /// The flag is `true` when the symlink-aware call was used.
    fn lstat(&self, path: &Path) -> Result<(Metadata, bool), FsError> {
        match self.as_lstater() {
            Some(lstater) => lstater.lstat_if_possible(path),
            None => Ok((self.metadata(path)?, false)),
        }
    }

    /// Walk the tree rooted at `root` depth-first, visiting entries in
    /// lexical order, parents before children.
    ///
    /// Entries are stat'ed with [`lstat`](Self::lstat), so symlinks are
    /// reported rather than followed where the backend supports it. Errors
    /// from the filesystem or from `visit` stop the walk.
    ///
    /// # Example
    ///
    /// ```rust
    /// use swapfs::{FsDir, FsExt, MemoryFs, Permissions, Walk};
    /// use std::path::Path;
    ///
    /// let fs = MemoryFs::new();
    /// fs.create_dir_all(Path::new("/a/b"), Permissions::default_dir()).unwrap();
    /// fs.write_file(Path::new("/a/b/c.txt"), b"c", Permissions::default_file()).unwrap();
    ///
    /// let mut seen = Vec::new();
    /// fs.walk(Path::new("/a"), |path, _meta| {
    ///     seen.push(path.to_path_buf());
    ///     Ok(Walk::Continue)
    /// })
    /// .unwrap();
    /// assert_eq!(seen.len(), 3);
    /// ```
    fn walk<F>(&self, root: &Path, mut visit: F) -> Result<(), FsError>
    where
        F: FnMut(&Path, &Metadata) -> Result<Walk, FsError>,
    {
        let (meta, _) = self.lstat(root)?;
        walk_entry(self, root, &meta, &mut visit)?;
        Ok(())
    }

    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> Result<bool, FsError> {
        match self.metadata(path) {
            Ok(_) => Ok(true),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether a directory exists at `path`.
    ///
    /// Returns `Ok(false)` if the path doesn't exist or is not a directory.
    fn dir_exists(&self, path: &Path) -> Result<bool, FsError> {
        match self.metadata(path) {
            Ok(m) => Ok(m.is_dir()),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether `path` is a directory.
    ///
    /// # Errors
    ///
    /// - `FsError::NotFound` if `path` doesn't exist
    fn is_dir(&self, path: &Path) -> Result<bool, FsError> {
        Ok(self.metadata(path)?.is_dir())
    }

    /// Whether `path` is a regular file.
    ///
    /// # Errors
    ///
    /// - `FsError::NotFound` if `path` doesn't exist
    fn is_file(&self, path: &Path) -> Result<bool, FsError> {
        Ok(self.metadata(path)?.is_file())
    }

    /// Whether `path` is an empty file or a directory with no entries.
    ///
    /// # Errors
    ///
    /// - `FsError::NotFound` if `path` doesn't exist
    fn is_empty(&self, path: &Path) -> Result<bool, FsError> {
        let meta = self.metadata(path)?;
        if meta.is_dir() {
            Ok(self.read_dir(path)?.is_empty())
        } else {
            Ok(meta.size == 0)
        }
    }

    /// Copy everything from `reader` into a new or truncated file at `path`,
    /// creating missing parent directories.
    fn write_reader(&self, path: &Path, reader: &mut dyn Read) -> Result<(), FsError> {
        create_parent(self, path)?;
        let file = self.create(path)?;
        copy_into(file, path, reader)
    }

    /// Like [`write_reader`](Self::write_reader) but never replaces an
    /// existing file.
    ///
    /// # Errors
    ///
    /// - `FsError::AlreadyExists` if `path` exists
    fn safe_write_reader(&self, path: &Path, reader: &mut dyn Read) -> Result<(), FsError> {
        create_parent(self, path)?;
        let file = self.open_file(path, OpenFlags::CREATE_NEW, Permissions::default_file())?;
        copy_into(file, path, reader)
    }

    /// Whether the file at `path` contains `needle`.
    ///
    /// The file is scanned in chunks; matches spanning chunk boundaries are
    /// found. An empty needle never matches.
    fn file_contains_bytes(&self, path: &Path, needle: &[u8]) -> Result<bool, FsError> {
        self.file_contains_any_bytes(path, &[needle])
    }

    /// Whether the file at `path` contains any of `needles`.
    ///
    /// Empty needles never match.
    fn file_contains_any_bytes(&self, path: &Path, needles: &[&[u8]]) -> Result<bool, FsError> {
        let mut file = self.open(path)?;
        let found = reader_contains_any(&mut file, needles)
            .map_err(|e| FsError::from_io("read", path, e));
        file.close()?;
        found
    }

    /// Create a new file in `dir` named from `pattern` and open it for
    /// reading and writing.
    ///
    /// The random suffix from `names` replaces the last `*` in `pattern`, or
    /// is appended when there is none. An empty `dir` means
    /// [`std::env::temp_dir`]. Files are created with mode `0o600`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use swapfs::{File, FsDir, FsExt, MemoryFs, Permissions, TempNames};
    /// use std::path::Path;
    ///
    /// let fs = MemoryFs::new();
    /// fs.create_dir(Path::new("/tmp"), Permissions::default_dir()).unwrap();
    /// let mut names = TempNames::new();
    /// let file = fs.temp_file(Path::new("/tmp"), "upload-*.part", &mut names).unwrap();
    /// assert!(file.name().starts_with("/tmp/upload-"));
    /// assert!(file.name().ends_with(".part"));
    /// ```
    fn temp_file(
        &self,
        dir: &Path,
        pattern: &str,
        names: &mut TempNames,
    ) -> Result<Box<dyn File>, FsError> {
        temp_entry(dir, pattern, names, |path| {
            self.open_file(path, OpenFlags::CREATE_NEW, Permissions::from_mode(0o600))
        })
        .map(|(_, file)| file)
    }

    /// Create a new directory in `dir` named from `pattern` and return its
    /// path.
    ///
    /// Naming follows [`temp_file`](Self::temp_file). Directories are created
    /// with mode `0o700`.
    fn temp_dir(
        &self,
        dir: &Path,
        pattern: &str,
        names: &mut TempNames,
    ) -> Result<PathBuf, FsError> {
        temp_entry(dir, pattern, names, |path| {
            self.create_dir(path, Permissions::from_mode(0o700))
        })
        .map(|(path, ())| path)
    }

    /// A per-tool scratch directory under [`std::env::temp_dir`], created on
    /// this filesystem with mode `0o777` if missing.
    ///
    /// `sub_path` is stripped of everything except letters, digits, combining
    /// marks, separators and `. _ - % #` and spaces. An empty `sub_path`
    /// returns the system temp directory without creating anything. The
    /// returned path ends with a separator.
    ///
    /// # Example
    ///
    /// ```rust
    /// use swapfs::{FsExt, MemoryFs};
    ///
    /// let fs = MemoryFs::new();
    /// let dir = fs.get_temp_dir("build*cache").unwrap();
    /// assert!(dir.ends_with("buildcache"));
    /// assert!(fs.dir_exists(&dir).unwrap());
    /// ```
    fn get_temp_dir(&self, sub_path: &str) -> Result<PathBuf, FsError> {
        let mut dir = std::env::temp_dir();
        if !sub_path.is_empty() {
            dir.push(sanitize_name(sub_path));
            if !self.exists(&dir)? {
                self.create_dir_all(&dir, Permissions::from_mode(0o777))?;
            }
        }
        Ok(with_trailing_separator(dir))
    }
}

// Blanket implementation - any Fs backend gets FsExt for free
impl<B: Fs + ?Sized> FsExt for B {}

/// Visit `path`, then its children. A `SkipDir` return means the caller
/// should skip the rest of its listing.
fn walk_entry<B, F>(fs: &B, path: &Path, meta: &Metadata, visit: &mut F) -> Result<Walk, FsError>
where
    B: Fs + ?Sized,
    F: FnMut(&Path, &Metadata) -> Result<Walk, FsError>,
{
    let action = visit(path, meta)?;
    if !meta.is_dir() {
        return Ok(action);
    }
    if action == Walk::SkipDir {
        return Ok(Walk::Continue);
    }

    for child in fs.read_dir(path)? {
        let child_path = path.join(&child.name);
        let (child_meta, _) = fs.lstat(&child_path)?;
        if walk_entry(fs, &child_path, &child_meta, visit)? == Walk::SkipDir {
            break;
        }
    }
    Ok(Walk::Continue)
}

fn create_parent<B: Fs + ?Sized>(fs: &B, path: &Path) -> Result<(), FsError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs.create_dir_all(parent, Permissions::from_mode(0o777))
        }
        _ => Ok(()),
    }
}

fn copy_into(mut file: Box<dyn File>, path: &Path, reader: &mut dyn Read) -> Result<(), FsError> {
    io::copy(reader, &mut file).map_err(|e| FsError::from_io("write", path, e))?;
    file.close()
}

/// Scan `reader` for any of `needles`, keeping enough of the previous chunk
/// to catch matches that straddle a boundary.
fn reader_contains_any(reader: &mut dyn Read, needles: &[&[u8]]) -> io::Result<bool> {
    let needles: Vec<&[u8]> = needles.iter().copied().filter(|n| !n.is_empty()).collect();
    let Some(longest) = needles.iter().map(|n| n.len()).max() else {
        return Ok(false);
    };
    let keep = longest - 1;

    let mut window: Vec<u8> = Vec::with_capacity(keep + SEARCH_CHUNK);
    let mut chunk = vec![0u8; SEARCH_CHUNK];
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => return Ok(false),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        window.extend_from_slice(&chunk[..n]);
        if needles
            .iter()
            .any(|needle| window.windows(needle.len()).any(|w| w == *needle))
        {
            return Ok(true);
        }
        let drop = window.len().saturating_sub(keep);
        window.drain(..drop);
    }
}

/// Drop every character that is not safe in a directory name.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|&c| {
            c.is_alphanumeric()
                || is_combining_mark(c)
                || matches!(c, '.' | '/' | '\\' | '_' | '-' | '%' | ' ' | '#')
        })
        .collect()
}

/// The combining diacritical blocks.
fn is_combining_mark(c: char) -> bool {
    matches!(
        c,
        '\u{0300}'..='\u{036F}'
            | '\u{1AB0}'..='\u{1AFF}'
            | '\u{1DC0}'..='\u{1DFF}'
            | '\u{20D0}'..='\u{20FF}'
            | '\u{FE20}'..='\u{FE2F}'
    )
}

fn with_trailing_separator(path: PathBuf) -> PathBuf {
    let mut path = path.into_os_string();
    if !path.to_string_lossy().ends_with(std::path::is_separator) {
        path.push(std::path::MAIN_SEPARATOR_STR);
    }
    PathBuf::from(path)
}

/// Split a temp-name pattern at its last `*`.
fn split_pattern(pattern: &str) -> (&str, &str) {
    match pattern.rfind('*') {
        Some(pos) => (&pattern[..pos], &pattern[pos + 1..]),
        None => (pattern, ""),
    }
}

fn temp_entry<T>(
    dir: &Path,
    pattern: &str,
    names: &mut TempNames,
    mut make: impl FnMut(&Path) -> Result<T, FsError>,
) -> Result<(PathBuf, T), FsError> {
    let dir = if dir.as_os_str().is_empty() {
        std::env::temp_dir()
    } else {
        dir.to_path_buf()
    };
    let (prefix, suffix) = split_pattern(pattern);

    let mut conflicts = 0;
    let mut last = None;
    for _ in 0..TEMP_ATTEMPTS {
        let path = dir.join(format!("{prefix}{}{suffix}", names.next_suffix()));
        match make(&path) {
            Ok(made) => return Ok((path, made)),
            Err(e) if e.is_already_exists() => {
                conflicts += 1;
                if conflicts > TEMP_RESEED_AFTER {
                    names.reseed();
                }
                last = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last.unwrap_or_else(|| FsError::AlreadyExists {
        path: dir,
        operation: "create temp",
    }))
}

// =============================================================================
// JSON Support (Feature-Gated)
// =============================================================================

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use serde::{Serialize, de::DeserializeOwned};

    /// JSON serialization extension methods.
    ///
    /// Available when the `serde` feature is enabled.
    pub trait FsExtJson: Fs {
        /// Read a file and deserialize it as JSON.
        ///
        /// # Errors
        ///
        /// - `FsError::NotFound`: File doesn't exist
        /// - `FsError::InvalidData`: File isn't valid UTF-8
        /// - `FsError::Deserialization`: JSON parsing failed
        ///
        /// # Example
        ///
        /// ```rust
        /// use swapfs::{Fs, FsError};
        /// #[cfg(feature = "serde")]
        /// use swapfs::FsExtJson;
        /// use std::path::Path;
        ///
        /// #[cfg(feature = "serde")]
        /// fn load_config<B: Fs>(backend: &B) -> Result<serde_json::Value, FsError> {
        ///     backend.read_json(Path::new("/config.json"))
        /// }
        /// ```
        fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, FsError> {
            let data = self.read_to_string(path)?;
            serde_json::from_str(&data).map_err(|e| FsError::Deserialization(e.to_string()))
        }

        /// Serialize a value and write it as pretty-printed JSON.
        ///
        /// # Errors
        ///
        /// - `FsError::Serialization`: JSON serialization failed
        /// - Other `FsError` variants from the underlying write
        fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), FsError> {
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| FsError::Serialization(e.to_string()))?;
            self.write_file(path, json.as_bytes(), Permissions::default_file())
        }
    }

    // Blanket implementation
    impl<B: Fs + ?Sized> FsExtJson for B {}
}

#[cfg(feature = "serde")]
pub use json::FsExtJson;
