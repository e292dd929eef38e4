//! Lexical path helpers shared by the backends and wrappers.
//!
//! Nothing here touches a filesystem: `.` and `..` are resolved purely on
//! the text of the path.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::FsError;

/// The normal components of a path, treating it as rooted.
///
/// `..` never climbs above the root and prefixes (`C:`) are dropped, so the
/// result always names something at or below `/`.
fn rooted_components(path: &Path) -> Vec<&OsStr> {
    let mut parts: Vec<&OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(name) => parts.push(name),
        }
    }
    parts
}

/// [`rooted_components`] as owned strings.
///
/// Non-UTF-8 names are converted lossily, so callers that key on the result
/// must reject such paths first (see [`require_utf8`]).
pub(crate) fn segments(path: &Path) -> Vec<String> {
    rooted_components(path)
        .into_iter()
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

/// Fail with `InvalidInput` unless `path` is valid UTF-8.
pub(crate) fn require_utf8(path: &Path) -> Result<(), FsError> {
    match path.to_str() {
        Some(_) => Ok(()),
        None => Err(FsError::InvalidInput {
            path: path.to_path_buf(),
            details: "path is not valid UTF-8".to_string(),
        }),
    }
}

/// Normalize a path to an absolute, rooted form (`/a/b`).
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::from("/");
    for part in rooted_components(path) {
        normalized.push(part);
    }
    normalized
}

/// Lexically clean a path, keeping it relative or absolute as given.
///
/// Mirrors the usual "clean" rules: repeated separators and `.` disappear,
/// `..` consumes the previous component, `..` at an absolute root is dropped
/// and leading `..` of a relative path is kept.
pub(crate) fn clean(path: &Path) -> PathBuf {
    let mut prefix = PathBuf::new();
    let mut rooted = false;
    let mut parts: Vec<&OsStr> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => prefix.push(p.as_os_str()),
            Component::RootDir => rooted = true,
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(component.as_os_str()),
            },
            Component::Normal(name) => parts.push(name),
        }
    }

    let mut cleaned = prefix;
    if rooted {
        cleaned.push(Component::RootDir.as_os_str());
    }
    for part in parts {
        cleaned.push(part);
    }
    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}

/// Join `path` underneath `root` without letting it escape.
///
/// `path` is normalized as a rooted path first, so an absolute `path` is
/// nested inside `root` rather than replacing it.
pub(crate) fn join_under(root: &Path, path: &Path) -> PathBuf {
    let mut joined = root.to_path_buf();
    for part in rooted_components(path) {
        joined.push(part);
    }
    joined
}

/// Split a normalized path into its parent and final name.
///
/// Returns `None` for the root.
pub(crate) fn split_parent(path: &Path) -> Option<(PathBuf, String)> {
    let mut segments = segments(path);
    let name = segments.pop()?;
    let mut parent = PathBuf::from("/");
    for segment in segments {
        parent.push(segment);
    }
    Some((parent, name))
}

/// The display name of a path's final component (`/` for the root).
pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
