//! Whiteout and opaque-marker naming.
//!
//! A whiteout `.wh.<name>` in the layer records that `<name>` was deleted
//! from the base. An opaque marker inside a layer directory hides every base
//! child of that directory.

use std::path::{Path, PathBuf};

pub(super) const WHITEOUT_PREFIX: &str = ".wh.";
pub(super) const OPAQUE_MARKER: &str = ".wh..wh..opq";

/// Whiteout marker path for `path` (`None` for a root).
pub(super) fn whiteout_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    Some(parent.join(format!("{WHITEOUT_PREFIX}{}", name.to_string_lossy())))
}

/// Opaque marker path inside `dir`.
pub(super) fn opaque_path(dir: &Path) -> PathBuf {
    dir.join(OPAQUE_MARKER)
}

/// Names reserved for markers; never visible through the overlay.
pub(super) fn is_marker_name(name: &str) -> bool {
    name.starts_with(WHITEOUT_PREFIX)
}

/// Whether the final component of `path` is a marker name.
pub(super) fn is_marker(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| is_marker_name(&name.to_string_lossy()))
}

/// The entry a whiteout name hides, if `name` is a whiteout.
pub(super) fn whited_out_name(name: &str) -> Option<&str> {
    if name == OPAQUE_MARKER {
        return None;
    }
    name.strip_prefix(WHITEOUT_PREFIX)
}
