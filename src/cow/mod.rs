//! # Copy-On-Write Wrapper
//!
//! [`CopyOnWriteFs`] overlays a writable `layer` on a `base` that it never
//! modifies. Reads look in the layer first; writes always land in the layer,
//! copying base files up first when needed; deletions of base entries are
//! recorded as whiteout files in the layer.
//!
//! ```text
//! read   ──▶ layer ──(not found)──▶ base   (unless whited out)
//! write  ──▶ copy up from base ──▶ layer
//! remove ──▶ layer entry removed + `.wh.<name>` if base has it
//! ```

mod union_dir;
mod whiteout;

use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::debug;

use crate::path::clean;
use crate::{
    File, Fs, FsDir, FsError, FsRead, FsWrite, Lstater, Metadata, OpenFlags, Permissions,
};

pub use union_dir::UnionDir;
use whiteout::{is_marker, is_marker_name, opaque_path, whited_out_name, whiteout_path};

/// Overlay of a writable `layer` on a read-only `base`.
///
/// All persistent overlay state (copied entries, whiteouts, opaque markers)
/// lives in the layer; names beginning with `.wh.` are reserved for it and
/// never visible through the overlay. Share a base between overlays with
/// `Arc<B>`.
///
/// # Example
///
/// ```rust
/// use swapfs::{CopyOnWriteFs, FsExt, FsWrite, MemoryFs, Permissions};
/// use std::path::Path;
///
/// let base = MemoryFs::new();
/// base.write_file(Path::new("/conf"), b"base", Permissions::default_file()).unwrap();
///
/// let fs = CopyOnWriteFs::new(&base, MemoryFs::new());
/// fs.write_file(Path::new("/conf"), b"changed", Permissions::default_file()).unwrap();
/// fs.remove(Path::new("/conf")).unwrap();
///
/// assert!(!fs.exists(Path::new("/conf")).unwrap());
/// assert_eq!(base.read_file(Path::new("/conf")).unwrap(), b"base");
/// ```
#[derive(Debug)]
pub struct CopyOnWriteFs<B, L> {
    base: B,
    layer: L,
    copy_up: Mutex<()>,
}

impl<B, L> CopyOnWriteFs<B, L> {
    /// Overlay `layer` on `base`.
    pub fn new(base: B, layer: L) -> Self {
        Self {
            base,
            layer,
            copy_up: Mutex::new(()),
        }
    }

    /// The read-only base.
    pub fn base_fs(&self) -> &B {
        &self.base
    }

    /// The writable layer.
    pub fn layer_fs(&self) -> &L {
        &self.layer
    }
}

fn stat_opt<F: FsRead + ?Sized>(fs: &F, path: &Path) -> Result<Option<Metadata>, FsError> {
    match fs.metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(FsError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Parent directory, or `None` for a root (`/`, `.` or a bare name's `""`).
fn parent_of(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}

fn reserved(path: &Path) -> FsError {
    FsError::InvalidInput {
        path: path.to_path_buf(),
        details: "name is reserved for overlay markers".to_string(),
    }
}

impl<B: Fs, L: Fs> CopyOnWriteFs<B, L> {
    /// Whether base entries at `path` are hidden by a whiteout on it or an
    /// ancestor, or by an opaque ancestor directory in the layer.
    fn base_hidden(&self, path: &Path) -> Result<bool, FsError> {
        if is_marker(path) {
            return Ok(true);
        }
        for ancestor in path.ancestors() {
            if let Some(whiteout) = whiteout_path(ancestor) {
                if stat_opt(&self.layer, &whiteout)?.is_some() {
                    return Ok(true);
                }
            }
        }
        for ancestor in path.ancestors().skip(1) {
            if stat_opt(&self.layer, &opaque_path(ancestor))?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn layer_stat(&self, path: &Path) -> Result<Option<Metadata>, FsError> {
        if is_marker(path) {
            return Ok(None);
        }
        stat_opt(&self.layer, path)
    }

    fn base_stat(&self, path: &Path) -> Result<Option<Metadata>, FsError> {
        if self.base_hidden(path)? {
            return Ok(None);
        }
        stat_opt(&self.base, path)
    }

    fn union_stat(&self, path: &Path) -> Result<Option<Metadata>, FsError> {
        match self.layer_stat(path)? {
            Some(meta) => Ok(Some(meta)),
            None => self.base_stat(path),
        }
    }

    /// The merged, sorted listing of a directory.
    fn merged_listing(&self, path: &Path) -> Result<Vec<Metadata>, FsError> {
        let mut entries: BTreeMap<String, Metadata> = BTreeMap::new();
        let mut whiteouts: HashSet<String> = HashSet::new();
        let mut opaque = false;

        if self.layer_stat(path)?.is_some_and(|meta| meta.is_dir()) {
            for entry in self.layer.open(path)?.read_dir(0)? {
                if let Some(hidden) = whited_out_name(&entry.name) {
                    whiteouts.insert(hidden.to_string());
                } else if is_marker_name(&entry.name) {
                    opaque = true;
                } else {
                    entries.insert(entry.name.clone(), entry);
                }
            }
        }

        if !opaque && self.base_stat(path)?.is_some_and(|meta| meta.is_dir()) {
            for entry in self.base.open(path)?.read_dir(0)? {
                if is_marker_name(&entry.name) || whiteouts.contains(&entry.name) {
                    continue;
                }
                entries.entry(entry.name.clone()).or_insert(entry);
            }
        }

        Ok(entries.into_values().collect())
    }

    /// Make sure `dir` exists as a directory in the layer, re-creating it
    /// (and its parents) from the base with the base's permissions.
    fn ensure_layer_dir(&self, dir: &Path) -> Result<(), FsError> {
        if dir.as_os_str().is_empty() || dir.parent().is_none() {
            return Ok(());
        }
        if let Some(meta) = self.layer_stat(dir)? {
            return if meta.is_dir() {
                Ok(())
            } else {
                Err(FsError::NotADirectory {
                    path: dir.to_path_buf(),
                })
            };
        }
        match self.base_stat(dir)? {
            Some(meta) if meta.is_dir() => {
                if let Some(parent) = parent_of(dir) {
                    self.ensure_layer_dir(parent)?;
                }
                debug!(path = %dir.display(), "cow: recreate base directory in layer");
                self.layer.create_dir(dir, meta.permissions)?;
                self.layer.set_times(dir, meta.accessed, meta.modified)
            }
            Some(_) => Err(FsError::NotADirectory {
                path: dir.to_path_buf(),
            }),
            None => Err(FsError::NotFound {
                path: dir.to_path_buf(),
            }),
        }
    }

    fn ensure_layer_parent(&self, path: &Path) -> Result<(), FsError> {
        match parent_of(path) {
            Some(parent) => self.ensure_layer_dir(parent),
            None => Ok(()),
        }
    }

    /// Copy a base entry into the layer, keeping content, permissions and
    /// times. Directories are created empty.
    fn copy_up(&self, path: &Path) -> Result<(), FsError> {
        let _guard = self.copy_up.lock();
        // Another writer may have finished the copy while we waited.
        if self.layer_stat(path)?.is_some() {
            return Ok(());
        }
        let meta = self.base_stat(path)?.ok_or_else(|| FsError::NotFound {
            path: path.to_path_buf(),
        })?;
        self.ensure_layer_parent(path)?;

        debug!(path = %path.display(), dir = meta.is_dir(), "cow: copy up");
        if meta.is_dir() {
            self.layer.create_dir(path, meta.permissions)?;
        } else {
            let mut content = Vec::new();
            self.base
                .open(path)?
                .read_to_end(&mut content)
                .map_err(|e| FsError::from_io("copy_up", path, e))?;
            let mut target = self
                .layer
                .open_file(path, OpenFlags::WRITE, meta.permissions)?;
            target
                .write_all(&content)
                .map_err(|e| FsError::from_io("copy_up", path, e))?;
            target.close()?;
            self.layer.set_permissions(path, meta.permissions)?;
        }
        self.layer.set_times(path, meta.accessed, meta.modified)
    }

    /// Copy up `path` and, for directories, every visible entry below it.
    fn copy_up_tree(&self, path: &Path) -> Result<(), FsError> {
        self.copy_up(path)?;
        if self.layer_stat(path)?.is_some_and(|meta| meta.is_dir()) {
            for entry in self.merged_listing(path)? {
                self.copy_up_tree(&path.join(&entry.name))?;
            }
        }
        Ok(())
    }

    fn create_whiteout(&self, path: &Path) -> Result<(), FsError> {
        let Some(whiteout) = whiteout_path(path) else {
            return Ok(());
        };
        self.ensure_layer_parent(path)?;
        debug!(path = %path.display(), "cow: whiteout");
        self.layer
            .open_file(&whiteout, OpenFlags::CREATE, Permissions::default_file())?
            .close()
    }

    /// Remove the whiteout for `path`; returns whether there was one.
    fn remove_whiteout(&self, path: &Path) -> Result<bool, FsError> {
        let Some(whiteout) = whiteout_path(path) else {
            return Ok(false);
        };
        if stat_opt(&self.layer, &whiteout)?.is_none() {
            return Ok(false);
        }
        debug!(path = %path.display(), "cow: clear whiteout");
        self.layer.remove(&whiteout)?;
        Ok(true)
    }

    fn make_opaque(&self, dir: &Path) -> Result<(), FsError> {
        debug!(path = %dir.display(), "cow: opaque directory");
        self.layer
            .open_file(&opaque_path(dir), OpenFlags::CREATE, Permissions::default_file())?
            .close()
    }

    /// Whether the base has a directory at `path`, hidden or not.
    fn base_has_dir(&self, path: &Path) -> Result<bool, FsError> {
        Ok(stat_opt(&self.base, path)?.is_some_and(|meta| meta.is_dir()))
    }

    fn open_for_read(&self, path: &Path) -> Result<Box<dyn File>, FsError> {
        if let Some(meta) = self.layer_stat(path)? {
            let handle = self.layer.open(path)?;
            if !meta.is_dir() {
                return Ok(handle);
            }
            let listing = self.merged_listing(path)?;
            return Ok(Box::new(UnionDir::new(handle, listing)));
        }
        if self.base_hidden(path)? {
            return Err(FsError::NotFound {
                path: path.to_path_buf(),
            });
        }
        self.base.open(path)
    }
}

impl<B: Fs, L: Fs> FsRead for CopyOnWriteFs<B, L> {
    fn name(&self) -> &'static str {
        "CopyOnWriteFs"
    }

    fn open(&self, path: &Path) -> Result<Box<dyn File>, FsError> {
        self.open_for_read(&clean(path))
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let path = clean(path);
        self.union_stat(&path)?
            .ok_or(FsError::NotFound { path })
    }

    fn as_lstater(&self) -> Option<&dyn Lstater> {
        Some(self)
    }
}

impl<B: Fs, L: Fs> FsWrite for CopyOnWriteFs<B, L> {
    fn open_file(
        &self,
        path: &Path,
        flags: OpenFlags,
        perm: Permissions,
    ) -> Result<Box<dyn File>, FsError> {
        let path = clean(path);
        if !flags.has_write_intent() {
            return self.open_for_read(&path);
        }
        if is_marker(&path) {
            return Err(reserved(&path));
        }

        if self.layer_stat(&path)?.is_some() {
            return self.layer.open_file(&path, flags, perm);
        }

        match self.base_stat(&path)? {
            Some(meta) if meta.is_dir() => Err(FsError::IsADirectory { path }),
            Some(_) if flags.create && flags.exclusive => Err(FsError::AlreadyExists {
                path,
                operation: "open_file",
            }),
            Some(meta) => {
                if flags.truncate {
                    // Nothing to preserve but the mode.
                    self.ensure_layer_parent(&path)?;
                    let flags = OpenFlags {
                        create: true,
                        ..flags
                    };
                    self.layer.open_file(&path, flags, meta.permissions)
                } else {
                    self.copy_up(&path)?;
                    self.layer.open_file(&path, flags, perm)
                }
            }
            None if flags.create => {
                self.ensure_layer_parent(&path)?;
                // A whiteout over a base directory must stay so its children stay hidden.
                if !self.base_has_dir(&path)? {
                    self.remove_whiteout(&path)?;
                }
                self.layer.open_file(&path, flags, perm)
            }
            None => Err(FsError::NotFound { path }),
        }
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        let path = clean(path);
        let meta = self
            .union_stat(&path)?
            .ok_or_else(|| FsError::NotFound { path: path.clone() })?;
        if path.file_name().is_none() {
            return Err(FsError::InvalidInput {
                path,
                details: "cannot remove the root".to_string(),
            });
        }
        if meta.is_dir() && !self.merged_listing(&path)?.is_empty() {
            return Err(FsError::DirectoryNotEmpty { path });
        }

        match self.layer_stat(&path)? {
            // A layer directory may still hold markers.
            Some(layer_meta) if layer_meta.is_dir() => self.layer.remove_all(&path)?,
            Some(_) => self.layer.remove(&path)?,
            None => {}
        }
        if self.base_stat(&path)?.is_some() {
            self.create_whiteout(&path)?;
        }
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> Result<(), FsError> {
        let path = clean(path);
        if self.union_stat(&path)?.is_none() {
            return Ok(());
        }
        if path.file_name().is_none() {
            for entry in self.merged_listing(&path)? {
                self.remove_all(&path.join(&entry.name))?;
            }
            return Ok(());
        }
        if self.layer_stat(&path)?.is_some() {
            self.layer.remove_all(&path)?;
        }
        if self.base_stat(&path)?.is_some() {
            self.create_whiteout(&path)?;
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let from = clean(from);
        let to = clean(to);
        let src = self
            .union_stat(&from)?
            .ok_or_else(|| FsError::NotFound { path: from.clone() })?;
        if from == to {
            return Ok(());
        }
        if is_marker(&to) {
            return Err(reserved(&to));
        }
        if from.file_name().is_none() || to.file_name().is_none() {
            return Err(FsError::InvalidInput {
                path: from,
                details: "cannot rename the root".to_string(),
            });
        }
        if to.starts_with(&from) {
            return Err(FsError::InvalidInput {
                path: to,
                details: format!("cannot move {} into itself", from.display()),
            });
        }

        if let Some(dst) = self.union_stat(&to)? {
            if dst.is_dir() && !src.is_dir() {
                return Err(FsError::IsADirectory { path: to });
            }
            if !dst.is_dir() && src.is_dir() {
                return Err(FsError::NotADirectory { path: to });
            }
            if dst.is_dir() && !self.merged_listing(&to)?.is_empty() {
                return Err(FsError::DirectoryNotEmpty { path: to });
            }
            if self.layer_stat(&to)?.is_some() {
                self.layer.remove_all(&to)?;
            }
        }

        let from_in_base = self.base_stat(&from)?.is_some();
        let base_dir_at_to = self.base_has_dir(&to)?;
        self.copy_up_tree(&from)?;
        self.ensure_layer_parent(&to)?;
        if src.is_dir() || !base_dir_at_to {
            self.remove_whiteout(&to)?;
        }
        debug!(from = %from.display(), to = %to.display(), "cow: rename in layer");
        self.layer.rename(&from, &to)?;
        if src.is_dir() && base_dir_at_to {
            self.make_opaque(&to)?;
        }
        if from_in_base {
            self.create_whiteout(&from)?;
        }
        Ok(())
    }

    fn set_permissions(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        let path = clean(path);
        if self.layer_stat(&path)?.is_none() {
            self.copy_up(&path)?;
        }
        self.layer.set_permissions(&path, perm)
    }

    fn set_times(
        &self,
        path: &Path,
        accessed: SystemTime,
        modified: SystemTime,
    ) -> Result<(), FsError> {
        let path = clean(path);
        if self.layer_stat(&path)?.is_none() {
            self.copy_up(&path)?;
        }
        self.layer.set_times(&path, accessed, modified)
    }
}

impl<B: Fs, L: Fs> FsDir for CopyOnWriteFs<B, L> {
    fn create_dir(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        let path = clean(path);
        if is_marker(&path) {
            return Err(reserved(&path));
        }
        if self.union_stat(&path)?.is_some() {
            return Err(FsError::AlreadyExists {
                path,
                operation: "create_dir",
            });
        }
        self.ensure_layer_parent(&path)?;
        self.remove_whiteout(&path)?;
        self.layer.create_dir(&path, perm)?;
        if self.base_has_dir(&path)? {
            self.make_opaque(&path)?;
        }
        Ok(())
    }

    fn create_dir_all(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        let path = clean(path);
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            if current.file_name().is_none() {
                continue;
            }
            match self.union_stat(&current)? {
                Some(meta) if meta.is_dir() => {}
                Some(_) => return Err(FsError::NotADirectory { path: current }),
                None => self.create_dir(&current, perm)?,
            }
        }
        Ok(())
    }
}

impl<B: Fs, L: Fs> Lstater for CopyOnWriteFs<B, L> {
    fn lstat_if_possible(&self, path: &Path) -> Result<(Metadata, bool), FsError> {
        let path = clean(path);
        if is_marker(&path) {
            return Err(FsError::NotFound { path });
        }
        match self.layer.as_lstater() {
            Some(lstater) => match lstater.lstat_if_possible(&path) {
                Ok(found) => return Ok(found),
                Err(FsError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            },
            None => {
                if let Some(meta) = stat_opt(&self.layer, &path)? {
                    return Ok((meta, false));
                }
            }
        }
        if self.base_hidden(&path)? {
            return Err(FsError::NotFound { path });
        }
        match self.base.as_lstater() {
            Some(lstater) => lstater.lstat_if_possible(&path),
            None => Ok((self.base.metadata(&path)?, false)),
        }
    }
}
