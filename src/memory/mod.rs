//! # In-Memory Backend
//!
//! [`MemoryFs`] keeps a whole directory tree in process memory. Nodes live
//! in an arena keyed by stable ids behind one coarse lock; each node's data
//! sits behind its own lock so open handles keep working after the node is
//! unlinked or renamed.

mod file;
mod tree;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use tracing::trace;

use crate::path::{normalize, require_utf8, segments};
use crate::{
    File, FsDir, FsError, FsRead, FsWrite, Lstater, Metadata, OpenFlags, Permissions,
};

pub use file::MemoryFile;
use tree::{Entry, ROOT, Tree};

/// A filesystem held entirely in memory.
///
/// Paths are normalized lexically: relative paths are treated as rooted and
/// `..` never climbs above `/`. Share one instance between threads with
/// `Arc<MemoryFs>`.
///
/// # Example
///
/// ```rust
/// use swapfs::{FsDir, FsExt, MemoryFs, Permissions};
/// use std::path::Path;
///
/// let fs = MemoryFs::new();
/// fs.create_dir_all(Path::new("/a/b"), Permissions::default_dir()).unwrap();
/// fs.write_file(Path::new("/a/b/c.txt"), b"hi", Permissions::default_file()).unwrap();
/// assert_eq!(fs.read_file(Path::new("a/./b/../b/c.txt")).unwrap(), b"hi");
/// ```
#[derive(Debug)]
pub struct MemoryFs {
    tree: Arc<RwLock<Tree>>,
}

impl MemoryFs {
    /// Create an empty filesystem holding only `/`.
    pub fn new() -> Self {
        Self {
            tree: Arc::new(RwLock::new(Tree::new())),
        }
    }

    fn handle(
        &self,
        path: PathBuf,
        id: tree::NodeId,
        entry: Arc<RwLock<Entry>>,
        flags: OpenFlags,
    ) -> Box<dyn File> {
        Box::new(MemoryFile::new(
            path.to_string_lossy().into_owned(),
            Arc::clone(&self.tree),
            id,
            entry,
            flags,
        ))
    }

    fn with_entry<T>(&self, path: &Path, f: impl FnOnce(&mut Entry) -> T) -> Result<T, FsError> {
        let path = checked(path)?;
        let tree = self.tree.read();
        let (_, entry) = tree.find(&path)?;
        let mut entry = entry.write();
        Ok(f(&mut entry))
    }
}

/// Names are keyed as strings, so non-UTF-8 paths are refused rather than
/// converted lossily.
fn checked(path: &Path) -> Result<PathBuf, FsError> {
    require_utf8(path)?;
    Ok(normalize(path))
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl FsRead for MemoryFs {
    fn name(&self) -> &'static str {
        "MemoryFs"
    }

    fn open(&self, path: &Path) -> Result<Box<dyn File>, FsError> {
        let path = checked(path)?;
        let (id, entry) = self.tree.read().find(&path)?;
        Ok(self.handle(path, id, entry, OpenFlags::READ))
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let path = checked(path)?;
        let tree = self.tree.read();
        let (_, entry) = tree.find(&path)?;
        let metadata = entry.read().metadata();
        Ok(metadata)
    }

    fn as_lstater(&self) -> Option<&dyn Lstater> {
        Some(self)
    }
}

impl FsWrite for MemoryFs {
    fn open_file(
        &self,
        path: &Path,
        flags: OpenFlags,
        perm: Permissions,
    ) -> Result<Box<dyn File>, FsError> {
        let path = checked(path)?;
        let (id, entry) = {
            let mut tree = self.tree.write();
            match tree.find(&path) {
                Ok(_) if flags.create && flags.exclusive => {
                    return Err(FsError::AlreadyExists {
                        path,
                        operation: "open",
                    });
                }
                Ok(found) => found,
                Err(FsError::NotFound { .. }) if flags.create => {
                    let (parent, name) = tree.parent_dir(&path)?;
                    trace!(path = %path.display(), "memory: create file");
                    let id = tree.insert(parent, Entry::file(name, perm));
                    tree.find(&path).map(|(_, entry)| (id, entry))?
                }
                Err(e) => return Err(e),
            }
        };

        {
            let mut entry = entry.write();
            if entry.is_dir() && flags.has_write_intent() {
                return Err(FsError::IsADirectory { path });
            }
            if flags.truncate && !entry.content.is_empty() {
                trace!(path = %path.display(), "memory: truncate on open");
                entry.content.clear();
                entry.modified = SystemTime::now();
            }
        }

        Ok(self.handle(path, id, entry, flags))
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        let path = checked(path)?;
        let mut tree = self.tree.write();
        let (parent, name) = tree.parent_dir(&path).map_err(|e| match e {
            FsError::InvalidInput { .. } => FsError::InvalidInput {
                path: path.clone(),
                details: "cannot remove the root".to_string(),
            },
            FsError::NotADirectory { .. } => FsError::NotFound { path: path.clone() },
            other => other.with_path(&path),
        })?;
        let id = tree.lookup(&path).ok_or_else(|| FsError::NotFound { path: path.clone() })?;
        if tree.get(id).is_some_and(|node| node.is_dir() && !node.is_empty_dir()) {
            return Err(FsError::DirectoryNotEmpty { path });
        }
        trace!(path = %path.display(), "memory: remove");
        if let Some(id) = tree.detach(parent, &name) {
            tree.drop_subtree(id);
        }
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> Result<(), FsError> {
        let path = checked(path)?;
        let mut tree = self.tree.write();
        if tree.lookup(&path).is_none() {
            return Ok(());
        }
        trace!(path = %path.display(), "memory: remove_all");
        match tree.parent_dir(&path) {
            Ok((parent, name)) => {
                if let Some(id) = tree.detach(parent, &name) {
                    tree.drop_subtree(id);
                }
            }
            // Only the root has no parent.
            Err(_) => tree.clear_children(ROOT),
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let from = checked(from)?;
        let to = checked(to)?;
        let from_segments = segments(&from);
        let to_segments = segments(&to);

        let mut tree = self.tree.write();
        let src = tree.lookup(&from).ok_or_else(|| FsError::NotFound { path: from.clone() })?;
        if from == to {
            return Ok(());
        }
        if from_segments.is_empty() || to_segments.is_empty() {
            return Err(FsError::InvalidInput {
                path: from,
                details: "cannot rename the root".to_string(),
            });
        }
        if to_segments.starts_with(&from_segments) {
            return Err(FsError::InvalidInput {
                path: to,
                details: format!("cannot move {} into itself", from.display()),
            });
        }

        let (from_parent, from_name) = tree.parent_dir(&from)?;
        let (to_parent, to_name) = tree.parent_dir(&to)?;
        let src_is_dir = tree.get(src).is_some_and(|node| node.is_dir());

        if let Some(dst) = tree.lookup(&to) {
            match tree.get(dst) {
                Some(node) if node.is_dir() && !src_is_dir => {
                    return Err(FsError::IsADirectory { path: to });
                }
                Some(node) if !node.is_dir() && src_is_dir => {
                    return Err(FsError::NotADirectory { path: to });
                }
                Some(node) if node.is_dir() && !node.is_empty_dir() => {
                    return Err(FsError::DirectoryNotEmpty { path: to });
                }
                _ => {}
            }
            if let Some(replaced) = tree.detach(to_parent, &to_name) {
                tree.drop_subtree(replaced);
            }
        }

        trace!(from = %from.display(), to = %to.display(), "memory: rename");
        if let Some(id) = tree.detach(from_parent, &from_name) {
            if let Some(node) = tree.get(id) {
                node.entry.write().name = to_name.clone();
            }
            tree.attach(to_parent, to_name, id);
        }
        Ok(())
    }

    fn set_permissions(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        self.with_entry(path, |entry| entry.permissions = perm)
    }

    fn set_times(
        &self,
        path: &Path,
        accessed: SystemTime,
        modified: SystemTime,
    ) -> Result<(), FsError> {
        self.with_entry(path, |entry| {
            entry.accessed = accessed;
            entry.modified = modified;
        })
    }
}

impl FsDir for MemoryFs {
    fn create_dir(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        let path = checked(path)?;
        let mut tree = self.tree.write();
        if tree.lookup(&path).is_some() {
            return Err(FsError::AlreadyExists {
                path,
                operation: "create_dir",
            });
        }
        let (parent, name) = tree.parent_dir(&path)?;
        trace!(path = %path.display(), "memory: create_dir");
        tree.insert(parent, Entry::dir(name, perm));
        Ok(())
    }

    fn create_dir_all(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        let path = checked(path)?;
        let mut current = PathBuf::from("/");
        let mut tree = self.tree.write();
        let mut id = ROOT;
        for segment in segments(&path) {
            current.push(&segment);
            let existing = tree
                .get(id)
                .and_then(|node| node.children.as_ref())
                .and_then(|children| children.get(&segment).copied());
            id = match existing {
                Some(child) if tree.get(child).is_some_and(|node| node.is_dir()) => child,
                Some(_) => return Err(FsError::NotADirectory { path: current }),
                None => {
                    trace!(path = %current.display(), "memory: create_dir");
                    tree.insert(id, Entry::dir(segment, perm))
                }
            };
        }
        Ok(())
    }
}

impl Lstater for MemoryFs {
    fn lstat_if_possible(&self, path: &Path) -> Result<(Metadata, bool), FsError> {
        Ok((self.metadata(path)?, false))
    }
}
