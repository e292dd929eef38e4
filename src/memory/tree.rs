//! Arena of nodes backing [`MemoryFs`](super::MemoryFs).

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::path::{segments, split_parent};
use crate::{FileType, FsError, Metadata, Permissions};

/// Stable node identifier. Ids are never reused.
pub(super) type NodeId = u64;

/// The root directory always has this id.
pub(super) const ROOT: NodeId = 0;

/// Per-node data shared with open handles.
#[derive(Debug)]
pub(super) struct Entry {
    pub(super) name: String,
    pub(super) kind: FileType,
    pub(super) content: Vec<u8>,
    pub(super) permissions: Permissions,
    pub(super) modified: SystemTime,
    pub(super) accessed: SystemTime,
}

impl Entry {
    pub(super) fn file(name: String, permissions: Permissions) -> Self {
        Self::new(name, FileType::File, permissions)
    }

    pub(super) fn dir(name: String, permissions: Permissions) -> Self {
        Self::new(name, FileType::Directory, permissions)
    }

    fn new(name: String, kind: FileType, permissions: Permissions) -> Self {
        let now = SystemTime::now();
        Self {
            name,
            kind,
            content: Vec::new(),
            permissions,
            modified: now,
            accessed: now,
        }
    }

    pub(super) fn is_dir(&self) -> bool {
        self.kind == FileType::Directory
    }

    pub(super) fn metadata(&self) -> Metadata {
        Metadata {
            name: self.name.clone(),
            file_type: self.kind,
            size: if self.is_dir() {
                0
            } else {
                self.content.len() as u64
            },
            permissions: self.permissions,
            modified: self.modified,
            accessed: self.accessed,
        }
    }

    /// Copy bytes starting at `offset` into `buf`.
    pub(super) fn read_at(&self, buf: &mut [u8], offset: u64) -> usize {
        let len = self.content.len() as u64;
        if offset >= len || buf.is_empty() {
            return 0;
        }
        let start = offset as usize;
        let n = buf.len().min(self.content.len() - start);
        buf[..n].copy_from_slice(&self.content[start..start + n]);
        n
    }

    /// Write `data` at `offset`, zero-filling any gap past the end.
    pub(super) fn write_at(&mut self, data: &[u8], offset: u64) -> Result<usize, FsError> {
        let end = usize::try_from(offset)
            .ok()
            .and_then(|start| start.checked_add(data.len()))
            .ok_or_else(|| FsError::InvalidInput {
                path: self.name.clone().into(),
                details: format!("offset {offset} too large"),
            })?;
        let start = end - data.len();
        if self.content.len() < end {
            self.grow(end, "write_at")?;
        }
        self.content[start..end].copy_from_slice(data);
        self.modified = SystemTime::now();
        Ok(data.len())
    }

    /// Shrink or zero-extend the content.
    pub(super) fn truncate(&mut self, size: u64) -> Result<(), FsError> {
        let size = usize::try_from(size).map_err(|_| FsError::InvalidInput {
            path: self.name.clone().into(),
            details: format!("size {size} too large"),
        })?;
        if size <= self.content.len() {
            self.content.truncate(size);
        } else {
            self.grow(size, "truncate")?;
        }
        self.modified = SystemTime::now();
        Ok(())
    }

    /// Zero-extend to `len` bytes, failing instead of aborting when the
    /// allocation cannot be made.
    fn grow(&mut self, len: usize, operation: &'static str) -> Result<(), FsError> {
        let extra = len.saturating_sub(self.content.len());
        self.content
            .try_reserve_exact(extra)
            .map_err(|e| FsError::Io {
                operation,
                path: self.name.clone().into(),
                source: io::Error::new(io::ErrorKind::FileTooLarge, e),
            })?;
        self.content.resize(len, 0);
        Ok(())
    }
}

#[derive(Debug)]
pub(super) struct Node {
    pub(super) entry: Arc<RwLock<Entry>>,
    /// `Some` for directories.
    pub(super) children: Option<BTreeMap<String, NodeId>>,
}

impl Node {
    pub(super) fn is_dir(&self) -> bool {
        self.children.is_some()
    }

    pub(super) fn is_empty_dir(&self) -> bool {
        self.children.as_ref().is_some_and(BTreeMap::is_empty)
    }
}

/// The tree shape. Guarded by one coarse lock in `MemoryFs`; lock it before
/// any entry lock.
#[derive(Debug)]
pub(super) struct Tree {
    nodes: HashMap<NodeId, Node>,
    next_id: NodeId,
}

impl Tree {
    pub(super) fn new() -> Self {
        let root = Node {
            entry: Arc::new(RwLock::new(Entry::dir(
                "/".to_string(),
                Permissions::default_dir(),
            ))),
            children: Some(BTreeMap::new()),
        };
        let mut nodes = HashMap::new();
        nodes.insert(ROOT, root);
        Self {
            nodes,
            next_id: ROOT + 1,
        }
    }

    pub(super) fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Walk from the root. A missing segment, or one that names a file
    /// before the end of the path, yields `None`.
    pub(super) fn lookup(&self, path: &Path) -> Option<NodeId> {
        let mut id = ROOT;
        for segment in segments(path) {
            let children = self.nodes.get(&id)?.children.as_ref()?;
            id = *children.get(&segment)?;
        }
        Some(id)
    }

    /// Like [`lookup`](Self::lookup) but returns the node's entry.
    pub(super) fn find(&self, path: &Path) -> Result<(NodeId, Arc<RwLock<Entry>>), FsError> {
        let not_found = || FsError::NotFound {
            path: path.to_path_buf(),
        };
        let id = self.lookup(path).ok_or_else(not_found)?;
        let node = self.get(id).ok_or_else(not_found)?;
        Ok((id, Arc::clone(&node.entry)))
    }

    /// Resolve the directory that holds `path`, plus the final name.
    pub(super) fn parent_dir(&self, path: &Path) -> Result<(NodeId, String), FsError> {
        let (parent, name) = split_parent(path).ok_or_else(|| FsError::InvalidInput {
            path: path.to_path_buf(),
            details: "the root has no parent".to_string(),
        })?;
        let not_found = || FsError::NotFound {
            path: parent.clone(),
        };
        let id = self.lookup(&parent).ok_or_else(not_found)?;
        match self.get(id) {
            Some(node) if node.is_dir() => Ok((id, name)),
            Some(_) => Err(FsError::NotADirectory {
                path: parent.clone(),
            }),
            None => Err(not_found()),
        }
    }

    /// Allocate a node and link it under `parent`.
    pub(super) fn insert(&mut self, parent: NodeId, entry: Entry) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        let name = entry.name.clone();
        let children = entry.is_dir().then(BTreeMap::new);
        self.nodes.insert(
            id,
            Node {
                entry: Arc::new(RwLock::new(entry)),
                children,
            },
        );
        self.attach(parent, name, id);
        id
    }

    /// Link an existing node under `parent` as `name`.
    pub(super) fn attach(&mut self, parent: NodeId, name: String, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            if let Some(children) = node.children.as_mut() {
                children.insert(name, id);
                node.entry.write().modified = SystemTime::now();
            }
        }
    }

    /// Unlink `name` from `parent`, keeping the node alive in the arena.
    pub(super) fn detach(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        let node = self.nodes.get_mut(&parent)?;
        let id = node.children.as_mut()?.remove(name)?;
        node.entry.write().modified = SystemTime::now();
        Some(id)
    }

    /// Drop a detached node and everything below it.
    ///
    /// Open handles keep their entry alive through its `Arc`.
    pub(super) fn drop_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                if let Some(children) = node.children {
                    pending.extend(children.into_values());
                }
            }
        }
    }

    /// Drop every child of a directory.
    pub(super) fn clear_children(&mut self, id: NodeId) {
        let children = match self.nodes.get_mut(&id).and_then(|n| n.children.as_mut()) {
            Some(children) => std::mem::take(children),
            None => return,
        };
        for child in children.into_values() {
            self.drop_subtree(child);
        }
    }

    /// Snapshot of a directory's children, sorted by name.
    pub(super) fn list(&self, id: NodeId) -> Option<Vec<Metadata>> {
        let children = self.get(id)?.children.as_ref()?;
        Some(
            children
                .values()
                .filter_map(|child| self.get(*child))
                .map(|child| child.entry.read().metadata())
                .collect(),
        )
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.nodes.len()
    }
}
