//! Handles onto [`MemoryFs`](super::MemoryFs) entries.

use std::collections::VecDeque;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::RwLock;

use super::tree::{Entry, NodeId, Tree};
use crate::traits::next_page;
use crate::{File, FsError, Metadata, OpenFlags};

/// An open handle onto an in-memory file or directory.
///
/// The handle holds its entry directly, so content stays readable after the
/// entry is unlinked or renamed.
pub struct MemoryFile {
    name: String,
    tree: Arc<RwLock<Tree>>,
    id: NodeId,
    entry: Arc<RwLock<Entry>>,
    cursor: u64,
    flags: OpenFlags,
    closed: bool,
    listing: Option<VecDeque<Metadata>>,
}

impl MemoryFile {
    pub(super) fn new(
        name: String,
        tree: Arc<RwLock<Tree>>,
        id: NodeId,
        entry: Arc<RwLock<Entry>>,
        flags: OpenFlags,
    ) -> Self {
        Self {
            name,
            tree,
            id,
            entry,
            cursor: 0,
            flags,
            closed: false,
            listing: None,
        }
    }

    fn check_open(&self) -> Result<(), FsError> {
        if self.closed {
            return Err(FsError::FileClosed {
                path: self.name.clone().into(),
            });
        }
        Ok(())
    }

    fn check_readable(&self, entry: &Entry) -> Result<(), FsError> {
        self.check_open()?;
        if entry.is_dir() {
            return Err(FsError::IsADirectory {
                path: self.name.clone().into(),
            });
        }
        if !self.flags.readable() {
            return Err(FsError::PermissionDenied {
                path: self.name.clone().into(),
                operation: "read",
            });
        }
        Ok(())
    }

    fn check_writable(&self, entry: &Entry, operation: &'static str) -> Result<(), FsError> {
        self.check_open()?;
        if entry.is_dir() {
            return Err(FsError::IsADirectory {
                path: self.name.clone().into(),
            });
        }
        if !self.flags.writable() {
            return Err(FsError::PermissionDenied {
                path: self.name.clone().into(),
                operation,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFile")
            .field("name", &self.name)
            .field("cursor", &self.cursor)
            .field("flags", &self.flags)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let entry = self.entry.read();
        self.check_readable(&entry)?;
        let n = entry.read_at(buf, self.cursor);
        self.cursor += n as u64;
        Ok(n)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut entry = self.entry.write();
        self.check_writable(&entry, "write")?;
        if self.flags.append {
            self.cursor = entry.content.len() as u64;
        }
        let n = entry.write_at(buf, self.cursor)?;
        self.cursor += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_open()?;
        Ok(())
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.check_open()?;
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => i128::from(self.cursor) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.entry.read().content.len() as u64) + i128::from(delta),
        };
        let cursor = u64::try_from(target).map_err(|_| FsError::InvalidInput {
            path: self.name.clone().into(),
            details: format!("seek to negative offset {target}"),
        })?;
        self.cursor = cursor;
        Ok(cursor)
    }
}

impl File for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, FsError> {
        let entry = self.entry.read();
        self.check_readable(&entry)?;
        Ok(entry.read_at(buf, offset))
    }

    fn write_at(&self, data: &[u8], offset: u64) -> Result<usize, FsError> {
        let mut entry = self.entry.write();
        self.check_writable(&entry, "write_at")?;
        entry.write_at(data, offset)
    }

    fn truncate(&self, size: u64) -> Result<(), FsError> {
        let mut entry = self.entry.write();
        self.check_writable(&entry, "truncate")?;
        entry.truncate(size)
    }

    fn sync(&self) -> Result<(), FsError> {
        self.check_open()
    }

    fn metadata(&self) -> Result<Metadata, FsError> {
        self.check_open()?;
        Ok(self.entry.read().metadata())
    }

    fn close(&mut self) -> Result<(), FsError> {
        self.check_open()?;
        self.closed = true;
        self.listing = None;
        Ok(())
    }

    fn read_dir(&mut self, count: usize) -> Result<Vec<Metadata>, FsError> {
        self.check_open()?;
        if !self.entry.read().is_dir() {
            return Err(FsError::InvalidOperation {
                path: self.name.clone().into(),
                operation: "read_dir",
            });
        }
        if self.listing.is_none() {
            let listing = self.tree.read().list(self.id).ok_or_else(|| FsError::NotFound {
                path: self.name.clone().into(),
            })?;
            self.listing = Some(listing.into());
        }
        match self.listing.as_mut() {
            Some(listing) => next_page(listing, count, &self.name),
            None => Ok(Vec::new()),
        }
    }
}
