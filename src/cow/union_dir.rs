//! Directory handle over a merged layer/base listing.

use std::collections::VecDeque;
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::traits::next_page;
use crate::{File, FsError, Metadata};

/// A directory opened through [`CopyOnWriteFs`](super::CopyOnWriteFs).
///
/// Wraps the layer's directory handle; the listing is the merged view taken
/// when the directory was opened, with markers and whited-out names removed.
pub struct UnionDir {
    inner: Box<dyn File>,
    listing: VecDeque<Metadata>,
    closed: bool,
}

impl UnionDir {
    pub(super) fn new(inner: Box<dyn File>, listing: Vec<Metadata>) -> Self {
        Self {
            inner,
            listing: listing.into(),
            closed: false,
        }
    }
}

impl std::fmt::Debug for UnionDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnionDir")
            .field("name", &self.inner.name())
            .field("remaining", &self.listing.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Read for UnionDir {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for UnionDir {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for UnionDir {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl File for UnionDir {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, FsError> {
        self.inner.read_at(buf, offset)
    }

    fn write_at(&self, data: &[u8], offset: u64) -> Result<usize, FsError> {
        self.inner.write_at(data, offset)
    }

    fn truncate(&self, size: u64) -> Result<(), FsError> {
        self.inner.truncate(size)
    }

    fn sync(&self) -> Result<(), FsError> {
        self.inner.sync()
    }

    fn metadata(&self) -> Result<Metadata, FsError> {
        self.inner.metadata()
    }

    fn close(&mut self) -> Result<(), FsError> {
        self.inner.close()?;
        self.closed = true;
        self.listing.clear();
        Ok(())
    }

    fn read_dir(&mut self, count: usize) -> Result<Vec<Metadata>, FsError> {
        if self.closed {
            return Err(FsError::FileClosed {
                path: self.inner.name().into(),
            });
        }
        next_page(&mut self.listing, count, self.inner.name())
    }
}
