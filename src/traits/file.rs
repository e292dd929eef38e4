//! Open file and directory handles.

use std::io::{Read, Seek, Write};

use crate::{FsError, Metadata};

/// An open file or directory.
///
/// Handles are exclusively owned by whoever opened them (`Box<dyn File>`).
/// The std [`Read`], [`Write`] and [`Seek`] impls share one cursor;
/// [`read_at`](Self::read_at) and [`write_at`](Self::write_at) leave it alone.
///
/// After [`close`](Self::close) every operation fails with
/// [`FsError::FileClosed`] (wrapped in an `io::Error` for the std traits).
///
/// # Example
///
/// ```rust
/// use swapfs::{File, FsError, FsWrite, MemoryFs};
/// use std::io::{Seek, SeekFrom, Read};
/// use std::path::Path;
///
/// # fn main() -> Result<(), FsError> {
/// let fs = MemoryFs::new();
/// let mut file = fs.create(Path::new("/hello.txt"))?;
/// file.write_string("hello, world\n")?;
///
/// let mut word = [0u8; 5];
/// file.read_at(&mut word, 7)?;
/// assert_eq!(&word, b"world");
///
/// file.seek(SeekFrom::Start(0))?;
/// let mut all = String::new();
/// file.read_to_string(&mut all)?;
/// assert_eq!(all, "hello, world\n");
/// file.close()?;
/// # Ok(())
/// # }
/// ```
pub trait File: Read + Write + Seek + Send {
    /// The name this handle was opened with.
    fn name(&self) -> &str;

    /// Read into `buf` starting at `offset` without moving the cursor.
    ///
    /// Returns the number of bytes read; `0` at or past the end.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, FsError>;

    /// Write `data` starting at `offset` without moving the cursor.
    ///
    /// Writing past the end zero-fills the gap.
    fn write_at(&self, data: &[u8], offset: u64) -> Result<usize, FsError>;

    /// Write a string at the cursor.
    fn write_string(&mut self, s: &str) -> Result<usize, FsError> {
        self.write_all(s.as_bytes())
            .map_err(|e| FsError::from_io("write", self.name().to_owned(), e))?;
        Ok(s.len())
    }

    /// Shrink or zero-extend the file to `size` bytes.
    fn truncate(&self, size: u64) -> Result<(), FsError>;

    /// Flush buffered content to the backing store.
    fn sync(&self) -> Result<(), FsError>;

    /// Metadata of the open entry.
    fn metadata(&self) -> Result<Metadata, FsError>;

    /// Release the handle.
    ///
    /// # Errors
    ///
    /// - [`FsError::FileClosed`] if the handle was already closed
    fn close(&mut self) -> Result<(), FsError>;

    /// Page through a directory listing.
    ///
    /// Returns up to `count` entries sorted by name, continuing where the
    /// previous call stopped. `count == 0` returns everything that remains.
    ///
    /// # Errors
    ///
    /// - [`FsError::EndOfDirectory`] if `count > 0` and the listing is exhausted
    /// - [`FsError::InvalidOperation`] if the handle is not a directory
    fn read_dir(&mut self, count: usize) -> Result<Vec<Metadata>, FsError>;

    /// Like [`read_dir`](Self::read_dir), returning names only.
    fn read_dir_names(&mut self, count: usize) -> Result<Vec<String>, FsError> {
        Ok(self
            .read_dir(count)?
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }
}

impl std::fmt::Debug for dyn File + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// Take the next page of a directory listing snapshot.
///
/// Shared by every handle that pages through a pre-sorted listing.
pub(crate) fn next_page(
    listing: &mut std::collections::VecDeque<Metadata>,
    count: usize,
    path: &str,
) -> Result<Vec<Metadata>, FsError> {
    if count == 0 {
        return Ok(listing.drain(..).collect());
    }
    if listing.is_empty() {
        return Err(FsError::EndOfDirectory { path: path.into() });
    }
    let take = count.min(listing.len());
    Ok(listing.drain(..take).collect())
}
