//! # Host OS Backend
//!
//! [`OsFs`] forwards every operation to `std::fs`.

use std::collections::VecDeque;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::path::base_name;
use crate::traits::next_page;
use crate::{
    File, FsDir, FsError, FsRead, FsWrite, Lstater, Metadata, OpenFlags, Permissions,
};

/// The host operating system's filesystem.
///
/// Paths go to `std::fs` unchanged. Wrap it in
/// [`BasePathFs`](crate::BasePathFs) to confine it to one directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl OsFs {
    /// Create the OS backend.
    pub fn new() -> Self {
        Self
    }
}

fn open_options(flags: OpenFlags, perm: Permissions) -> fs::OpenOptions {
    let mut options = fs::OpenOptions::new();
    // create/truncate need write access on every platform; append implies it.
    let write = flags.write || ((flags.create || flags.truncate) && !flags.append);
    options
        .read(flags.readable() || !(write || flags.append))
        .write(write)
        .append(flags.append)
        .truncate(flags.truncate && !flags.append);
    if flags.create && flags.exclusive {
        options.create_new(true);
    } else {
        options.create(flags.create);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(perm.mode());
    }
    #[cfg(not(unix))]
    let _ = perm;
    options
}

impl FsRead for OsFs {
    fn name(&self) -> &'static str {
        "OsFs"
    }

    fn open(&self, path: &Path) -> Result<Box<dyn File>, FsError> {
        let file = fs::File::open(path).map_err(|e| FsError::from_io("open", path, e))?;
        Ok(Box::new(OsFile::new(file, path, OpenFlags::READ)))
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let meta = fs::metadata(path).map_err(|e| FsError::from_io("metadata", path, e))?;
        Ok(Metadata::from_std(base_name(path), &meta))
    }

    fn as_lstater(&self) -> Option<&dyn Lstater> {
        Some(self)
    }
}

impl FsWrite for OsFs {
    fn open_file(
        &self,
        path: &Path,
        flags: OpenFlags,
        perm: Permissions,
    ) -> Result<Box<dyn File>, FsError> {
        let file = open_options(flags, perm)
            .open(path)
            .map_err(|e| FsError::from_io("open_file", path, e))?;
        Ok(Box::new(OsFile::new(file, path, flags)))
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        let meta = fs::symlink_metadata(path).map_err(|e| FsError::from_io("remove", path, e))?;
        let result = if meta.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| FsError::from_io("remove", path, e))
    }

    fn remove_all(&self, path: &Path) -> Result<(), FsError> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FsError::from_io("remove_all", path, e)),
        };
        let result = if meta.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| FsError::from_io("remove_all", path, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        fs::rename(from, to).map_err(|e| {
            // The OS does not say which side failed.
            let blamed = match e.kind() {
                io::ErrorKind::NotFound if fs::symlink_metadata(from).is_ok() => to,
                io::ErrorKind::AlreadyExists
                | io::ErrorKind::IsADirectory
                | io::ErrorKind::DirectoryNotEmpty => to,
                _ => from,
            };
            FsError::from_io("rename", blamed, e)
        })
    }

    fn set_permissions(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        #[cfg(unix)]
        let permissions = perm.to_std();
        #[cfg(not(unix))]
        let permissions = {
            let mut permissions = fs::metadata(path)
                .map_err(|e| FsError::from_io("set_permissions", path, e))?
                .permissions();
            permissions.set_readonly(perm.readonly());
            permissions
        };
        fs::set_permissions(path, permissions)
            .map_err(|e| FsError::from_io("set_permissions", path, e))
    }

    fn set_times(
        &self,
        path: &Path,
        accessed: SystemTime,
        modified: SystemTime,
    ) -> Result<(), FsError> {
        let times = fs::FileTimes::new()
            .set_accessed(accessed)
            .set_modified(modified);
        let file = fs::File::options()
            .write(true)
            .open(path)
            .or_else(|_| fs::File::open(path))
            .map_err(|e| FsError::from_io("set_times", path, e))?;
        file.set_times(times)
            .map_err(|e| FsError::from_io("set_times", path, e))
    }
}

impl FsDir for OsFs {
    fn create_dir(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        dir_builder(perm, false)
            .create(path)
            .map_err(|e| FsError::from_io("create_dir", path, e))
    }

    fn create_dir_all(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        dir_builder(perm, true)
            .create(path)
            .map_err(|e| FsError::from_io("create_dir_all", path, e))
    }
}

fn dir_builder(perm: Permissions, recursive: bool) -> fs::DirBuilder {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(recursive);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(perm.mode());
    }
    #[cfg(not(unix))]
    let _ = perm;
    builder
}

impl Lstater for OsFs {
    fn lstat_if_possible(&self, path: &Path) -> Result<(Metadata, bool), FsError> {
        let meta = fs::symlink_metadata(path).map_err(|e| FsError::from_io("lstat", path, e))?;
        Ok((Metadata::from_std(base_name(path), &meta), true))
    }
}

/// An open handle onto a host file or directory.
///
/// Access is checked against the flags the handle was opened with, so a
/// read on a write-only handle fails with `PermissionDenied` rather than
/// whatever the platform reports.
#[derive(Debug)]
pub struct OsFile {
    file: Option<fs::File>,
    path: PathBuf,
    name: String,
    flags: OpenFlags,
    listing: Option<VecDeque<Metadata>>,
}

impl OsFile {
    fn new(file: fs::File, path: &Path, flags: OpenFlags) -> Self {
        Self {
            file: Some(file),
            path: path.to_path_buf(),
            name: path.to_string_lossy().into_owned(),
            flags,
            listing: None,
        }
    }

    fn readable(&self, operation: &'static str) -> Result<&fs::File, FsError> {
        let file = self.file()?;
        if !self.flags.readable() {
            return Err(FsError::PermissionDenied {
                path: self.path.clone(),
                operation,
            });
        }
        Ok(file)
    }

    fn writable(&self, operation: &'static str) -> Result<&fs::File, FsError> {
        let file = self.file()?;
        if !self.flags.writable() {
            return Err(FsError::PermissionDenied {
                path: self.path.clone(),
                operation,
            });
        }
        Ok(file)
    }

    fn io_context(&self, operation: &'static str) -> impl Fn(io::Error) -> io::Error + '_ {
        move |e| FsError::from_io(operation, &self.path, e).into()
    }

    fn file(&self) -> Result<&fs::File, FsError> {
        self.file.as_ref().ok_or_else(|| FsError::FileClosed {
            path: self.path.clone(),
        })
    }

    fn file_mut(&mut self) -> Result<&mut fs::File, FsError> {
        self.file.as_mut().ok_or_else(|| FsError::FileClosed {
            path: self.path.clone(),
        })
    }

    fn io_err(&self, operation: &'static str) -> impl Fn(io::Error) -> FsError + '_ {
        move |e| FsError::from_io(operation, &self.path, e)
    }

    fn list(&self) -> Result<VecDeque<Metadata>, FsError> {
        let entries = fs::read_dir(&self.path).map_err(self.io_err("read_dir"))?;
        let mut listing = Vec::new();
        for entry in entries {
            let entry = entry.map_err(self.io_err("read_dir"))?;
            let meta = entry.metadata().map_err(self.io_err("read_dir"))?;
            listing.push(Metadata::from_std(
                entry.file_name().to_string_lossy().into_owned(),
                &meta,
            ));
        }
        listing.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing.into())
    }
}

impl Read for OsFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = self.readable("read")?;
        file.read(buf).map_err(self.io_context("read"))
    }
}

impl Write for OsFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.writable("write")?;
        file.write(buf).map_err(self.io_context("write"))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file_mut()?.flush()
    }
}

impl Seek for OsFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file_mut()?.seek(pos)
    }
}

impl File for OsFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, FsError> {
        let file = self.readable("read_at")?;
        #[cfg(unix)]
        let result = std::os::unix::fs::FileExt::read_at(file, buf, offset);
        #[cfg(windows)]
        let result = std::os::windows::fs::FileExt::seek_read(file, buf, offset);
        result.map_err(self.io_err("read_at"))
    }

    fn write_at(&self, data: &[u8], offset: u64) -> Result<usize, FsError> {
        let file = self.writable("write_at")?;
        #[cfg(unix)]
        let result = std::os::unix::fs::FileExt::write_at(file, data, offset);
        #[cfg(windows)]
        let result = std::os::windows::fs::FileExt::seek_write(file, data, offset);
        result.map_err(self.io_err("write_at"))
    }

    fn truncate(&self, size: u64) -> Result<(), FsError> {
        self.writable("truncate")?
            .set_len(size)
            .map_err(self.io_err("truncate"))
    }

    fn sync(&self) -> Result<(), FsError> {
        self.file()?.sync_all().map_err(self.io_err("sync"))
    }

    fn metadata(&self) -> Result<Metadata, FsError> {
        let meta = self.file()?.metadata().map_err(self.io_err("metadata"))?;
        Ok(Metadata::from_std(base_name(&self.path), &meta))
    }

    fn close(&mut self) -> Result<(), FsError> {
        match self.file.take() {
            Some(_) => {
                self.listing = None;
                Ok(())
            }
            None => Err(FsError::FileClosed {
                path: self.path.clone(),
            }),
        }
    }

    fn read_dir(&mut self, count: usize) -> Result<Vec<Metadata>, FsError> {
        let is_dir = self
            .file()?
            .metadata()
            .map_err(self.io_err("read_dir"))?
            .is_dir();
        if !is_dir {
            return Err(FsError::InvalidOperation {
                path: self.path.clone(),
                operation: "read_dir",
            });
        }
        if self.listing.is_none() {
            self.listing = Some(self.list()?);
        }
        match self.listing.as_mut() {
            Some(listing) => next_page(listing, count, &self.name),
            None => Ok(Vec::new()),
        }
    }
}
