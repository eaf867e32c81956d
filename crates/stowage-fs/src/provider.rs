//! Filesystem provider abstraction.
//!
//! Every component in this crate touches the disk through a [`FileSystem`]
//! passed in by the caller. [`OsFileSystem`] is the production provider;
//! tests wrap it to inject faults.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use filetime::FileTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileKind {
    File,
    Dir,
    Symlink,
    Other,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::File => write!(f, "file"),
            FileKind::Dir => write!(f, "directory"),
            FileKind::Symlink => write!(f, "symbolic link"),
            FileKind::Other => write!(f, "special file"),
        }
    }
}

/// Metadata snapshot of a single path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileStat {
    pub kind: FileKind,
    pub len: u64,
    pub modified: Option<SystemTime>,
    pub readonly: bool,
}

impl FileStat {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    fn from_metadata(metadata: &fs::Metadata) -> Self {
        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            FileKind::Symlink
        } else if file_type.is_dir() {
            FileKind::Dir
        } else if file_type.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        };

        Self {
            kind,
            len: metadata.len(),
            modified: metadata.modified().ok(),
            readonly: metadata.permissions().readonly(),
        }
    }
}

pub trait FileSystem: Send + Sync {
    /// Metadata of `path` following symlinks, `None` when nothing is there.
    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>>;

    /// Metadata of `path` itself, without following a final symlink.
    fn symlink_stat(&self, path: &Path) -> io::Result<Option<FileStat>>;

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    /// Create or truncate `path` for writing.
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;

    /// Names of the direct children of `path`.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Move `from` to `to`, replacing a file already at `to`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Flush the content of the file at `path` to stable storage.
    fn sync_file(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;

    fn set_modified(&self, path: &Path, time: SystemTime) -> io::Result<()>;

    fn set_readonly(&self, path: &Path, readonly: bool) -> io::Result<()>;

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    fn exists(&self, path: &Path) -> bool {
        matches!(self.stat(path), Ok(Some(_)))
    }
}

impl<T: FileSystem + ?Sized> FileSystem for &T {
    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        (**self).stat(path)
    }

    fn symlink_stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        (**self).symlink_stat(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        (**self).open(path)
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        (**self).create(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        (**self).read_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        (**self).create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        (**self).remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        (**self).rename(from, to)
    }

    fn sync_file(&self, path: &Path) -> io::Result<()> {
        (**self).sync_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        (**self).remove_dir(path)
    }

    fn set_modified(&self, path: &Path, time: SystemTime) -> io::Result<()> {
        (**self).set_modified(path, time)
    }

    fn set_readonly(&self, path: &Path, readonly: bool) -> io::Result<()> {
        (**self).set_readonly(path, readonly)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).canonicalize(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}

/// The local disk, through `std::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsFileSystem;

fn not_found_as_none(result: io::Result<fs::Metadata>) -> io::Result<Option<FileStat>> {
    match result {
        Ok(metadata) => Ok(Some(FileStat::from_metadata(&metadata))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

impl FileSystem for OsFileSystem {
    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        not_found_as_none(fs::metadata(path))
    }

    fn symlink_stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        not_found_as_none(fs::symlink_metadata(path))
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(path)?))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(fs::File::create(path)?))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn sync_file(&self, path: &Path) -> io::Result<()> {
        fs::OpenOptions::new().write(true).open(path)?.sync_all()
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn set_modified(&self, path: &Path, time: SystemTime) -> io::Result<()> {
        filetime::set_file_mtime(path, FileTime::from_system_time(time))
    }

    fn set_readonly(&self, path: &Path, readonly: bool) -> io::Result<()> {
        let mut permissions = fs::metadata(path)?.permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(readonly);
        fs::set_permissions(path, permissions)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }
}
