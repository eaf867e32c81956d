//! Byte-stream and single-file copies.

use std::fmt;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::mirror::mirror;
use crate::progress::{CopyProgressEvent, ProgressListener};
use crate::provider::{FileKind, FileStat, FileSystem};

/// Chunk size used for every stream copy.
pub const BUFFER_SIZE: usize = 64 * 1024;

/// Per-call settings shared by copies, links and mirrors.
#[derive(Clone, Copy, Default)]
pub struct CopyOptions<'a> {
    overwrite: bool,
    listener: Option<&'a dyn ProgressListener>,
    cancel: Option<&'a CancelToken>,
}

impl fmt::Debug for CopyOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyOptions")
            .field("overwrite", &self.overwrite)
            .field("listener", &self.listener.map(|_| "{ ... }"))
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl<'a> CopyOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace destination files that already exist.
    #[must_use]
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub fn listener(mut self, listener: &'a dyn ProgressListener) -> Self {
        self.listener = Some(listener);
        self
    }

    #[must_use]
    pub fn cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn is_overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn get_listener(&self) -> Option<&'a dyn ProgressListener> {
        self.listener
    }

    pub fn get_cancel(&self) -> Option<&'a CancelToken> {
        self.cancel
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }
}

/// Copy everything from `src` to `dest` in [`BUFFER_SIZE`] chunks.
///
/// Streams passed by value are dropped, and so closed, on every exit path;
/// pass `&mut` to keep them open. The cancel token is polled once per chunk
/// and a cancelled copy fails with [`Error::Interrupted`], leaving whatever
/// was already written in `dest`. A failing flush of `dest` is ignored.
pub fn copy_bytes<R, W>(mut src: R, mut dest: W, options: CopyOptions<'_>) -> Result<u64>
where
    R: Read,
    W: Write,
{
    let mut event = CopyProgressEvent::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;

    if let Some(listener) = options.listener {
        listener.start(&event);
    }

    loop {
        let read = match src.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        if options.is_cancelled() {
            return Err(Error::Interrupted);
        }
        dest.write_all(&buffer[..read])?;
        total += read as u64;
        if let Some(listener) = options.listener {
            listener.progress(event.update(read, total));
        }
    }

    event.update(0, total);

    if let Err(e) = dest.flush() {
        tracing::trace!(error = %e, "ignoring flush failure");
    }
    drop(src);
    drop(dest);

    if let Some(listener) = options.listener {
        listener.end(&event);
    }

    Ok(total)
}

pub(crate) fn stat_required<F>(fs: &F, path: &Path) -> Result<FileStat>
where
    F: FileSystem + ?Sized,
{
    fs.stat(path)
        .map_err(|e| Error::read(path, e))?
        .ok_or_else(|| {
            Error::read(
                path,
                io::Error::new(io::ErrorKind::NotFound, "no such file or directory"),
            )
        })
}

pub(crate) enum Prepared {
    Skipped,
    Directory,
    File,
}

pub(crate) fn prepare<F>(fs: &F, src: &Path, dest: &Path, overwrite: bool) -> Result<Prepared>
where
    F: FileSystem + ?Sized,
{
    let src_stat = stat_required(fs, src)?;
    let dest_stat = fs.stat(dest).map_err(|e| Error::read(dest, e))?;

    if src_stat.is_dir() {
        match dest_stat {
            Some(stat) if !stat.is_dir() => {
                return Err(Error::TypeMismatch {
                    path: dest.to_path_buf(),
                    expected: FileKind::Dir,
                });
            }
            Some(_) => {}
            None => fs.create_dir_all(dest).map_err(|e| Error::write(dest, e))?,
        }
        return Ok(Prepared::Directory);
    }

    if let Some(stat) = &dest_stat {
        if !stat.is_file() {
            return Err(Error::TypeMismatch {
                path: dest.to_path_buf(),
                expected: FileKind::File,
            });
        }
        if !overwrite {
            tracing::debug!(dest = %dest.display(), "already exists, nothing done");
            return Ok(Prepared::Skipped);
        }
    }

    // writing through a link would truncate its target, possibly `src`
    let dest_link = fs.symlink_stat(dest).map_err(|e| Error::read(dest, e))?;
    if dest_link.is_some_and(|stat| stat.kind == FileKind::Symlink) {
        fs.remove_file(dest).map_err(|e| Error::write(dest, e))?;
    } else if dest_stat.is_some_and(|stat| stat.readonly) {
        fs.set_readonly(dest, false)
            .map_err(|e| Error::write(dest, e))?;
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs.create_dir_all(parent)
            .map_err(|e| Error::write(parent, e))?;
    }

    Ok(Prepared::File)
}

/// Check that `src` may be copied or linked onto `dest` and make room for it.
///
/// Returns `false` when `dest` is an existing file and `overwrite` is off;
/// the caller should then do nothing. Directory sources get their
/// destination directory created. Wrong destination kinds fail with
/// [`Error::TypeMismatch`].
pub fn prepare_copy<F>(fs: &F, src: &Path, dest: &Path, overwrite: bool) -> Result<bool>
where
    F: FileSystem + ?Sized,
{
    Ok(!matches!(prepare(fs, src, dest, overwrite)?, Prepared::Skipped))
}

/// Copy a file, or mirror a directory, from `src` to `dest`.
///
/// Returns `false` when the copy was skipped because `dest` already exists
/// and overwriting is off. A finished file copy is checked for equal length;
/// on mismatch the destination is removed and [`Error::Integrity`] returned.
/// The destination then takes the source modification time.
pub fn copy_file<F>(fs: &F, src: &Path, dest: &Path, options: CopyOptions<'_>) -> Result<bool>
where
    F: FileSystem + ?Sized,
{
    match prepare(fs, src, dest, options.is_overwrite())? {
        Prepared::Skipped => Ok(false),
        Prepared::Directory => {
            mirror(fs, src, dest, options)?;
            Ok(true)
        }
        Prepared::File => {
            copy_regular(fs, src, dest, options)?;
            Ok(true)
        }
    }
}

fn copy_regular<F>(fs: &F, src: &Path, dest: &Path, options: CopyOptions<'_>) -> Result<()>
where
    F: FileSystem + ?Sized,
{
    tracing::trace!(src = %src.display(), dest = %dest.display(), "copying file");

    let src_stat = stat_required(fs, src)?;
    let reader = fs.open(src).map_err(|e| Error::read(src, e))?;
    let writer = fs.create(dest).map_err(|e| Error::write(dest, e))?;
    copy_bytes(reader, writer, options)?;

    let dest_len = fs
        .stat(dest)
        .map_err(|e| Error::read(dest, e))?
        .map_or(0, |stat| stat.len);

    if src_stat.len != dest_len {
        if let Err(e) = fs.remove_file(dest) {
            tracing::debug!(dest = %dest.display(), error = %e, "failed to remove partial copy");
        }
        return Err(Error::Integrity {
            src: src.to_path_buf(),
            src_len: src_stat.len,
            dest: dest.to_path_buf(),
            dest_len,
        });
    }

    if let Some(modified) = src_stat.modified {
        fs.set_modified(dest, modified)
            .map_err(|e| Error::write(dest, e))?;
    }

    Ok(())
}
