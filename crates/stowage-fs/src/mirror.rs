//! Recursive directory mirroring.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;

use crate::error::{Error, Result};
use crate::provider::FileSystem;
use crate::transfer::{CopyOptions, copy_file, stat_required};
use crate::tree::force_delete;

/// Names found in a destination directory before a mirror step touches it.
///
/// Every name matched by a source entry is struck off; whatever is left at
/// the end has no source counterpart and is deleted.
#[derive(Debug, Default)]
pub struct DirectorySnapshot {
    entries: HashSet<OsString>,
}

impl DirectorySnapshot {
    pub fn capture<F>(fs: &F, dir: &Path) -> Result<Self>
    where
        F: FileSystem + ?Sized,
    {
        let entries = fs
            .read_dir(dir)
            .map_err(|e| Error::read(dir, e))?
            .into_iter()
            .collect();
        Ok(Self { entries })
    }

    /// Mark `name` as present in the source.
    pub fn account_for(&mut self, name: &OsString) -> bool {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names with no source counterpart, sorted.
    pub fn into_stale(self) -> Vec<OsString> {
        let mut stale: Vec<_> = self.entries.into_iter().collect();
        stale.sort();
        stale
    }
}

/// Make `dest` a replica of the directory `src`.
///
/// Files are copied with [`copy_file`], so an existing destination file is
/// only replaced when `options` allows overwriting. Entries present in `dest`
/// but not in `src` are deleted at every depth. A non-directory at `dest` is
/// replaced by a directory. The mirror is not transactional: a failure leaves
/// whatever was already copied in place.
pub fn mirror<F>(fs: &F, src: &Path, dest: &Path, options: CopyOptions<'_>) -> Result<()>
where
    F: FileSystem + ?Sized,
{
    let src_stat = stat_required(fs, src)?;
    let dest_stat = fs.symlink_stat(dest).map_err(|e| Error::read(dest, e))?;

    let mut snapshot = match dest_stat {
        Some(stat) if stat.is_dir() => DirectorySnapshot::capture(fs, dest)?,
        existing => {
            if existing.is_some() {
                tracing::debug!(dest = %dest.display(), "replacing non-directory with a directory");
                force_delete(fs, dest)?;
            }
            fs.create_dir_all(dest).map_err(|e| Error::write(dest, e))?;
            if let Some(modified) = src_stat.modified {
                fs.set_modified(dest, modified)
                    .map_err(|e| Error::write(dest, e))?;
            }
            DirectorySnapshot::default()
        }
    };

    let mut names = fs.read_dir(src).map_err(|e| Error::read(src, e))?;
    names.sort();

    for name in names {
        let child_src = src.join(&name);
        let child_dest = dest.join(&name);
        snapshot.account_for(&name);

        if stat_required(fs, &child_src)?.is_dir() {
            mirror(fs, &child_src, &child_dest, options)?;
        } else {
            copy_file(fs, &child_src, &child_dest, options)?;
        }
    }

    for name in snapshot.into_stale() {
        let stale = dest.join(&name);
        tracing::debug!(path = %stale.display(), "deleting entry missing from source");
        force_delete(fs, &stale)?;
    }

    Ok(())
}
