//! Symbolic linking with transparent fallback to copying.

use std::ffi::OsStr;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::command::{CommandRunner, SystemRunner};
use crate::error::{Error, Result};
use crate::mirror::mirror;
use crate::path::absolute;
use crate::provider::{FileKind, FileSystem};
use crate::transfer::{CopyOptions, Prepared, copy_file, prepare};

/// Paths allowed into a batch link script. Anything outside this set could
/// change the meaning of the generated shell text.
static SAFE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_\-./\\:~ %()]+$").expect("batch link path pattern is valid")
});

/// Something able to create a symbolic link at `dest` pointing at `src`.
///
/// [`link`] clears `dest` before calling it.
pub trait LinkCreator: Send + Sync {
    fn create_link(&self, src: &Path, dest: &Path) -> Result<()>;
}

impl<T: LinkCreator + ?Sized> LinkCreator for &T {
    fn create_link(&self, src: &Path, dest: &Path) -> Result<()> {
        (**self).create_link(src, dest)
    }
}

/// Creates links in-process.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymlinkCreator;

impl LinkCreator for SymlinkCreator {
    fn create_link(&self, src: &Path, dest: &Path) -> Result<()> {
        #[cfg(unix)]
        let created = std::os::unix::fs::symlink(src, dest);

        #[cfg(windows)]
        let created = if src.is_dir() {
            std::os::windows::fs::symlink_dir(src, dest)
        } else {
            std::os::windows::fs::symlink_file(src, dest)
        };

        #[cfg(not(any(unix, windows)))]
        let created = Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "symbolic links are not supported on this platform",
        ));

        created.map_err(|e| Error::write(dest, e))
    }
}

/// Creates links by running `ln -s -f`.
#[derive(Clone, Debug, Default)]
pub struct ProcessLinkCreator<R = SystemRunner> {
    runner: R,
}

impl<R: CommandRunner> ProcessLinkCreator<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> LinkCreator for ProcessLinkCreator<R> {
    fn create_link(&self, src: &Path, dest: &Path) -> Result<()> {
        tracing::debug!(src = %src.display(), dest = %dest.display(), "executing 'ln -s -f'");
        let args = [
            OsStr::new("-s"),
            OsStr::new("-f"),
            src.as_os_str(),
            dest.as_os_str(),
        ];
        let output = self
            .runner
            .run("ln", &args, None)
            .map_err(|e| Error::write(dest, e))?;

        if !output.success() {
            return Err(Error::ExternalProcess {
                program: "ln".to_owned(),
                status: output.status,
                stderr: output.stderr_lossy(),
            });
        }
        Ok(())
    }
}

/// Link `dest` to `src`, copying instead when linking does not work out.
///
/// The preparation rules of [`copy_file`] apply first, so `false` means the
/// destination already existed and was left alone. A link attempt that
/// fails, leaves nothing behind, or leaves a plain file behind is discarded
/// and the file is copied instead. Link failures are logged, never returned.
/// Directory sources are always mirrored.
pub fn link<F, L>(
    fs: &F,
    linker: &L,
    src: &Path,
    dest: &Path,
    options: CopyOptions<'_>,
) -> Result<bool>
where
    F: FileSystem + ?Sized,
    L: LinkCreator + ?Sized,
{
    match prepare(fs, src, dest, options.is_overwrite())? {
        Prepared::Skipped => return Ok(false),
        Prepared::Directory => {
            tracing::debug!(src = %src.display(), "directories are mirrored, not linked");
            mirror(fs, src, dest, options)?;
            return Ok(true);
        }
        Prepared::File => discard_leftover(fs, dest)?,
    }

    let Err(e) = try_link(fs, linker, src, dest) else {
        return Ok(true);
    };
    tracing::debug!(
        src = %src.display(),
        dest = %dest.display(),
        error = %e,
        "link failed; falling back to copy"
    );

    discard_leftover(fs, dest)?;
    copy_file(fs, src, dest, options.overwrite(true))
}

fn try_link<F, L>(fs: &F, linker: &L, src: &Path, dest: &Path) -> Result<()>
where
    F: FileSystem + ?Sized,
    L: LinkCreator + ?Sized,
{
    let target = absolute(src).map_err(|e| Error::read(src, e))?;
    linker.create_link(&target, dest)?;

    if !fs.exists(dest) {
        return Err(Error::write(
            dest,
            std::io::Error::new(std::io::ErrorKind::NotFound, "link was not created"),
        ));
    }

    let canonical = fs.canonicalize(dest).map_err(|e| Error::read(dest, e))?;
    if canonical == unresolved(fs, dest)? {
        return Err(Error::write(
            dest,
            std::io::Error::other("result is a plain file, not a symbolic link"),
        ));
    }
    Ok(())
}

/// Absolute form of `dest` with only its parent resolved, which is what
/// `canonicalize` returns when `dest` itself is not a link.
fn unresolved<F>(fs: &F, dest: &Path) -> Result<PathBuf>
where
    F: FileSystem + ?Sized,
{
    let plain = absolute(dest).map_err(|e| Error::read(dest, e))?;
    match (plain.parent(), plain.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = fs.canonicalize(parent).map_err(|e| Error::read(parent, e))?;
            Ok(parent.join(name))
        }
        _ => Ok(plain),
    }
}

/// Remove any non-directory at `dest`, so neither the link nor the copy
/// can write through what was there.
fn discard_leftover<F>(fs: &F, dest: &Path) -> Result<()>
where
    F: FileSystem + ?Sized,
{
    match fs.symlink_stat(dest).map_err(|e| Error::read(dest, e))? {
        Some(stat) if stat.kind != FileKind::Dir => {
            fs.remove_file(dest).map_err(|e| Error::write(dest, e))
        }
        _ => Ok(()),
    }
}

/// Create many links with a single `sh` invocation.
///
/// `pairs` holds `(src, dest)` tuples. Every path is made absolute and
/// checked against a conservative character set before anything runs; one
/// bad path rejects the whole batch with [`Error::Validation`]. Without
/// `overwrite`, pairs whose destination exists are left out.
pub fn mass_link<F, R, I, S, D>(fs: &F, runner: &R, pairs: I, overwrite: bool) -> Result<()>
where
    F: FileSystem + ?Sized,
    R: CommandRunner + ?Sized,
    I: IntoIterator<Item = (S, D)>,
    S: AsRef<Path>,
    D: AsRef<Path>,
{
    let mut checked = Vec::new();
    for (src, dest) in pairs {
        let src = checked_absolute(src.as_ref())?;
        let dest = checked_absolute(dest.as_ref())?;
        checked.push((src, dest));
    }

    if !overwrite {
        checked.retain(|(_, dest)| {
            let exists = matches!(fs.symlink_stat(dest), Ok(Some(_)));
            if exists {
                tracing::debug!(dest = %dest.display(), "already exists, nothing done");
            }
            !exists
        });
    }
    if checked.is_empty() {
        return Ok(());
    }

    let script = link_script(&checked);
    tracing::info!(links = checked.len(), "executing batch link with 'sh'");
    tracing::debug!("link script:\n\t{}", script.replace('\n', "\n\t"));

    let output = runner
        .run("sh", &[], Some(script.as_bytes()))
        .map_err(|e| Error::ExternalProcess {
            program: "sh".to_owned(),
            status: None,
            stderr: e.to_string(),
        })?;

    if !output.success() {
        return Err(Error::ExternalProcess {
            program: "sh".to_owned(),
            status: output.status,
            stderr: output.stderr_lossy(),
        });
    }
    Ok(())
}

fn checked_absolute(path: &Path) -> Result<PathBuf> {
    let reject = || Error::Validation {
        path: path.to_path_buf(),
    };
    let absolute = absolute(path).map_err(|_| reject())?;
    match absolute.to_str() {
        Some(text) if SAFE_PATH.is_match(text) => Ok(absolute),
        _ => Err(Error::Validation { path: absolute }),
    }
}

fn link_script(pairs: &[(PathBuf, PathBuf)]) -> String {
    let mut script = String::new();
    for (i, (src, dest)) in pairs.iter().enumerate() {
        if i > 0 {
            script.push('\n');
        }
        let _ = write!(script, "ln -s -f \"{}\"  \"{}\";", src.display(), dest.display());
    }
    script
}
