//! Whole-tree helpers: deletion, listing and sizing.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::provider::{FileKind, FileSystem};

/// Delete `path` and everything below it.
///
/// Symbolic links are removed, never followed. A missing path is not an
/// error. Read-only entries have the flag cleared and are retried once.
pub fn force_delete<F>(fs: &F, path: &Path) -> Result<()>
where
    F: FileSystem + ?Sized,
{
    let Some(stat) = fs.symlink_stat(path).map_err(|e| Error::read(path, e))? else {
        return Ok(());
    };

    if stat.kind == FileKind::Dir {
        for name in fs.read_dir(path).map_err(|e| Error::read(path, e))? {
            force_delete(fs, &path.join(name))?;
        }
        return retry_writable(fs, path, |fs, p| fs.remove_dir(p));
    }

    retry_writable(fs, path, |fs, p| match fs.remove_file(p) {
        // directory symlinks and junctions are directories to the windows api
        #[cfg(windows)]
        Err(e) if stat.kind == FileKind::Symlink => fs.remove_dir(p).map_err(|_| e),
        other => other,
    })
}

fn retry_writable<F, Op>(fs: &F, path: &Path, op: Op) -> Result<()>
where
    F: FileSystem + ?Sized,
    Op: Fn(&F, &Path) -> io::Result<()>,
{
    match op(fs, path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            tracing::trace!(path = %path.display(), "clearing read-only flag before delete");
            fs.set_readonly(path, false)
                .map_err(|_| Error::write(path, e))?;
            op(fs, path).map_err(|e| Error::write(path, e))
        }
        Err(e) => Err(Error::write(path, e)),
    }
}

/// `dir` and every entry below it, parents before children.
///
/// Entries whose file name appears in `ignore` are skipped along with their
/// contents. A missing `dir` yields an empty list.
pub fn list_all<F>(fs: &F, dir: &Path, ignore: &[&str]) -> Result<Vec<PathBuf>>
where
    F: FileSystem + ?Sized,
{
    let mut found = Vec::new();
    collect(fs, dir, ignore, &mut found)?;
    Ok(found)
}

fn collect<F>(fs: &F, path: &Path, ignore: &[&str], found: &mut Vec<PathBuf>) -> Result<()>
where
    F: FileSystem + ?Sized,
{
    let ignored = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| ignore.contains(&name));
    if ignored {
        return Ok(());
    }

    let Some(stat) = fs.stat(path).map_err(|e| Error::read(path, e))? else {
        return Ok(());
    };
    found.push(path.to_path_buf());

    if stat.is_dir() {
        let mut names = fs.read_dir(path).map_err(|e| Error::read(path, e))?;
        names.sort();
        for name in names {
            collect(fs, &path.join(name), ignore, found)?;
        }
    }
    Ok(())
}

/// Size of a file, or the summed size of every file under a directory.
pub fn file_length<F>(fs: &F, path: &Path) -> Result<u64>
where
    F: FileSystem + ?Sized,
{
    let Some(stat) = fs.stat(path).map_err(|e| Error::read(path, e))? else {
        return Ok(0);
    };
    if !stat.is_dir() {
        return Ok(stat.len);
    }

    let mut total = 0;
    for name in fs.read_dir(path).map_err(|e| Error::read(path, e))? {
        total += file_length(fs, &path.join(name))?;
    }
    Ok(total)
}

/// The chain `root, .., file` of every directory between `root` and `file`.
///
/// `path_chain("test", "test/dir1/dir2/file.txt")` yields `test`,
/// `test/dir1`, `test/dir1/dir2` and `test/dir1/dir2/file.txt`. When `root`
/// is not an ancestor of `file`, every ancestor of `file` is listed after
/// `root`.
pub fn path_chain(root: &Path, file: &Path) -> Vec<PathBuf> {
    let mut chain: Vec<PathBuf> = file
        .ancestors()
        .filter(|p| !p.as_os_str().is_empty())
        .take_while(|p| *p != root)
        .map(Path::to_path_buf)
        .collect();
    chain.push(root.to_path_buf());
    chain.reverse();
    chain
}

/// Read a whole stream as text, replacing invalid UTF-8.
pub fn read_entirely<R: Read>(mut reader: R) -> Result<String> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::OsFileSystem;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_force_delete_nested_tree() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::write(root.join("a/file"), "x").unwrap();
        fs::write(root.join("a/b/c/deep"), "y").unwrap();

        force_delete(&OsFileSystem, &root).unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn test_force_delete_missing_is_ok() {
        let dir = tempdir().unwrap();
        force_delete(&OsFileSystem, &dir.path().join("absent")).unwrap();
    }

    #[test]
    fn test_force_delete_readonly_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("locked");
        fs::write(&file, "x").unwrap();
        OsFileSystem.set_readonly(&file, true).unwrap();

        force_delete(&OsFileSystem, &file).unwrap();
        assert!(!file.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_force_delete_leaves_symlink_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("precious"), "keep me").unwrap();

        let tree = dir.path().join("tree");
        fs::create_dir_all(&tree).unwrap();
        std::os::unix::fs::symlink(&target, tree.join("link")).unwrap();

        force_delete(&OsFileSystem, &tree).unwrap();
        assert!(!tree.exists());
        assert_eq!(fs::read_to_string(target.join("precious")).unwrap(), "keep me");
    }

    #[test]
    fn test_list_all_with_ignore() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/.svn")).unwrap();
        fs::write(root.join("src/.svn/entries"), "").unwrap();
        fs::write(root.join("src/a.txt"), "").unwrap();

        let listed = list_all(&OsFileSystem, root, &[".svn"]).unwrap();
        assert_eq!(
            listed,
            vec![root.to_path_buf(), root.join("src"), root.join("src/a.txt")]
        );
        assert!(list_all(&OsFileSystem, &root.join("nope"), &[]).unwrap().is_empty());
    }

    #[test]
    fn test_file_length_sums_tree() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/one"), "1").unwrap();
        fs::write(dir.path().join("a/b/four"), "4444").unwrap();

        assert_eq!(file_length(&OsFileSystem, dir.path()).unwrap(), 5);
        assert_eq!(file_length(&OsFileSystem, &dir.path().join("a/b/four")).unwrap(), 4);
    }

    #[test]
    fn test_path_chain() {
        let chain = path_chain(Path::new("test"), Path::new("test/dir1/dir2/file.txt"));
        assert_eq!(
            chain,
            vec![
                PathBuf::from("test"),
                PathBuf::from("test/dir1"),
                PathBuf::from("test/dir1/dir2"),
                PathBuf::from("test/dir1/dir2/file.txt"),
            ]
        );

        let unrelated = path_chain(Path::new("other"), Path::new("x/y"));
        assert_eq!(
            unrelated,
            vec![PathBuf::from("other"), PathBuf::from("x"), PathBuf::from("x/y")]
        );
    }

    #[test]
    fn test_read_entirely_is_lossy() {
        let text = read_entirely(&b"ok \xff done"[..]).unwrap();
        assert_eq!(text, "ok \u{fffd} done");
    }
}
