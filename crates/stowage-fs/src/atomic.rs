use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};
use crate::provider::FileSystem;

#[derive(Clone, Copy, Debug, Default)]
pub struct AtomicWriteOptions {
    sync: bool,
}

impl AtomicWriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flush the temporary file to disk before it replaces the target.
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

/// Replace `path` with `content` so readers see either the old or the new
/// file, never a partial one. Missing parent directories are created.
pub fn atomic_write<F>(
    fs: &F,
    path: impl AsRef<Path>,
    content: &[u8],
    options: AtomicWriteOptions,
) -> Result<()>
where
    F: FileSystem + ?Sized,
{
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs.create_dir_all(parent)
        .map_err(|e| Error::write(parent, e))?;

    let tmp_path = parent.join(format!(".tmp.{}.stowage", uuid::Uuid::new_v4()));

    let written = fs.create(&tmp_path).and_then(|mut file| {
        file.write_all(content)?;
        file.flush()?;
        drop(file);
        if options.sync {
            fs.sync_file(&tmp_path)?;
        }
        Ok(())
    });
    if let Err(e) = written {
        let _ = fs.remove_file(&tmp_path);
        return Err(Error::write(&tmp_path, e));
    }

    fs.rename(&tmp_path, path).map_err(|e| {
        let _ = fs.remove_file(&tmp_path);
        Error::write(path, e)
    })
}
