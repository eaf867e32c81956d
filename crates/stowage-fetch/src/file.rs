//! Handler for `file:` URLs.

use std::path::{Path, PathBuf};

use stowage_fs::{CopyOptions, FileSystem, OsFileSystem, copy_file};

use crate::error::{FetchError, Result};
use crate::handler::RemoteResourceHandler;
use crate::resource::{RemoteResource, RemoteResourceInfo};

/// Serves `file:` resources straight from a [`FileSystem`].
#[derive(Clone, Debug, Default)]
pub struct FileHandler<F = OsFileSystem> {
    fs: F,
}

impl FileHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F: FileSystem> FileHandler<F> {
    pub fn with_fs(fs: F) -> Self {
        Self { fs }
    }

    fn local_path(resource: &RemoteResource) -> Result<PathBuf> {
        resource
            .url()
            .to_file_path()
            .map_err(|()| FetchError::InvalidUrl(format!("not a local file: {resource}")))
    }
}

impl<F: FileSystem> RemoteResourceHandler for FileHandler<F> {
    fn info(&self, resource: &RemoteResource) -> RemoteResourceInfo {
        let Ok(path) = Self::local_path(resource) else {
            return RemoteResourceInfo::Unavailable;
        };
        match self.fs.stat(&path) {
            Ok(Some(stat)) if stat.is_file() => RemoteResourceInfo::from_len(
                i64::try_from(stat.len).ok(),
                stat.modified,
                None,
            ),
            Ok(_) => RemoteResourceInfo::Unavailable,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot stat local resource");
                RemoteResourceInfo::Unavailable
            }
        }
    }

    fn download(
        &self,
        resource: &RemoteResource,
        dest: &Path,
        options: CopyOptions<'_>,
    ) -> Result<()> {
        let src = Self::local_path(resource)?;
        copy_file(&self.fs, &src, dest, options.overwrite(true))?;
        Ok(())
    }

    fn upload(
        &self,
        src: &Path,
        resource: &RemoteResource,
        options: CopyOptions<'_>,
    ) -> Result<()> {
        let dest = Self::local_path(resource)?;
        copy_file(&self.fs, src, &dest, options.overwrite(true))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;
    use url::Url;

    fn resource(path: &Path) -> RemoteResource {
        Url::from_file_path(path).unwrap().into()
    }

    #[test]
    fn test_info_and_reachability() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("ivy.xml");
        std::fs::write(&file, "<ivy-module/>").unwrap();
        std::fs::write(dir.path().join("empty"), "").unwrap();

        let handler = FileHandler::new();
        let info = handler.info(&resource(&file));
        assert_eq!(info.len(), Some(13));
        assert!(info.last_modified().is_some());
        assert!(handler.is_reachable(&resource(&file)));

        assert!(!handler.is_reachable(&resource(&dir.path().join("missing"))));
        assert!(!handler.is_reachable(&resource(&dir.path().join("empty"))));
        assert!(!handler.is_reachable(&resource(dir.path())));
    }

    #[test]
    fn test_download_preserves_content_and_mtime() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("repo/a.jar");
        std::fs::create_dir_all(src.parent().unwrap()).unwrap();
        std::fs::write(&src, "jar").unwrap();
        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        OsFileSystem.set_modified(&src, when).unwrap();

        let dest = dir.path().join("cache/a.jar");
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&dest, "stale").unwrap();

        FileHandler::new()
            .download(&resource(&src), &dest, CopyOptions::new())
            .unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "jar");
        assert_eq!(OsFileSystem.stat(&dest).unwrap().unwrap().modified, Some(when));
    }

    #[test]
    fn test_upload_creates_parents() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("built.jar");
        std::fs::write(&src, "artifact").unwrap();
        let target = dir.path().join("publish/org/mod/1.0/mod.jar");

        FileHandler::new()
            .upload(&src, &resource(&target), CopyOptions::new())
            .unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "artifact");
    }

    #[test]
    fn test_download_missing_source_fails() {
        let dir = tempdir().unwrap();
        let err = FileHandler::new()
            .download(
                &resource(&dir.path().join("nope")),
                &dir.path().join("out"),
                CopyOptions::new(),
            )
            .unwrap_err();
        assert!(matches!(err, FetchError::Fs(stowage_fs::Error::Read { .. })));
    }
}
