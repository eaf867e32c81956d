use std::path::Path;
use std::sync::Arc;

use stowage_fs::CopyOptions;

use crate::error::Result;
use crate::resource::{RemoteResource, RemoteResourceInfo};

/// Protocol plugin moving bytes between a remote resource and local files.
///
/// Reachability checks never fail: anything that prevents an answer is
/// reported as [`RemoteResourceInfo::Unavailable`]. Downloads write the fully decoded
/// payload, whatever content encoding the protocol negotiated.
pub trait RemoteResourceHandler: Send + Sync {
    fn is_reachable(&self, resource: &RemoteResource) -> bool {
        self.info(resource).is_available()
    }

    fn info(&self, resource: &RemoteResource) -> RemoteResourceInfo;

    /// Fetch `resource` into the local file `dest`, replacing it.
    fn download(
        &self,
        resource: &RemoteResource,
        dest: &Path,
        options: CopyOptions<'_>,
    ) -> Result<()>;

    /// Publish the local file `src` as `resource`.
    fn upload(&self, src: &Path, resource: &RemoteResource, options: CopyOptions<'_>) -> Result<()>;
}

impl<T: RemoteResourceHandler + ?Sized> RemoteResourceHandler for Arc<T> {
    fn is_reachable(&self, resource: &RemoteResource) -> bool {
        (**self).is_reachable(resource)
    }

    fn info(&self, resource: &RemoteResource) -> RemoteResourceInfo {
        (**self).info(resource)
    }

    fn download(
        &self,
        resource: &RemoteResource,
        dest: &Path,
        options: CopyOptions<'_>,
    ) -> Result<()> {
        (**self).download(resource, dest, options)
    }

    fn upload(
        &self,
        src: &Path,
        resource: &RemoteResource,
        options: CopyOptions<'_>,
    ) -> Result<()> {
        (**self).upload(src, resource, options)
    }
}
