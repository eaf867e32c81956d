//! Scheme-based dispatch to resource handlers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use stowage_fs::CopyOptions;

use crate::error::{FetchError, Result};
use crate::file::FileHandler;
use crate::handler::RemoteResourceHandler;
use crate::resource::{RemoteResource, RemoteResourceInfo};

/// Handlers keyed by lower-case URL scheme.
///
/// The registry is itself a [`RemoteResourceHandler`] that forwards each
/// call to the handler registered for the resource's scheme.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn RemoteResourceHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry serving `file` and, with the `reqwest` feature, `http` and
    /// `https`.
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        registry.register("file", FileHandler::new());

        #[cfg(feature = "reqwest")]
        {
            let http = Arc::new(crate::http::HttpHandler::new(crate::http::HttpOptions::new())?);
            registry.register_shared("http", http.clone());
            registry.register_shared("https", http);
        }

        Ok(registry)
    }

    /// Register `handler` for `scheme`, returning the handler it replaces.
    pub fn register(
        &mut self,
        scheme: &str,
        handler: impl RemoteResourceHandler + 'static,
    ) -> Option<Arc<dyn RemoteResourceHandler>> {
        self.register_shared(scheme, Arc::new(handler))
    }

    /// Register one handler instance under several schemes.
    pub fn register_shared(
        &mut self,
        scheme: &str,
        handler: Arc<dyn RemoteResourceHandler>,
    ) -> Option<Arc<dyn RemoteResourceHandler>> {
        tracing::debug!(scheme, "registering resource handler");
        self.handlers.insert(scheme.to_ascii_lowercase(), handler)
    }

    pub fn handler_for(&self, scheme: &str) -> Option<&dyn RemoteResourceHandler> {
        self.handlers
            .get(&scheme.to_ascii_lowercase())
            .map(|handler| handler.as_ref())
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    fn require(&self, resource: &RemoteResource) -> Result<&dyn RemoteResourceHandler> {
        self.handler_for(resource.scheme())
            .ok_or_else(|| FetchError::UnsupportedScheme {
                scheme: resource.scheme().to_owned(),
            })
    }
}

impl RemoteResourceHandler for HandlerRegistry {
    fn is_reachable(&self, resource: &RemoteResource) -> bool {
        self.handler_for(resource.scheme())
            .is_some_and(|handler| handler.is_reachable(resource))
    }

    fn info(&self, resource: &RemoteResource) -> RemoteResourceInfo {
        match self.handler_for(resource.scheme()) {
            Some(handler) => handler.info(resource),
            None => {
                tracing::debug!(%resource, "no handler for scheme");
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
        self.require(resource)?.download(resource, dest, options)
    }

    fn upload(
        &self,
        src: &Path,
        resource: &RemoteResource,
        options: CopyOptions<'_>,
    ) -> Result<()> {
        self.require(resource)?.upload(src, resource, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        lookups: AtomicUsize,
    }

    impl RemoteResourceHandler for Counting {
        fn info(&self, _resource: &RemoteResource) -> RemoteResourceInfo {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            RemoteResourceInfo::from_len(Some(10), None, None)
        }

        fn download(&self, _: &RemoteResource, _: &Path, _: CopyOptions<'_>) -> Result<()> {
            Ok(())
        }

        fn upload(&self, _: &Path, _: &RemoteResource, _: CopyOptions<'_>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_by_scheme() {
        let counting = Arc::new(Counting::default());
        let mut registry = HandlerRegistry::new();
        registry.register_shared("SFTP", counting.clone());

        let res = RemoteResource::parse("sftp://host/repo/a.jar").unwrap();
        assert!(registry.is_reachable(&res));
        assert_eq!(registry.info(&res).len(), Some(10));
        assert_eq!(counting.lookups.load(Ordering::SeqCst), 2);
        assert_eq!(registry.schemes(), vec!["sftp"]);
    }

    #[test]
    fn test_unknown_scheme() {
        let registry = HandlerRegistry::new();
        let res = RemoteResource::parse("ftp://host/a.jar").unwrap();

        assert!(!registry.is_reachable(&res));
        assert_eq!(registry.info(&res), RemoteResourceInfo::Unavailable);
        let err = registry
            .download(&res, Path::new("out"), CopyOptions::new())
            .unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme { scheme } if scheme == "ftp"));
    }

    #[test]
    fn test_register_replaces_previous() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register("mem", Counting::default()).is_none());
        assert!(registry.register("mem", Counting::default()).is_some());
    }

    #[test]
    fn test_defaults_serve_file_scheme() {
        let registry = HandlerRegistry::with_defaults().unwrap();
        assert!(registry.handler_for("file").is_some());
        #[cfg(feature = "reqwest")]
        assert_eq!(registry.schemes(), vec!["file", "http", "https"]);
    }
}
