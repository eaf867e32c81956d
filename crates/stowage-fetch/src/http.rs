//! Handler for `http:` and `https:` URLs on a blocking reqwest client.

use std::io;
use std::path::Path;
use std::thread;
use std::time::{Duration, SystemTime};

use reqwest::blocking::{Body, Client, Response};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, LAST_MODIFIED};
use stowage_fs::{CopyOptions, FileSystem, OsFileSystem, copy_bytes};

use crate::error::{FetchError, Result};
use crate::handler::RemoteResourceHandler;
use crate::resource::{RemoteResource, RemoteResourceInfo};

#[derive(Clone, Debug)]
pub struct HttpOptions {
    connect_timeout: Duration,
    timeout: Option<Duration>,
    user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpOptions {
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            timeout: None,
            user_agent: concat!("stowage/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Limit for a whole request, body included. Unlimited by default so
    /// large artifacts are not cut off.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HEAD for metadata, GET for downloads, PUT for uploads.
///
/// gzip and deflate bodies are decoded by the client, so downloaded files
/// hold the decoded payload.
#[derive(Clone, Debug)]
pub struct HttpHandler<F = OsFileSystem> {
    client: Client,
    fs: F,
}

impl HttpHandler {
    pub fn new(options: HttpOptions) -> Result<Self> {
        Self::with_fs(OsFileSystem, options)
    }
}

impl<F: FileSystem> HttpHandler<F> {
    pub fn with_fs(fs: F, options: HttpOptions) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.timeout)
            .user_agent(options.user_agent)
            .build()
            .map_err(network)?;
        Ok(Self { client, fs })
    }

    fn checked(resource: &RemoteResource, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(FetchError::Http {
                url: resource.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

fn network(e: reqwest::Error) -> FetchError {
    FetchError::Network(e.to_string())
}

fn info_from_headers(headers: &HeaderMap) -> RemoteResourceInfo {
    let text = |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

    let len = text(CONTENT_LENGTH).and_then(|v| v.trim().parse::<i64>().ok());
    let last_modified = text(LAST_MODIFIED).and_then(parse_http_date);
    let content_type = text(CONTENT_TYPE).map(str::to_owned);

    RemoteResourceInfo::from_len(len, last_modified, content_type)
}

fn parse_http_date(value: &str) -> Option<SystemTime> {
    chrono::DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(SystemTime::from)
}

impl<F: FileSystem> RemoteResourceHandler for HttpHandler<F> {
    fn info(&self, resource: &RemoteResource) -> RemoteResourceInfo {
        let response = match self.client.head(resource.url().clone()).send() {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(%resource, error = %e, "HEAD request failed");
                return RemoteResourceInfo::Unavailable;
            }
        };
        if !response.status().is_success() {
            tracing::debug!(%resource, status = %response.status(), "resource not available");
            return RemoteResourceInfo::Unavailable;
        }
        info_from_headers(response.headers())
    }

    fn download(
        &self,
        resource: &RemoteResource,
        dest: &Path,
        options: CopyOptions<'_>,
    ) -> Result<()> {
        let response = self
            .client
            .get(resource.url().clone())
            .send()
            .map_err(network)?;
        let response = Self::checked(resource, response)?;

        // reqwest drops the length of bodies it decodes
        let expected = response.content_length();
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date);

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs
                .create_dir_all(parent)
                .map_err(|e| write_error(parent, e))?;
        }
        let writer = self.fs.create(dest).map_err(|e| write_error(dest, e))?;

        let copied = match copy_bytes(response, writer, options) {
            Ok(copied) => copied,
            Err(e) => {
                self.discard(dest);
                return Err(e.into());
            }
        };

        if let Some(expected) = expected.filter(|&len| len != copied) {
            self.discard(dest);
            return Err(FetchError::LengthMismatch {
                url: resource.to_string(),
                expected,
                actual: copied,
            });
        }

        if let Some(modified) = last_modified {
            if let Err(e) = self.fs.set_modified(dest, modified) {
                tracing::debug!(dest = %dest.display(), error = %e, "cannot apply Last-Modified");
            }
        }
        tracing::trace!(%resource, dest = %dest.display(), bytes = copied, "downloaded");
        Ok(())
    }

    /// The file is streamed through a pipe filled by [`copy_bytes`] on a
    /// second thread, so listener events and cancellation follow the bytes
    /// handed to the connection.
    fn upload(
        &self,
        src: &Path,
        resource: &RemoteResource,
        options: CopyOptions<'_>,
    ) -> Result<()> {
        let len = match self.fs.stat(src) {
            Ok(Some(stat)) => stat.len,
            Ok(None) => return Err(read_error(src, io::ErrorKind::NotFound.into())),
            Err(e) => return Err(read_error(src, e)),
        };
        let reader = self.fs.open(src).map_err(|e| read_error(src, e))?;
        let (body, sink) = io::pipe()?;

        let (sent, copied) = thread::scope(|scope| {
            let copier = scope.spawn(move || copy_bytes(reader, sink, options));
            let sent = self
                .client
                .put(resource.url().clone())
                .body(Body::sized(body, len))
                .send();
            let copied = copier
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (sent, copied)
        });

        // a cancelled copy cuts the body short, which the client reports too
        match (sent, copied) {
            (_, Err(e)) if e.is_interrupted() => Err(e.into()),
            (Err(e), _) => Err(network(e)),
            (Ok(_), Err(e)) => Err(e.into()),
            (Ok(response), Ok(copied)) => {
                Self::checked(resource, response)?;
                tracing::trace!(%resource, src = %src.display(), bytes = copied, "uploaded");
                Ok(())
            }
        }
    }
}

impl<F: FileSystem> HttpHandler<F> {
    fn discard(&self, dest: &Path) {
        if let Err(e) = self.fs.remove_file(dest) {
            tracing::debug!(
                dest = %dest.display(),
                error = %e,
                "failed to remove partial download"
            );
        }
    }
}

fn read_error(path: &Path, source: io::Error) -> FetchError {
    stowage_fs::Error::Read {
        path: path.to_path_buf(),
        source,
    }
    .into()
}

fn write_error(path: &Path, source: io::Error) -> FetchError {
    stowage_fs::Error::Write {
        path: path.to_path_buf(),
        source,
    }
    .into()
}
