//! Remote resource handlers: reachability checks, metadata and streaming
//! transfers, dispatched by URL scheme.
//!
//! # Architecture
//!
//! - [`RemoteResourceHandler`] - Capability every protocol plugin implements
//! - [`HandlerRegistry`] - Scheme-keyed dispatch, itself a handler
//! - [`FileHandler`] - `file:` resources through a `stowage_fs::FileSystem`
//! - `HttpHandler` - `http:`/`https:` on reqwest (feature `reqwest`)
//!
//! Transfers reuse `stowage_fs::copy_bytes`, so progress listeners and
//! cancellation tokens behave the same for local and remote copies.

mod error;
mod file;
mod handler;
mod registry;
mod resource;

#[cfg(feature = "reqwest")]
mod http;

pub use error::{FetchError, Result};
pub use file::FileHandler;
pub use handler::RemoteResourceHandler;
pub use registry::HandlerRegistry;
pub use resource::{RemoteResource, RemoteResourceInfo};

#[cfg(feature = "reqwest")]
pub use http::{HttpHandler, HttpOptions};
