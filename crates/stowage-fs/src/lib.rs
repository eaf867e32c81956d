//! Local artifact transfer: cancellable copies, link-or-copy and directory
//! mirroring.
//!
//! # Architecture
//!
//! - `provider.rs` - [`FileSystem`] seam every operation goes through
//! - `path.rs` - Lexical path normalization
//! - `transfer.rs` - Chunked byte copies and integrity-checked file copies
//! - `link.rs` - Symbolic links with fallback to copying, batch linking
//! - `mirror.rs` - Recursive tree replication with stale-entry deletion
//! - `tree.rs` - Forced deletion, listing and sizing of trees
//! - `command.rs` - Process execution for external link helpers
//! - `properties.rs` - Small persisted `key=value` status files
//!
//! # Key Features
//!
//! - **Integrity**: every file copy is length-checked and keeps the source
//!   modification time
//! - **Cooperative Cancellation**: [`CancelToken`] is polled once per chunk
//! - **Never Half-Linked**: a link that fails or cannot be verified is
//!   replaced by a real copy

mod atomic;
mod cancel;
mod error;
mod mirror;
mod progress;
mod provider;
mod transfer;

pub mod command;
pub mod link;
pub mod path;
pub mod properties;
pub mod tree;

pub use atomic::{AtomicWriteOptions, atomic_write};
pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use link::{LinkCreator, ProcessLinkCreator, SymlinkCreator, link, mass_link};
pub use mirror::{DirectorySnapshot, mirror};
pub use path::{FileLocation, normalize, resolve_file};
pub use progress::{CopyProgressEvent, ProgressListener};
pub use properties::PropertiesFile;
pub use provider::{FileKind, FileStat, FileSystem, OsFileSystem};
pub use transfer::{BUFFER_SIZE, CopyOptions, copy_bytes, copy_file, prepare_copy};
pub use tree::force_delete;
