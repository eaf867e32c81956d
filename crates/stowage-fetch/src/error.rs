//! Error types for stowage-fetch.

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no handler registered for scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("resource unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP error {status} for {url}")]
    Http { url: String, status: u16 },

    #[error(
        "downloaded size of {url} ({actual}) does not match its announced length ({expected})"
    )]
    LengthMismatch { url: String, expected: u64, actual: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error(transparent)]
    Fs(#[from] stowage_fs::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FetchError {
    /// Whether the failure came from a cancelled transfer.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Fs(e) if e.is_interrupted())
    }
}
