use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::provider::FileKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsafe path rejected for batch linking: '{}'", .path.display())]
    Validation { path: PathBuf },

    #[error(
        "size of source file {} ({src_len}) differs from size of destination file {} ({dest_len}), please retry",
        .src.display(),
        .dest.display()
    )]
    Integrity {
        src: PathBuf,
        src_len: u64,
        dest: PathBuf,
        dest_len: u64,
    },

    #[error("impossible to copy: destination is not a {expected}: {}", .path.display())]
    TypeMismatch { path: PathBuf, expected: FileKind },

    #[error("transfer interrupted")]
    Interrupted,

    #[error("error running {program} (exit status {status:?}):\n{stderr}")]
    ExternalProcess {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn read(path: &Path, source: io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the failure came from a cancelled transfer.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}
