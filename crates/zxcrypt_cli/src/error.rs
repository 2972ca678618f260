//! CLI error type.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use zxcrypt_core::{Status, VolumeError};
use zxcrypt_storage::StorageError;

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors reported by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Volume operation failed.
    #[error("{0}")]
    Volume(#[from] VolumeError),

    /// Opening or creating the image failed.
    #[error("{0}")]
    Storage(#[from] StorageError),

    /// Reading a key file failed.
    #[error("failed to read key file {path:?}: {source}")]
    KeyFile {
        /// Key file path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// A key file has the wrong length.
    #[error("key file {path:?} holds {len} bytes, expected 16 or 32")]
    KeyLength {
        /// Key file path.
        path: PathBuf,
        /// Length found.
        len: usize,
    },

    /// A required argument is missing.
    #[error("{0}")]
    Usage(String),

    /// JSON output failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Returns the process exit status for this error.
    pub fn code(&self) -> u8 {
        match self {
            Self::Volume(e) => match e.status() {
                Status::AccessDenied => 2,
                Status::NotSupported => 3,
                Status::InvalidArgs => 4,
                _ => 1,
            },
            Self::KeyLength { .. } | Self::Usage(_) => 4,
            Self::Storage(_) | Self::KeyFile { .. } | Self::Json(_) => 1,
        }
    }

    /// Maps the error to the process exit code.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}
