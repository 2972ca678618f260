//! Error types for block device operations.

use std::io;
use thiserror::Error;

/// Result type for block device operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during block device operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to access blocks beyond the end of the device.
    #[error("access beyond end of device: offset {offset}, len {len}, size {size}")]
    OutOfRange {
        /// The requested byte offset.
        offset: u64,
        /// The requested transfer length.
        len: usize,
        /// The device size in bytes.
        size: u64,
    },

    /// The transfer is not block aligned.
    #[error("misaligned transfer: offset {offset}, len {len}, block size {block_size}")]
    Misaligned {
        /// The requested byte offset.
        offset: u64,
        /// The requested transfer length.
        len: usize,
        /// The device block size.
        block_size: u32,
    },

    /// The device does not support the operation (e.g. FVM calls on a
    /// plain device).
    #[error("operation not supported by device")]
    NotSupported,

    /// The transfer touches a virtual slice that has not been allocated.
    #[error("virtual slice {slice} is not allocated")]
    Unmapped {
        /// The unallocated virtual slice.
        slice: u64,
    },

    /// A failure injected by [`crate::FaultyBlockDevice`].
    #[error("injected I/O failure at offset {offset}")]
    Injected {
        /// The byte offset of the failed transfer.
        offset: u64,
    },
}
