//! Block device trait definition.

use crate::error::{StorageError, StorageResult};

/// Geometry reported by a block device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Size of one block in bytes.
    pub block_size: u32,
    /// Number of blocks on the device.
    pub block_count: u64,
}

impl BlockInfo {
    /// Returns the device size in bytes, or `None` if it overflows.
    #[must_use]
    pub fn size_bytes(&self) -> Option<u64> {
        u64::from(self.block_size).checked_mul(self.block_count)
    }
}

/// A contiguous run of virtual slices sharing the same allocation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VsliceRange {
    /// Whether the slices in the run are backed by physical slices.
    pub allocated: bool,
    /// Number of slices in the run.
    pub count: u64,
}

/// A synchronous block device.
///
/// Block devices transfer whole blocks. Offsets are byte offsets and must
/// be multiples of the block size; buffer lengths must be whole blocks.
///
/// # Invariants
///
/// - `read_block` returns exactly the bytes last written at that offset
/// - `flush` makes all completed writes durable
/// - Devices must be `Send + Sync`
///
/// # FVM
///
/// The `fvm_*` methods describe a device that is a partition of a flexible
/// volume manager. Their default implementations return
/// [`StorageError::NotSupported`], which is how a plain device answers.
///
/// # Implementors
///
/// - [`super::InMemoryBlockDevice`] - For testing
/// - [`super::FileBlockDevice`] - For disk images
/// - [`super::FaultyBlockDevice`] - For failure injection
pub trait BlockDevice: Send + Sync {
    /// Returns the device geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if the geometry cannot be determined.
    fn block_info(&self) -> StorageResult<BlockInfo>;

    /// Reads `buf.len()` bytes starting at byte `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The transfer is not block aligned
    /// - The transfer extends beyond the device
    /// - An I/O error occurs
    fn read_block(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()>;

    /// Writes `buf` starting at byte `offset`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`read_block`](Self::read_block).
    fn write_block(&mut self, offset: u64, buf: &[u8]) -> StorageResult<()>;

    /// Flushes completed writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the FVM slice size in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotSupported`] if the device is not FVM-backed.
    fn fvm_slice_size(&self) -> StorageResult<u64> {
        Err(StorageError::NotSupported)
    }

    /// Describes the virtual slices starting at `start_slice` as a list of
    /// contiguous runs. The first run always starts at `start_slice`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotSupported`] if the device is not FVM-backed.
    fn fvm_vslice_query(&self, start_slice: u64) -> StorageResult<Vec<VsliceRange>> {
        let _ = start_slice;
        Err(StorageError::NotSupported)
    }

    /// Allocates `length` virtual slices starting at `start_slice`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotSupported`] if the device is not FVM-backed.
    fn fvm_extend(&mut self, start_slice: u64, length: u64) -> StorageResult<()> {
        let _ = (start_slice, length);
        Err(StorageError::NotSupported)
    }
}

/// Checks that a transfer of `len` bytes at `offset` is block aligned and
/// fits on a device with the given geometry.
pub(crate) fn check_transfer(info: BlockInfo, offset: u64, len: usize) -> StorageResult<()> {
    let block_size = u64::from(info.block_size);
    if block_size == 0 || offset % block_size != 0 || (len as u64) % block_size != 0 {
        return Err(StorageError::Misaligned {
            offset,
            len,
            block_size: info.block_size,
        });
    }

    let size = info.size_bytes().unwrap_or(u64::MAX);
    let end = offset.checked_add(len as u64);
    match end {
        Some(end) if end <= size => Ok(()),
        _ => Err(StorageError::OutOfRange { offset, len, size }),
    }
}
