//! In-memory block device for testing.

use crate::device::{check_transfer, BlockDevice, BlockInfo, VsliceRange};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug)]
struct FvmState {
    slice_size: u64,
    slice_count: u64,
    allocated: BTreeSet<u64>,
}

impl FvmState {
    fn check_mapped(&self, offset: u64, len: usize) -> StorageResult<()> {
        if len == 0 {
            return Ok(());
        }
        let first = offset / self.slice_size;
        let last = (offset + len as u64 - 1) / self.slice_size;
        match (first..=last).find(|slice| !self.allocated.contains(slice)) {
            Some(slice) => Err(StorageError::Unmapped { slice }),
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
struct Disk {
    info: BlockInfo,
    data: Vec<u8>,
    fvm: Option<FvmState>,
}

/// An in-memory block device.
///
/// Clones share the same backing store, so two volume sessions can be
/// opened over one simulated disk.
///
/// The device is plain by default. [`with_fvm`](Self::with_fvm) makes it
/// behave like an FVM partition whose virtual slices start out unallocated;
/// I/O touching an unallocated slice fails with [`StorageError::Unmapped`].
///
/// # Example
///
/// ```rust
/// use zxcrypt_storage::{BlockDevice, InMemoryBlockDevice};
///
/// let device = InMemoryBlockDevice::new(4096, 16);
/// let info = device.block_info().unwrap();
/// assert_eq!(info.block_size, 4096);
/// assert_eq!(info.block_count, 16);
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryBlockDevice {
    disk: Arc<RwLock<Disk>>,
}

impl InMemoryBlockDevice {
    /// Creates a zero-filled plain device.
    #[must_use]
    pub fn new(block_size: u32, block_count: u64) -> Self {
        let len = u64::from(block_size) * block_count;
        Self {
            disk: Arc::new(RwLock::new(Disk {
                info: BlockInfo {
                    block_size,
                    block_count,
                },
                data: vec![0u8; len as usize],
                fvm: None,
            })),
        }
    }

    /// Creates a zero-filled FVM partition with no slices allocated.
    ///
    /// `slice_size` must be a non-zero multiple of `block_size`.
    #[must_use]
    pub fn with_fvm(block_size: u32, block_count: u64, slice_size: u64) -> Self {
        let device = Self::new(block_size, block_count);
        {
            let mut disk = device.disk.write();
            let len = disk.data.len() as u64;
            disk.fvm = Some(FvmState {
                slice_size,
                slice_count: len.div_ceil(slice_size),
                allocated: BTreeSet::new(),
            });
        }
        device
    }

    /// Returns a copy of all data on the device.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.disk.read().data.clone()
    }

    /// Returns a copy of the block at block index `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is past the end of the device.
    #[must_use]
    pub fn block(&self, index: u64) -> Vec<u8> {
        let disk = self.disk.read();
        let size = disk.info.block_size as usize;
        let start = index as usize * size;
        disk.data[start..start + size].to_vec()
    }

    /// Returns the allocated virtual slices, or an empty list for a plain
    /// device.
    #[must_use]
    pub fn allocated_slices(&self) -> Vec<u64> {
        self.disk
            .read()
            .fvm
            .as_ref()
            .map(|fvm| fvm.allocated.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl BlockDevice for InMemoryBlockDevice {
    fn block_info(&self) -> StorageResult<BlockInfo> {
        Ok(self.disk.read().info)
    }

    fn read_block(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
        let disk = self.disk.read();
        check_transfer(disk.info, offset, buf.len())?;
        if let Some(fvm) = &disk.fvm {
            fvm.check_mapped(offset, buf.len())?;
        }

        let start = offset as usize;
        buf.copy_from_slice(&disk.data[start..start + buf.len()]);
        Ok(())
    }

    fn write_block(&mut self, offset: u64, buf: &[u8]) -> StorageResult<()> {
        let mut disk = self.disk.write();
        check_transfer(disk.info, offset, buf.len())?;
        if let Some(fvm) = &disk.fvm {
            fvm.check_mapped(offset, buf.len())?;
        }

        let start = offset as usize;
        disk.data[start..start + buf.len()].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        // Nothing is buffered
        Ok(())
    }

    fn fvm_slice_size(&self) -> StorageResult<u64> {
        self.disk
            .read()
            .fvm
            .as_ref()
            .map(|fvm| fvm.slice_size)
            .ok_or(StorageError::NotSupported)
    }

    fn fvm_vslice_query(&self, start_slice: u64) -> StorageResult<Vec<VsliceRange>> {
        let disk = self.disk.read();
        let fvm = disk.fvm.as_ref().ok_or(StorageError::NotSupported)?;
        if start_slice >= fvm.slice_count {
            return Err(StorageError::Unmapped { slice: start_slice });
        }

        let mut ranges: Vec<VsliceRange> = Vec::new();
        for slice in start_slice..fvm.slice_count {
            let allocated = fvm.allocated.contains(&slice);
            match ranges.last_mut() {
                Some(range) if range.allocated == allocated => range.count += 1,
                _ => ranges.push(VsliceRange {
                    allocated,
                    count: 1,
                }),
            }
        }
        Ok(ranges)
    }

    fn fvm_extend(&mut self, start_slice: u64, length: u64) -> StorageResult<()> {
        let mut disk = self.disk.write();
        let size = disk.data.len() as u64;
        let fvm = disk.fvm.as_mut().ok_or(StorageError::NotSupported)?;

        let end = start_slice.checked_add(length);
        match end {
            Some(end) if end <= fvm.slice_count => {
                fvm.allocated.extend(start_slice..end);
                Ok(())
            }
            _ => Err(StorageError::OutOfRange {
                offset: start_slice.saturating_mul(fvm.slice_size),
                len: length.saturating_mul(fvm.slice_size) as usize,
                size,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_zeroed() {
        let device = InMemoryBlockDevice::new(512, 4);
        assert_eq!(device.data(), vec![0u8; 2048]);
        assert_eq!(
            device.block_info().unwrap(),
            BlockInfo {
                block_size: 512,
                block_count: 4
            }
        );
    }

    #[test]
    fn memory_write_then_read() {
        let mut device = InMemoryBlockDevice::new(512, 4);
        device.write_block(1024, &[7u8; 512]).unwrap();

        let mut buf = vec![0u8; 512];
        device.read_block(1024, &mut buf).unwrap();
        assert_eq!(buf, vec![7u8; 512]);
        assert_eq!(device.block(2), vec![7u8; 512]);
        assert_eq!(device.block(1), vec![0u8; 512]);
    }

    #[test]
    fn memory_clones_share_storage() {
        let mut first = InMemoryBlockDevice::new(512, 2);
        let second = first.clone();

        first.write_block(0, &[9u8; 512]).unwrap();
        assert_eq!(second.block(0), vec![9u8; 512]);
    }

    #[test]
    fn memory_read_past_end_fails() {
        let device = InMemoryBlockDevice::new(512, 2);
        let mut buf = vec![0u8; 512];
        let result = device.read_block(1024, &mut buf);
        assert!(matches!(result, Err(StorageError::OutOfRange { .. })));
    }

    #[test]
    fn memory_misaligned_write_fails() {
        let mut device = InMemoryBlockDevice::new(512, 2);
        let result = device.write_block(3, &[0u8; 512]);
        assert!(matches!(result, Err(StorageError::Misaligned { .. })));
    }

    #[test]
    fn plain_device_rejects_fvm_calls() {
        let mut device = InMemoryBlockDevice::new(512, 2);
        assert!(matches!(
            device.fvm_slice_size(),
            Err(StorageError::NotSupported)
        ));
        assert!(matches!(
            device.fvm_vslice_query(0),
            Err(StorageError::NotSupported)
        ));
        assert!(matches!(
            device.fvm_extend(0, 1),
            Err(StorageError::NotSupported)
        ));
        assert!(device.allocated_slices().is_empty());
    }

    #[test]
    fn fvm_io_requires_allocated_slice() {
        let mut device = InMemoryBlockDevice::with_fvm(512, 64, 8192);
        assert_eq!(device.fvm_slice_size().unwrap(), 8192);

        let result = device.write_block(0, &[1u8; 512]);
        assert!(matches!(result, Err(StorageError::Unmapped { slice: 0 })));

        device.fvm_extend(0, 1).unwrap();
        device.write_block(0, &[1u8; 512]).unwrap();

        // Block 16 lives in slice 1, still unmapped
        let mut buf = vec![0u8; 512];
        let result = device.read_block(16 * 512, &mut buf);
        assert!(matches!(result, Err(StorageError::Unmapped { slice: 1 })));
    }

    #[test]
    fn fvm_query_reports_runs() {
        let mut device = InMemoryBlockDevice::with_fvm(512, 64, 8192);
        // 4 slices in total
        device.fvm_extend(1, 2).unwrap();

        let ranges = device.fvm_vslice_query(0).unwrap();
        assert_eq!(
            ranges,
            vec![
                VsliceRange {
                    allocated: false,
                    count: 1
                },
                VsliceRange {
                    allocated: true,
                    count: 2
                },
                VsliceRange {
                    allocated: false,
                    count: 1
                },
            ]
        );

        let ranges = device.fvm_vslice_query(2).unwrap();
        assert_eq!(ranges[0], VsliceRange { allocated: true, count: 1 });
        assert_eq!(device.allocated_slices(), vec![1, 2]);
    }

    #[test]
    fn fvm_extend_past_end_fails() {
        let mut device = InMemoryBlockDevice::with_fvm(512, 64, 8192);
        assert!(device.fvm_extend(3, 2).is_err());
        assert!(device.fvm_vslice_query(4).is_err());
    }
}
