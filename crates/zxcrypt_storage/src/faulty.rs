//! Block device wrapper that injects I/O failures.
//!
//! Used to exercise the multi-copy loops of the volume layer: a read or
//! write at a chosen offset fails with [`StorageError::Injected`] while
//! every other transfer passes through to the wrapped device.
//!
//! ## Usage
//!
//! ```rust
//! use zxcrypt_storage::{BlockDevice, FaultyBlockDevice, InMemoryBlockDevice};
//!
//! let mut device = FaultyBlockDevice::new(InMemoryBlockDevice::new(512, 4));
//! device.fail_writes_at(512);
//!
//! assert!(device.write_block(0, &[0u8; 512]).is_ok());
//! assert!(device.write_block(512, &[0u8; 512]).is_err());
//! ```

use crate::device::{BlockDevice, BlockInfo, VsliceRange};
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::trace;

/// A block device that fails selected transfers.
#[derive(Debug)]
pub struct FaultyBlockDevice<D> {
    inner: D,
    read_faults: Mutex<BTreeSet<u64>>,
    write_faults: Mutex<BTreeSet<u64>>,
    fail_all_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl<D: BlockDevice> FaultyBlockDevice<D> {
    /// Wraps `inner` with no faults configured.
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            read_faults: Mutex::new(BTreeSet::new()),
            write_faults: Mutex::new(BTreeSet::new()),
            fail_all_writes: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Makes reads starting at byte `offset` fail.
    pub fn fail_reads_at(&self, offset: u64) {
        self.read_faults.lock().insert(offset);
    }

    /// Makes writes starting at byte `offset` fail.
    pub fn fail_writes_at(&self, offset: u64) {
        self.write_faults.lock().insert(offset);
    }

    /// Sets whether every write fails.
    pub fn set_fail_all_writes(&self, fail: bool) {
        self.fail_all_writes.store(fail, Ordering::SeqCst);
    }

    /// Removes all configured faults.
    pub fn clear_faults(&self) {
        self.read_faults.lock().clear();
        self.write_faults.lock().clear();
        self.fail_all_writes.store(false, Ordering::SeqCst);
    }

    /// Returns the number of reads that reached the wrapped device.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Returns the number of writes that reached the wrapped device.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns the wrapped device.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Unwraps the device.
    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: BlockDevice> BlockDevice for FaultyBlockDevice<D> {
    fn block_info(&self) -> StorageResult<BlockInfo> {
        self.inner.block_info()
    }

    fn read_block(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
        if self.read_faults.lock().contains(&offset) {
            trace!(offset, "injecting read failure");
            return Err(StorageError::Injected { offset });
        }
        self.inner.read_block(offset, buf)?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn write_block(&mut self, offset: u64, buf: &[u8]) -> StorageResult<()> {
        if self.fail_all_writes.load(Ordering::SeqCst) || self.write_faults.lock().contains(&offset)
        {
            trace!(offset, "injecting write failure");
            return Err(StorageError::Injected { offset });
        }
        self.inner.write_block(offset, buf)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.flush()
    }

    fn fvm_slice_size(&self) -> StorageResult<u64> {
        self.inner.fvm_slice_size()
    }

    fn fvm_vslice_query(&self, start_slice: u64) -> StorageResult<Vec<VsliceRange>> {
        self.inner.fvm_vslice_query(start_slice)
    }

    fn fvm_extend(&mut self, start_slice: u64, length: u64) -> StorageResult<()> {
        self.inner.fvm_extend(start_slice, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryBlockDevice;

    #[test]
    fn faults_only_hit_configured_offsets() {
        let mut device = FaultyBlockDevice::new(InMemoryBlockDevice::new(512, 4));
        device.fail_reads_at(1024);
        device.fail_writes_at(512);

        let mut buf = vec![0u8; 512];
        assert!(device.read_block(0, &mut buf).is_ok());
        assert!(matches!(
            device.read_block(1024, &mut buf),
            Err(StorageError::Injected { offset: 1024 })
        ));

        assert!(device.write_block(0, &buf).is_ok());
        assert!(device.write_block(512, &buf).is_err());
        assert_eq!(device.write_count(), 1);
        assert_eq!(device.read_count(), 1);
    }

    #[test]
    fn clear_faults_restores_io() {
        let mut device = FaultyBlockDevice::new(InMemoryBlockDevice::new(512, 4));
        device.set_fail_all_writes(true);
        assert!(device.write_block(0, &[1u8; 512]).is_err());

        device.clear_faults();
        assert!(device.write_block(0, &[1u8; 512]).is_ok());
        assert_eq!(device.inner().block(0), vec![1u8; 512]);
    }

    #[test]
    fn fvm_calls_pass_through() {
        let mut device = FaultyBlockDevice::new(InMemoryBlockDevice::with_fvm(512, 64, 8192));
        assert_eq!(device.fvm_slice_size().unwrap(), 8192);
        device.fvm_extend(0, 1).unwrap();
        assert_eq!(device.into_inner().allocated_slices(), vec![0]);
    }
}
