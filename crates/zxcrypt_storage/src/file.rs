//! File-backed block device for disk images.

use crate::device::{check_transfer, BlockDevice, BlockInfo};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A block device stored in a regular file.
///
/// The file length must be a whole number of blocks. The device is always
/// plain: FVM calls report [`StorageError::NotSupported`].
///
/// # Durability
///
/// - `flush()` calls `File::sync_all()` so written blocks reach the disk
///
/// # Example
///
/// ```no_run
/// use zxcrypt_storage::{BlockDevice, FileBlockDevice};
/// use std::path::Path;
///
/// let mut device = FileBlockDevice::create(Path::new("disk.img"), 4096, 256).unwrap();
/// device.write_block(0, &[0u8; 4096]).unwrap();
/// device.flush().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBlockDevice {
    path: PathBuf,
    file: RwLock<File>,
    info: BlockInfo,
}

impl FileBlockDevice {
    /// Creates a zero-filled image of `block_count` blocks, replacing any
    /// existing file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or sized.
    pub fn create(path: &Path, block_size: u32, block_count: u64) -> StorageResult<Self> {
        let info = BlockInfo {
            block_size,
            block_count,
        };
        let len = info.size_bytes().ok_or(StorageError::OutOfRange {
            offset: 0,
            len: 0,
            size: u64::MAX,
        })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(len)?;
        file.sync_all()?;

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            info,
        })
    }

    /// Opens an existing image, interpreting it as blocks of `block_size`
    /// bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its length is not a
    /// whole number of blocks.
    pub fn open(path: &Path, block_size: u32) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();

        if block_size == 0 || len % u64::from(block_size) != 0 {
            return Err(StorageError::Misaligned {
                offset: 0,
                len: len as usize,
                block_size,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            info: BlockInfo {
                block_size,
                block_count: len / u64::from(block_size),
            },
        })
    }

    /// Returns the path to the image file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockDevice for FileBlockDevice {
    fn block_info(&self) -> StorageResult<BlockInfo> {
        Ok(self.info)
    }

    fn read_block(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
        check_transfer(self.info, offset, buf.len())?;

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&mut self, offset: u64, buf: &[u8]) -> StorageResult<()> {
        check_transfer(self.info, offset, buf.len())?;

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        let mut file = self.file.write();
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}
