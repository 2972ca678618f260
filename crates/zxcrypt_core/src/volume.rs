//! Volume lifecycle: geometry setup, superblock creation, key wrapping and
//! propagation of the superblock to its redundant on-disk copies.

use crate::config::Config;
use crate::crypto::{Aead, Secret};
use crate::cursor::BlockCursor;
use crate::error::{VolumeError, VolumeResult};
use crate::keys::derive_wrap_material;
use crate::superblock::{Header, KeySlot, SlotLayout, GUID_LEN, METADATA_BLOCKS};
use crate::version::{Algorithms, Version};
use rand::RngCore;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroize;
use zxcrypt_storage::{BlockDevice, BlockInfo, StorageError};

/// Outcome of [`Volume::commit_block`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Copies that were rewritten.
    pub written: usize,
    /// Copies that already matched and were left alone.
    pub unchanged: usize,
    /// Copies whose write failed.
    pub failed: usize,
}

impl CommitSummary {
    /// Returns true if every copy now holds the committed superblock.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Unauthenticated description of a superblock, read without any key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    /// Instance GUID of the volume.
    pub instance_guid: Uuid,
    /// Format version.
    pub version: Version,
    /// Length of one key slot.
    pub slot_len: usize,
    /// Number of key slots per superblock.
    pub num_slots: usize,
}

/// A zxcrypt volume over a block device.
///
/// A volume starts out empty. [`init`](Self::init) reads the device
/// geometry and reserves the metadata area; afterwards either
/// [`create_block`](Self::create_block) builds a new superblock (the format
/// path) or [`unlock`](Self::unlock) recovers the data key from an existing
/// one (the open path).
///
/// Every error that could leave key material behind resets the volume.
///
/// # Example
///
/// ```rust
/// use zxcrypt_core::{Secret, Volume};
/// use zxcrypt_storage::InMemoryBlockDevice;
///
/// let device = InMemoryBlockDevice::new(4096, 64);
/// let root_key = Secret::random(32);
///
/// let mut volume = Volume::new(device.clone());
/// volume.format(&root_key, 0).unwrap();
///
/// let mut reopened = Volume::new(device);
/// reopened.unlock(&root_key, 0).unwrap();
/// assert_eq!(
///     reopened.data_key().unwrap().as_bytes(),
///     volume.data_key().unwrap().as_bytes()
/// );
/// ```
#[derive(Debug)]
pub struct Volume<D> {
    device: D,
    config: Config,
    block: Vec<u8>,
    reserved_blocks: u64,
    reserved_slices: u64,
    instance_guid: [u8; GUID_LEN],
    version: Option<Version>,
    layout: Option<SlotLayout>,
    data_key: Option<Secret>,
    data_iv: Option<Secret>,
}

impl<D: BlockDevice> Volume<D> {
    /// Creates an empty volume over `device` with the default configuration.
    pub fn new(device: D) -> Self {
        Self::with_config(device, Config::default())
    }

    /// Creates an empty volume over `device`.
    pub fn with_config(device: D, config: Config) -> Self {
        Self {
            device,
            config,
            block: Vec::new(),
            reserved_blocks: 0,
            reserved_slices: 0,
            instance_guid: [0; GUID_LEN],
            version: None,
            layout: None,
            data_key: None,
            data_iv: None,
        }
    }

    /// Clears all geometry and key material.
    pub fn reset(&mut self) {
        self.block.zeroize();
        self.reserved_blocks = 0;
        self.reserved_slices = 0;
        self.instance_guid.zeroize();
        self.version = None;
        self.layout = None;
        self.data_key = None;
        self.data_iv = None;
    }

    // Geometry

    /// Reads the device geometry, reserves the metadata area and allocates
    /// the superblock buffer.
    ///
    /// On an FVM partition the reservation is rounded up to whole slices and
    /// every slice up to and including the first data slice is allocated.
    ///
    /// # Errors
    ///
    /// - `NotSupported` if the reported geometry is unusable
    /// - `NoSpace` if a plain device has no room after the metadata
    /// - Storage errors from block info or FVM calls, other than
    ///   `NotSupported` from the FVM slice size query
    pub fn init(&mut self) -> VolumeResult<()> {
        self.reset();
        let result = self.init_geometry();
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn init_geometry(&mut self) -> VolumeResult<()> {
        let info = self.device.block_info()?;
        let block_size = u64::from(info.block_size);
        if block_size == 0 {
            return Err(VolumeError::not_supported("device reports zero block size"));
        }
        if info.size_bytes().is_none() {
            return Err(VolumeError::not_supported(format!(
                "device of {} blocks of {} bytes is too large",
                info.block_count, info.block_size
            )));
        }

        let block_len = usize::try_from(info.block_size)
            .map_err(|_| VolumeError::not_supported("block size exceeds address space"))?;
        let reserved_blocks = METADATA_BLOCKS
            .checked_mul(block_len as u64)
            .map(|bytes| bytes.div_ceil(block_size))
            .ok_or_else(|| VolumeError::out_of_range("metadata reservation"))?;

        match self.device.fvm_slice_size() {
            Ok(slice_size) => self.reserve_slices(info, reserved_blocks, slice_size)?,
            Err(StorageError::NotSupported) => {
                if info.block_count <= reserved_blocks {
                    return Err(VolumeError::no_space(format!(
                        "device has {} blocks, metadata needs {reserved_blocks} plus data",
                        info.block_count
                    )));
                }
                self.reserved_blocks = reserved_blocks;
                self.reserved_slices = 0;
            }
            Err(e) => return Err(e.into()),
        }

        self.block = vec![0u8; block_len];
        debug!(
            "Initialized volume: block_len={} reserved_blocks={} reserved_slices={}",
            block_len, self.reserved_blocks, self.reserved_slices
        );
        Ok(())
    }

    fn reserve_slices(
        &mut self,
        info: BlockInfo,
        reserved_blocks: u64,
        slice_size: u64,
    ) -> VolumeResult<()> {
        let block_size = u64::from(info.block_size);
        if slice_size == 0 || slice_size % block_size != 0 {
            return Err(VolumeError::not_supported(format!(
                "FVM slice size {slice_size} is not a multiple of block size {block_size}"
            )));
        }

        let blocks_per_slice = slice_size / block_size;
        let reserved_slices = reserved_blocks.div_ceil(blocks_per_slice);
        self.reserved_blocks = reserved_slices
            .checked_mul(blocks_per_slice)
            .ok_or_else(|| VolumeError::out_of_range("slice reservation"))?;
        self.reserved_slices = reserved_slices;

        let required = reserved_slices
            .checked_add(1)
            .ok_or_else(|| VolumeError::out_of_range("slice reservation"))?;
        self.ensure_slices(required)
    }

    /// Allocates every unallocated virtual slice in `[0, required)`.
    fn ensure_slices(&mut self, required: u64) -> VolumeResult<()> {
        let mut start = 0;
        while start < required {
            let ranges = self.device.fvm_vslice_query(start)?;
            let range = ranges
                .first()
                .filter(|range| range.count != 0)
                .ok_or_else(|| VolumeError::internal(format!("empty vslice query at {start}")))?;

            let len = range.count.min(required - start);
            if !range.allocated {
                debug!("Allocating slices [{}, {})", start, start + len);
                self.device.fvm_extend(start, len)?;
            }
            start += len;
        }
        Ok(())
    }

    // Superblock codec

    /// Selects the algorithm suite of `version` and lays out the key slots.
    ///
    /// # Errors
    ///
    /// Returns `BadState` before [`init`](Self::init) and `NotSupported` if
    /// the block cannot hold a single slot.
    pub fn configure(&mut self, version: Version) -> VolumeResult<()> {
        if self.block.is_empty() {
            return Err(VolumeError::bad_state("volume is not initialized"));
        }

        let layout = SlotLayout::new(self.block.len(), version.algorithms().slot_len())?;
        self.version = Some(version);
        self.layout = Some(layout);
        Ok(())
    }

    /// Fills the superblock with random bytes, writes a fresh header and
    /// generates a random data key and IV.
    ///
    /// # Errors
    ///
    /// Returns `BadState` before [`init`](Self::init), or any error from
    /// [`configure`](Self::configure).
    pub fn create_block(&mut self) -> VolumeResult<()> {
        if self.block.is_empty() {
            return Err(VolumeError::bad_state("volume is not initialized"));
        }

        rand::thread_rng().fill_bytes(&mut self.block);
        let version = self.config.version;
        self.configure(version)?;

        let guid = Uuid::new_v4();
        self.instance_guid = *guid.as_bytes();
        Header::new(self.instance_guid, version).write_to(&mut self.block)?;

        let algorithms = version.algorithms();
        self.data_key = Some(Secret::random(algorithms.cipher.key_len()));
        self.data_iv = Some(Secret::random(algorithms.cipher.iv_len()));

        debug!("Created superblock for instance {}", guid);
        Ok(())
    }

    /// Wraps the data key under `root_key` into `slot` of the in-memory
    /// superblock. Nothing is written to the device.
    ///
    /// # Errors
    ///
    /// - `BadState` if no data key is resident
    /// - `InvalidArgs` for a bad slot or root key length
    /// - `Internal` if the sealed slot disagrees with the layout
    pub fn seal_block(&mut self, root_key: &Secret, slot: KeySlot) -> VolumeResult<()> {
        let (layout, algorithms) = self.configured()?;
        let (data_key, data_iv) = match (&self.data_key, &self.data_iv) {
            (Some(key), Some(iv)) => (key, iv),
            _ => return Err(VolumeError::bad_state("no data key to seal")),
        };
        layout.slot_offset(slot)?;

        let wrap = derive_wrap_material(
            &algorithms,
            root_key,
            &self.instance_guid,
            slot,
            self.config.allow_weak_keys,
        )?;
        let ptext = Secret::concat(data_key, data_iv);

        let mut aead = Aead::init_seal(algorithms.aead, &wrap.key, wrap.iv.as_bytes())?;
        let (nonce, ctext) = {
            let view = layout.view(&self.block)?;
            aead.seal(ptext.as_bytes(), view.header())?
        };

        if nonce != wrap.nonce() {
            return Err(VolumeError::internal(format!(
                "AEAD sealed slot {slot} under an unexpected nonce"
            )));
        }
        if ctext.len() != layout.slot_len() {
            return Err(VolumeError::internal(format!(
                "sealed slot is {} bytes, expected {}",
                ctext.len(),
                layout.slot_len()
            )));
        }

        layout
            .view_mut(&mut self.block)?
            .slot_mut(slot)?
            .copy_from_slice(&ctext);
        Ok(())
    }

    /// Recovers the data key and IV from `slot` of the in-memory superblock.
    ///
    /// Parses the header, adopts its instance GUID and version, then opens
    /// the slot with the wrapping key derived from `root_key`.
    ///
    /// # Errors
    ///
    /// - `NotSupported` for a missing magic or unknown version
    /// - `InvalidArgs` for a bad slot or root key length
    /// - `Integrity` if the slot does not authenticate under `root_key`
    pub fn unseal_block(&mut self, root_key: &Secret, slot: KeySlot) -> VolumeResult<()> {
        let header = Header::parse(&self.block)?;
        self.instance_guid = header.instance_guid;
        let version = Version::from_u32(header.version)?;
        self.configure(version)?;
        let (layout, algorithms) = self.configured()?;

        let view = layout.view(&self.block)?;
        let sealed = view.slot(slot)?;
        let wrap = derive_wrap_material(
            &algorithms,
            root_key,
            &self.instance_guid,
            slot,
            self.config.allow_weak_keys,
        )?;

        let mut aead = Aead::init_open(algorithms.aead, &wrap.key, wrap.iv.as_bytes())?;
        let ptext = aead.open(wrap.nonce(), sealed, view.header())?;
        if ptext.len() != algorithms.wrapped_len() {
            return Err(VolumeError::internal(format!(
                "unwrapped {} bytes, expected {}",
                ptext.len(),
                algorithms.wrapped_len()
            )));
        }

        let (key, iv) = ptext.as_bytes().split_at(algorithms.cipher.key_len());
        self.data_key = Some(Secret::from_bytes(key));
        self.data_iv = Some(Secret::from_bytes(iv));
        Ok(())
    }

    /// Writes the in-memory superblock to every redundant copy.
    ///
    /// Copies that already hold identical bytes are skipped unless
    /// [`Config::skip_matching_copies`] is off. A failed copy is logged and
    /// the remaining copies are still written.
    ///
    /// # Errors
    ///
    /// Returns `BadState` if no superblock is configured, the first write
    /// error if no copy holds the superblock afterwards, or the flush error.
    pub fn commit_block(&mut self) -> VolumeResult<CommitSummary> {
        self.configured()?;

        let mut summary = CommitSummary::default();
        let mut first_error = None;
        let mut current = vec![0u8; self.block.len()];

        for offset in BlockCursor::new(self.block.len() as u64) {
            if self.config.skip_matching_copies {
                match self.device.read_block(offset, &mut current) {
                    Ok(()) if current == self.block => {
                        summary.unchanged += 1;
                        continue;
                    }
                    Ok(()) => {}
                    Err(e) => debug!("Failed to read superblock copy at {}: {}", offset, e),
                }
            }

            match self.device.write_block(offset, &self.block) {
                Ok(()) => summary.written += 1,
                Err(e) => {
                    warn!("Failed to write superblock copy at {}: {}", offset, e);
                    summary.failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        if summary.written + summary.unchanged == 0 {
            if let Some(e) = first_error {
                return Err(e.into());
            }
        }
        self.device.flush()?;

        debug!(
            "Committed superblock: written={} unchanged={} failed={}",
            summary.written, summary.unchanged, summary.failed
        );
        Ok(summary)
    }

    // Public entry points

    /// Initializes the device and formats it with a new superblock whose
    /// data key is sealed under `root_key` into `slot`.
    ///
    /// On success the volume is unlocked.
    ///
    /// # Errors
    ///
    /// Any error from the individual steps. The volume is reset on failure.
    pub fn format(&mut self, root_key: &Secret, slot: KeySlot) -> VolumeResult<CommitSummary> {
        let result = self.format_steps(root_key, slot);
        match &result {
            Ok(_) => info!("Formatted zxcrypt volume {}", self.instance_guid()),
            Err(_) => self.reset(),
        }
        result
    }

    fn format_steps(&mut self, root_key: &Secret, slot: KeySlot) -> VolumeResult<CommitSummary> {
        self.init()?;
        self.create_block()?;
        self.seal_block(root_key, slot)?;
        self.commit_block()
    }

    /// Recovers the data key by unsealing `slot` with `root_key`.
    ///
    /// Copies are tried in order and the first one that unseals wins; later
    /// copies are not read.
    ///
    /// # Errors
    ///
    /// Returns errors from [`init`](Self::init) unchanged. Otherwise every
    /// failure, whether I/O, format or authentication, is reported as
    /// `AccessDenied`.
    pub fn unlock(&mut self, root_key: &Secret, slot: KeySlot) -> VolumeResult<()> {
        self.init()?;

        for offset in BlockCursor::new(self.block.len() as u64) {
            if let Err(e) = self.device.read_block(offset, &mut self.block) {
                warn!("Failed to read superblock copy at {}: {}", offset, e);
                continue;
            }
            match self.unseal_block(root_key, slot) {
                Ok(()) => {
                    info!("Unlocked zxcrypt volume {}", self.instance_guid());
                    return Ok(());
                }
                Err(e) => debug!("Superblock copy at {} did not unseal: {}", offset, e),
            }
        }

        self.reset();
        Err(VolumeError::AccessDenied)
    }

    /// Wraps the resident data key under another root key into `slot` and
    /// commits.
    ///
    /// # Errors
    ///
    /// Returns `BadState` unless the volume is unlocked, plus any error from
    /// [`seal_block`](Self::seal_block) or [`commit_block`](Self::commit_block).
    pub fn enroll(&mut self, root_key: &Secret, slot: KeySlot) -> VolumeResult<CommitSummary> {
        if !self.is_unlocked() {
            return Err(VolumeError::bad_state("volume is locked"));
        }
        self.seal_block(root_key, slot)?;
        let summary = self.commit_block()?;
        info!("Enrolled key slot {}", slot);
        Ok(summary)
    }

    /// Overwrites `slot` with random bytes and commits, so no root key can
    /// open it again.
    ///
    /// # Errors
    ///
    /// Returns `BadState` if no superblock is configured, `InvalidArgs` for
    /// a bad slot, plus any error from [`commit_block`](Self::commit_block).
    pub fn revoke(&mut self, slot: KeySlot) -> VolumeResult<CommitSummary> {
        let (layout, _) = self.configured()?;
        {
            let mut view = layout.view_mut(&mut self.block)?;
            rand::thread_rng().fill_bytes(view.slot_mut(slot)?);
        }
        let summary = self.commit_block()?;
        info!("Revoked key slot {}", slot);
        Ok(summary)
    }

    /// Destroys every superblock copy by overwriting it with random bytes.
    ///
    /// All copies are attempted even if one fails. The volume is always
    /// reset afterwards.
    ///
    /// # Errors
    ///
    /// Returns `BadState` before [`init`](Self::init), otherwise the first
    /// write or flush error.
    pub fn shred(&mut self) -> VolumeResult<()> {
        if self.block.is_empty() {
            return Err(VolumeError::bad_state("volume is not initialized"));
        }

        rand::thread_rng().fill_bytes(&mut self.block);
        let mut first_error: Option<StorageError> = None;
        for offset in BlockCursor::new(self.block.len() as u64) {
            if let Err(e) = self.device.write_block(offset, &self.block) {
                warn!("Failed to shred superblock copy at {}: {}", offset, e);
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.device.flush() {
            warn!("Failed to flush after shred: {}", e);
            first_error.get_or_insert(e);
        }

        self.reset();
        match first_error {
            Some(e) => Err(e.into()),
            None => {
                info!("Shredded zxcrypt volume");
                Ok(())
            }
        }
    }

    /// Reads the header of the first readable superblock copy of `device`
    /// without any key.
    ///
    /// # Errors
    ///
    /// Returns the error of the first copy if no copy carries a usable
    /// header.
    pub fn inspect(device: &D) -> VolumeResult<HeaderInfo> {
        let info = device.block_info()?;
        let block_len = usize::try_from(info.block_size)
            .ok()
            .filter(|&len| len != 0)
            .ok_or_else(|| VolumeError::not_supported("unusable block size"))?;

        let mut block = vec![0u8; block_len];
        let mut first_error = None;
        for offset in BlockCursor::new(block_len as u64) {
            let parsed = device
                .read_block(offset, &mut block)
                .map_err(VolumeError::from)
                .and_then(|()| Self::describe(&block));
            match parsed {
                Ok(header) => return Ok(header),
                Err(e) => {
                    debug!("No header in superblock copy at {}: {}", offset, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        Err(first_error.unwrap_or_else(|| VolumeError::not_supported("not a zxcrypt device")))
    }

    fn describe(block: &[u8]) -> VolumeResult<HeaderInfo> {
        let header = Header::parse(block)?;
        let version = Version::from_u32(header.version)?;
        let layout = SlotLayout::new(block.len(), version.algorithms().slot_len())?;
        Ok(HeaderInfo {
            instance_guid: Uuid::from_bytes(header.instance_guid),
            version,
            slot_len: layout.slot_len(),
            num_slots: layout.num_slots(),
        })
    }

    // Accessors

    fn configured(&self) -> VolumeResult<(SlotLayout, Algorithms)> {
        match (self.layout, self.version) {
            (Some(layout), Some(version)) => Ok((layout, version.algorithms())),
            _ => Err(VolumeError::bad_state("volume has no configured superblock")),
        }
    }

    /// Returns the byte offset of `slot` within the superblock.
    ///
    /// # Errors
    ///
    /// Returns `BadState` if unconfigured, `InvalidArgs` for a slot past the
    /// last one and `OutOfRange` on overflow.
    pub fn slot_offset(&self, slot: KeySlot) -> VolumeResult<usize> {
        let (layout, _) = self.configured()?;
        layout.slot_offset(slot)
    }

    /// Returns the number of key slots, or 0 if unconfigured.
    pub fn num_slots(&self) -> usize {
        self.layout.map_or(0, |layout| layout.num_slots())
    }

    /// Returns the length of one key slot, or 0 if unconfigured.
    pub fn slot_len(&self) -> usize {
        self.layout.map_or(0, |layout| layout.slot_len())
    }

    /// Returns the superblock length, or 0 before [`init`](Self::init).
    pub fn block_len(&self) -> usize {
        self.block.len()
    }

    /// Returns the number of device blocks reserved for metadata.
    pub fn reserved_blocks(&self) -> u64 {
        self.reserved_blocks
    }

    /// Returns the number of FVM slices reserved for metadata, 0 on a plain
    /// device.
    pub fn reserved_slices(&self) -> u64 {
        self.reserved_slices
    }

    /// Returns the instance GUID, nil if none is loaded.
    pub fn instance_guid(&self) -> Uuid {
        Uuid::from_bytes(self.instance_guid)
    }

    /// Returns the configured version.
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the data key if unlocked.
    pub fn data_key(&self) -> Option<&Secret> {
        self.data_key.as_ref()
    }

    /// Returns the data IV if unlocked.
    pub fn data_iv(&self) -> Option<&Secret> {
        self.data_iv.as_ref()
    }

    /// Returns true if the data key is resident.
    pub fn is_unlocked(&self) -> bool {
        self.data_key.is_some() && self.data_iv.is_some()
    }

    /// Returns the in-memory superblock.
    pub fn block(&self) -> &[u8] {
        &self.block
    }

    /// Returns the underlying device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Returns the underlying device mutably.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Consumes the volume, returning the device.
    pub fn into_device(self) -> D {
        self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;
    use crate::superblock::{HEADER_LEN, MAGIC};
    use zxcrypt_storage::InMemoryBlockDevice;

    fn volume(block_size: u32, block_count: u64) -> Volume<InMemoryBlockDevice> {
        Volume::new(InMemoryBlockDevice::new(block_size, block_count))
    }

    fn created(block_size: u32) -> Volume<InMemoryBlockDevice> {
        let mut volume = volume(block_size, 64);
        volume.init().unwrap();
        volume.create_block().unwrap();
        volume
    }

    #[test]
    fn init_plain_device() {
        let mut volume = volume(4096, 16);
        volume.init().unwrap();
        assert_eq!(volume.block_len(), 4096);
        assert_eq!(volume.reserved_blocks(), 2);
        assert_eq!(volume.reserved_slices(), 0);
        assert_eq!(volume.num_slots(), 0);
    }

    #[test]
    fn init_without_room_for_data() {
        let mut volume = volume(4096, 2);
        assert_eq!(volume.init().unwrap_err().status(), Status::NoSpace);
        assert_eq!(volume.block_len(), 0);
    }

    #[test]
    fn init_fvm_rounds_to_slices() {
        let device = InMemoryBlockDevice::with_fvm(512, 1024, 8192);
        let mut volume = Volume::new(device.clone());
        volume.init().unwrap();

        assert_eq!(volume.reserved_slices(), 1);
        assert_eq!(volume.reserved_blocks(), 16);
        assert_eq!(device.allocated_slices(), vec![0, 1]);
    }

    #[test]
    fn init_fvm_keeps_allocated_slices() {
        let mut device = InMemoryBlockDevice::with_fvm(512, 1024, 8192);
        device.fvm_extend(1, 1).unwrap();

        let mut volume = Volume::new(device.clone());
        volume.init().unwrap();
        assert_eq!(device.allocated_slices(), vec![0, 1]);
    }

    #[test]
    fn configure_requires_init() {
        let mut volume = volume(4096, 16);
        assert_eq!(
            volume.configure(Version::DEFAULT).unwrap_err().status(),
            Status::BadState
        );
        assert_eq!(volume.create_block().unwrap_err().status(), Status::BadState);
        assert_eq!(volume.shred().unwrap_err().status(), Status::BadState);
    }

    #[test]
    fn configure_rejects_undersized_block() {
        let mut volume = volume(64, 16);
        volume.init().unwrap();
        assert_eq!(
            volume.configure(Version::DEFAULT).unwrap_err().status(),
            Status::NotSupported
        );
    }

    #[test]
    fn create_block_writes_header() {
        let volume = created(4096);
        let block = volume.block();
        assert_eq!(&block[..16], &MAGIC);
        assert_eq!(&block[16..32], volume.instance_guid().as_bytes());
        assert_eq!(&block[32..HEADER_LEN], &[0, 0, 0, 1]);
        assert_eq!(volume.num_slots(), (4096 - HEADER_LEN) / 96);
        assert_eq!(volume.data_key().unwrap().len(), 64);
        assert_eq!(volume.data_iv().unwrap().len(), 16);
    }

    #[test]
    fn created_guid_is_rfc4122_v4() {
        let volume = created(512);
        let guid = volume.instance_guid();
        let bytes = guid.as_bytes();
        assert_eq!(bytes[6] & 0xF0, 0x40);
        assert_eq!(bytes[8] & 0xC0, 0x80);
        assert_eq!(guid.get_version_num(), 4);
    }

    #[test]
    fn seal_then_unseal_in_memory() {
        let mut volume = created(4096);
        let root = Secret::random(32);
        let data_key = volume.data_key().unwrap().clone();
        let data_iv = volume.data_iv().unwrap().clone();

        volume.seal_block(&root, 2).unwrap();
        volume.data_key = None;
        volume.data_iv = None;
        volume.unseal_block(&root, 2).unwrap();

        assert_eq!(volume.data_key().unwrap().as_bytes(), data_key.as_bytes());
        assert_eq!(volume.data_iv().unwrap().as_bytes(), data_iv.as_bytes());
    }

    #[test]
    fn seal_only_touches_its_slot() {
        let mut volume = created(512);
        let before = volume.block().to_vec();
        volume.seal_block(&Secret::random(32), 1).unwrap();

        let start = volume.slot_offset(1).unwrap();
        let end = start + volume.slot_len();
        assert_eq!(&volume.block()[..start], &before[..start]);
        assert_eq!(&volume.block()[end..], &before[end..]);
        assert_ne!(&volume.block()[start..end], &before[start..end]);
    }

    #[test]
    fn unseal_wrong_slot_fails_integrity() {
        let mut volume = created(4096);
        let root = Secret::random(32);
        volume.seal_block(&root, 0).unwrap();
        assert_eq!(
            volume.unseal_block(&root, 1).unwrap_err().status(),
            Status::IoDataIntegrity
        );
    }

    #[test]
    fn tampered_header_fails_integrity() {
        let mut volume = created(4096);
        let root = Secret::random(32);
        volume.seal_block(&root, 0).unwrap();
        volume.block[20] ^= 0x01;
        assert_eq!(
            volume.unseal_block(&root, 0).unwrap_err().status(),
            Status::IoDataIntegrity
        );
    }

    #[test]
    fn seal_rejects_bad_arguments() {
        let mut volume = created(512);
        let slots = volume.num_slots() as u64;
        assert_eq!(
            volume
                .seal_block(&Secret::random(32), slots)
                .unwrap_err()
                .status(),
            Status::InvalidArgs
        );
        assert_eq!(
            volume
                .seal_block(&Secret::random(24), 0)
                .unwrap_err()
                .status(),
            Status::InvalidArgs
        );
    }

    #[test]
    fn seal_requires_data_key() {
        let mut volume = volume(4096, 16);
        volume.init().unwrap();
        volume.configure(Version::DEFAULT).unwrap();
        assert_eq!(
            volume
                .seal_block(&Secret::random(32), 0)
                .unwrap_err()
                .status(),
            Status::BadState
        );
    }

    #[test]
    fn slot_offsets() {
        let volume = created(4096);
        assert_eq!(volume.slot_offset(0).unwrap(), HEADER_LEN);
        assert_eq!(volume.slot_offset(1).unwrap(), HEADER_LEN + 96);
        assert_eq!(
            volume
                .slot_offset(volume.num_slots() as u64)
                .unwrap_err()
                .status(),
            Status::InvalidArgs
        );
    }

    #[test]
    fn commit_skips_matching_copies() {
        let mut volume = created(4096);
        volume.seal_block(&Secret::random(32), 0).unwrap();

        let first = volume.commit_block().unwrap();
        assert_eq!(first.written, 2);
        assert_eq!(first.unchanged, 0);

        let second = volume.commit_block().unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.unchanged, 2);
        assert!(second.is_complete());
    }

    #[test]
    fn commit_rewrites_when_configured() {
        let device = InMemoryBlockDevice::new(4096, 16);
        let mut volume = Volume::with_config(device, Config::new().skip_matching_copies(false));
        volume.init().unwrap();
        volume.create_block().unwrap();
        volume.commit_block().unwrap();
        assert_eq!(volume.commit_block().unwrap().written, 2);
    }

    #[test]
    fn reset_clears_state() {
        let mut volume = created(4096);
        volume.reset();
        assert!(!volume.is_unlocked());
        assert_eq!(volume.block_len(), 0);
        assert_eq!(volume.num_slots(), 0);
        assert!(volume.instance_guid().is_nil());
        assert_eq!(volume.version(), None);
    }

    #[test]
    fn revoke_requires_superblock() {
        let mut volume = volume(4096, 16);
        assert_eq!(volume.revoke(0).unwrap_err().status(), Status::BadState);
    }
}
