//! On-disk superblock format.
//!
//! ## Layout
//!
//! ```text
//! 0                       magic (16 bytes)
//! 16                      instance GUID (16 bytes)
//! 32                      version (u32, big-endian)
//! 36 + slot * slot_len    key slot: AEAD(data key || data IV), AAD = bytes [0, 36)
//! ...                     random filler up to the block length
//! ```
//!
//! [`SlotLayout`] computes the slot geometry for a block length and suite;
//! [`SuperblockView`] and [`SuperblockViewMut`] expose the header, slots
//! and filler of a block buffer as bounds-checked byte ranges.

use crate::error::{VolumeError, VolumeResult};
use crate::version::Version;
use std::ops::Range;

/// Index of a key slot.
pub type KeySlot = u64;

/// Marks a block as a zxcrypt superblock.
pub const MAGIC: [u8; 16] = [
    0x5f, 0xe8, 0xf8, 0x00, 0xb3, 0x6d, 0x11, 0xe7, 0x80, 0x7a, 0x78, 0x63, 0x72, 0x79, 0x70, 0x74,
];

/// Length of the instance GUID.
pub const GUID_LEN: usize = 16;

/// Length of the version field.
pub const VERSION_LEN: usize = 4;

/// Length of the authenticated header preceding the key slots.
pub const HEADER_LEN: usize = MAGIC.len() + GUID_LEN + VERSION_LEN;

/// Number of redundant superblock copies.
pub const METADATA_BLOCKS: u64 = 2;

const GUID_OFFSET: usize = MAGIC.len();
const VERSION_OFFSET: usize = GUID_OFFSET + GUID_LEN;

/// The fixed header of a superblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Identifies the volume instance; salts key derivation.
    pub instance_guid: [u8; GUID_LEN],
    /// Raw version field. Parsed separately so that an unknown version is
    /// reported as such rather than as a bad header.
    pub version: u32,
}

impl Header {
    /// Creates a header for a new volume.
    #[must_use]
    pub fn new(instance_guid: [u8; GUID_LEN], version: Version) -> Self {
        Self {
            instance_guid,
            version: version.as_u32(),
        }
    }

    /// Parses the header at the start of `block`.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` if the block is shorter than a header or does
    /// not start with [`MAGIC`].
    pub fn parse(block: &[u8]) -> VolumeResult<Self> {
        if block.len() < HEADER_LEN {
            return Err(VolumeError::not_supported(format!(
                "block of {} bytes is shorter than the superblock header",
                block.len()
            )));
        }
        if block[..MAGIC.len()] != MAGIC {
            return Err(VolumeError::not_supported("not a zxcrypt device"));
        }

        let mut instance_guid = [0u8; GUID_LEN];
        instance_guid.copy_from_slice(&block[GUID_OFFSET..VERSION_OFFSET]);

        let mut version = [0u8; VERSION_LEN];
        version.copy_from_slice(&block[VERSION_OFFSET..HEADER_LEN]);

        Ok(Self {
            instance_guid,
            version: u32::from_be_bytes(version),
        })
    }

    /// Serializes the header into the start of `block`.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the block is shorter than a header.
    pub fn write_to(&self, block: &mut [u8]) -> VolumeResult<()> {
        let header = block
            .get_mut(..HEADER_LEN)
            .ok_or_else(|| VolumeError::out_of_range("block is shorter than the header"))?;

        header[..GUID_OFFSET].copy_from_slice(&MAGIC);
        header[GUID_OFFSET..VERSION_OFFSET].copy_from_slice(&self.instance_guid);
        header[VERSION_OFFSET..].copy_from_slice(&self.version.to_be_bytes());
        Ok(())
    }
}

/// Geometry of the key slots within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    block_len: usize,
    slot_len: usize,
    num_slots: usize,
}

impl SlotLayout {
    /// Fits as many `slot_len`-byte slots after the header as a block of
    /// `block_len` bytes allows.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` if not even one slot fits.
    pub fn new(block_len: usize, slot_len: usize) -> VolumeResult<Self> {
        if slot_len == 0 {
            return Err(VolumeError::internal("key slots cannot be empty"));
        }

        let num_slots = block_len
            .checked_sub(HEADER_LEN)
            .map_or(0, |space| space / slot_len);
        if num_slots == 0 {
            return Err(VolumeError::not_supported(format!(
                "block of {block_len} bytes cannot hold a {slot_len}-byte key slot"
            )));
        }

        Ok(Self {
            block_len,
            slot_len,
            num_slots,
        })
    }

    /// Returns the block length this layout was computed for.
    #[must_use]
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Returns the length of one slot.
    #[must_use]
    pub fn slot_len(&self) -> usize {
        self.slot_len
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Returns the byte offset of `slot` within the block.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgs` if `slot` is not below [`num_slots`](Self::num_slots)
    /// and `OutOfRange` if the offset overflows.
    pub fn slot_offset(&self, slot: KeySlot) -> VolumeResult<usize> {
        let index = usize::try_from(slot)
            .ok()
            .filter(|&index| index < self.num_slots)
            .ok_or_else(|| {
                VolumeError::invalid_args(format!(
                    "key slot {slot} out of range, volume has {}",
                    self.num_slots
                ))
            })?;

        index
            .checked_mul(self.slot_len)
            .and_then(|offset| offset.checked_add(HEADER_LEN))
            .ok_or_else(|| VolumeError::out_of_range(format!("offset of key slot {slot}")))
    }

    fn slot_range(&self, slot: KeySlot) -> VolumeResult<Range<usize>> {
        let start = self.slot_offset(slot)?;
        let end = start
            .checked_add(self.slot_len)
            .ok_or_else(|| VolumeError::out_of_range(format!("end of key slot {slot}")))?;
        Ok(start..end)
    }

    fn filler_start(&self) -> usize {
        // Cannot overflow: new() established it fits in block_len
        HEADER_LEN + self.num_slots * self.slot_len
    }

    fn check_len(&self, len: usize) -> VolumeResult<()> {
        if len != self.block_len {
            return Err(VolumeError::internal(format!(
                "block buffer is {len} bytes, layout expects {}",
                self.block_len
            )));
        }
        Ok(())
    }

    /// Views `block` through this layout.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the buffer length differs from the layout's.
    pub fn view<'a>(&self, block: &'a [u8]) -> VolumeResult<SuperblockView<'a>> {
        self.check_len(block.len())?;
        Ok(SuperblockView {
            layout: *self,
            block,
        })
    }

    /// Views `block` mutably through this layout.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the buffer length differs from the layout's.
    pub fn view_mut<'a>(&self, block: &'a mut [u8]) -> VolumeResult<SuperblockViewMut<'a>> {
        self.check_len(block.len())?;
        Ok(SuperblockViewMut {
            layout: *self,
            block,
        })
    }
}

/// Read-only view of a superblock buffer.
#[derive(Debug, Clone, Copy)]
pub struct SuperblockView<'a> {
    layout: SlotLayout,
    block: &'a [u8],
}

impl<'a> SuperblockView<'a> {
    /// Returns the header bytes, which are the AAD of every slot.
    #[must_use]
    pub fn header(&self) -> &'a [u8] {
        &self.block[..HEADER_LEN]
    }

    /// Returns the bytes of `slot`.
    ///
    /// # Errors
    ///
    /// See [`SlotLayout::slot_offset`].
    pub fn slot(&self, slot: KeySlot) -> VolumeResult<&'a [u8]> {
        let range = self.layout.slot_range(slot)?;
        Ok(&self.block[range])
    }

    /// Returns the bytes after the last slot.
    #[must_use]
    pub fn filler(&self) -> &'a [u8] {
        &self.block[self.layout.filler_start()..]
    }
}

/// Mutable view of a superblock buffer.
#[derive(Debug)]
pub struct SuperblockViewMut<'a> {
    layout: SlotLayout,
    block: &'a mut [u8],
}

impl SuperblockViewMut<'_> {
    /// Returns the header bytes.
    #[must_use]
    pub fn header(&self) -> &[u8] {
        &self.block[..HEADER_LEN]
    }

    /// Returns the bytes of `slot` for writing.
    ///
    /// # Errors
    ///
    /// See [`SlotLayout::slot_offset`].
    pub fn slot_mut(&mut self, slot: KeySlot) -> VolumeResult<&mut [u8]> {
        let range = self.layout.slot_range(slot)?;
        Ok(&mut self.block[range])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;

    #[test]
    fn magic_spells_zxcrypt() {
        assert_eq!(&MAGIC[9..], b"zxcrypt");
        assert_eq!(HEADER_LEN, 36);
    }

    #[test]
    fn header_layout_is_bit_exact() {
        let guid = [0xAA; GUID_LEN];
        let mut block = vec![0u8; 64];
        Header::new(guid, Version::Aes256XtsSha256)
            .write_to(&mut block)
            .unwrap();

        assert_eq!(&block[..16], &MAGIC);
        assert_eq!(&block[16..32], &guid);
        assert_eq!(&block[32..36], &[0, 0, 0, 1]);
        assert_eq!(&block[36..], &[0u8; 28]);

        let parsed = Header::parse(&block).unwrap();
        assert_eq!(parsed.instance_guid, guid);
        assert_eq!(parsed.version, 1);
    }

    #[test]
    fn bad_magic_not_supported() {
        let mut block = vec![0u8; 64];
        Header::new([1; GUID_LEN], Version::DEFAULT)
            .write_to(&mut block)
            .unwrap();
        block[3] ^= 0x01;
        assert_eq!(
            Header::parse(&block).unwrap_err().status(),
            Status::NotSupported
        );
        assert_eq!(
            Header::parse(&[0u8; 20]).unwrap_err().status(),
            Status::NotSupported
        );
    }

    #[test]
    fn layout_counts_slots() {
        let layout = SlotLayout::new(4096, 96).unwrap();
        assert_eq!(layout.num_slots(), (4096 - 36) / 96);
        assert_eq!(layout.slot_offset(0).unwrap(), 36);
        assert_eq!(layout.slot_offset(2).unwrap(), 36 + 192);

        let exact = SlotLayout::new(HEADER_LEN + 96, 96).unwrap();
        assert_eq!(exact.num_slots(), 1);
    }

    #[test]
    fn undersized_block_not_supported() {
        let err = SlotLayout::new(HEADER_LEN + 95, 96).unwrap_err();
        assert_eq!(err.status(), Status::NotSupported);
        let err = SlotLayout::new(10, 96).unwrap_err();
        assert_eq!(err.status(), Status::NotSupported);
    }

    #[test]
    fn slot_index_is_bounds_checked() {
        let layout = SlotLayout::new(512, 96).unwrap();
        assert_eq!(layout.num_slots(), 4);
        assert_eq!(
            layout.slot_offset(4).unwrap_err().status(),
            Status::InvalidArgs
        );
        assert_eq!(
            layout.slot_offset(u64::MAX).unwrap_err().status(),
            Status::InvalidArgs
        );
    }

    #[test]
    fn views_split_block() {
        let layout = SlotLayout::new(512, 96).unwrap();
        let mut block = vec![0u8; 512];
        {
            let mut view = layout.view_mut(&mut block).unwrap();
            view.slot_mut(1).unwrap().fill(0x11);
        }

        let view = layout.view(&block).unwrap();
        assert_eq!(view.header().len(), HEADER_LEN);
        assert_eq!(view.slot(1).unwrap(), &[0x11; 96][..]);
        assert!(view.slot(0).unwrap().iter().all(|&b| b == 0));
        assert_eq!(view.filler().len(), 512 - HEADER_LEN - 4 * 96);
    }

    #[test]
    fn view_rejects_wrong_length() {
        let layout = SlotLayout::new(512, 96).unwrap();
        assert_eq!(
            layout.view(&[0u8; 256]).unwrap_err().status(),
            Status::Internal
        );
    }
}
