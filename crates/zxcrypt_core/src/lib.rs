//! # zxcrypt core
//!
//! Volume management for zxcrypt encrypted block devices.
//!
//! A zxcrypt device starts with redundant copies of a **superblock**: a
//! header carrying a magic value, a per-volume instance GUID and a format
//! version, followed by **key slots**. Each slot holds the volume's data key
//! and IV, sealed with AES-128-GCM-SIV under a wrapping key that HKDF derives
//! from a caller-supplied root key, the instance GUID and the slot index.
//! Any root key enrolled in any slot unlocks the same data key.
//!
//! This crate provides:
//! - [`Volume`]: init, format, unlock, enroll, revoke and shred
//! - [`SlotLayout`] and its views: bounds-checked superblock parsing
//! - [`derive_wrap_material`]: per-slot wrapping key derivation
//! - [`crypto`]: AEAD and HKDF bindings with zeroizing secrets
//!
//! Encrypting device data with the unwrapped data key is left to the I/O
//! path above this crate.
//!
//! ## Example
//!
//! ```rust
//! use zxcrypt_core::{Secret, Volume};
//! use zxcrypt_storage::InMemoryBlockDevice;
//!
//! let device = InMemoryBlockDevice::new(4096, 64);
//! let root_key = Secret::random(32);
//!
//! let mut volume = Volume::new(device.clone());
//! volume.format(&root_key, 0).unwrap();
//! assert_eq!(volume.reserved_blocks(), 2);
//!
//! let mut reopened = Volume::new(device);
//! reopened.unlock(&root_key, 0).unwrap();
//! assert!(reopened.is_unlocked());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod crypto;
mod cursor;
mod error;
mod keys;
mod superblock;
mod version;
mod volume;

pub use config::Config;
pub use crypto::Secret;
pub use cursor::{BlockCursor, Step};
pub use error::{Status, VolumeError, VolumeResult};
pub use keys::{derive_wrap_material, WrapMaterial, STRONG_KEY_LEN, WEAK_KEY_LEN};
pub use superblock::{
    Header, KeySlot, SlotLayout, SuperblockView, SuperblockViewMut, GUID_LEN, HEADER_LEN, MAGIC,
    METADATA_BLOCKS,
};
pub use version::{Algorithms, Version};
pub use volume::{CommitSummary, HeaderInfo, Volume};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
