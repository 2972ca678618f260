//! # zxcrypt storage
//!
//! Block device trait and implementations underneath zxcrypt volumes.
//!
//! Devices are **opaque block stores**: they transfer whole blocks at
//! block-aligned byte offsets and know nothing about superblocks, key slots
//! or encryption. Devices backed by a flexible volume manager additionally
//! answer slice queries and allocate slices on demand.
//!
//! ## Design Principles
//!
//! - Every transfer is a whole number of blocks at an aligned offset
//! - Plain devices report `NotSupported` for every FVM call
//! - The volume layer owns all format interpretation
//!
//! ## Available Devices
//!
//! - [`InMemoryBlockDevice`] - For tests, optionally simulating FVM slices
//! - [`FileBlockDevice`] - A disk image on the host file system
//! - [`FaultyBlockDevice`] - Wrapper that injects I/O failures
//!
//! ## Example
//!
//! ```rust
//! use zxcrypt_storage::{BlockDevice, InMemoryBlockDevice};
//!
//! let mut device = InMemoryBlockDevice::new(512, 8);
//! device.write_block(512, &[0xAB; 512]).unwrap();
//!
//! let mut block = vec![0u8; 512];
//! device.read_block(512, &mut block).unwrap();
//! assert_eq!(block, vec![0xAB; 512]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod device;
mod error;
mod faulty;
mod file;
mod memory;

pub use device::{BlockDevice, BlockInfo, VsliceRange};
pub use error::{StorageError, StorageResult};
pub use faulty::FaultyBlockDevice;
pub use file::FileBlockDevice;
pub use memory::InMemoryBlockDevice;
