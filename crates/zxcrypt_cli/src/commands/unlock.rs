//! Unlock command implementation.

use super::{open_image, read_key};
use crate::error::CliResult;
use std::path::Path;
use tracing::info;
use zxcrypt_core::{KeySlot, Volume};

/// Checks that the key in `key_file` unlocks `slot`.
pub fn run(image: &Path, block_size: u32, key_file: &Path, slot: KeySlot) -> CliResult<()> {
    info!("Unlocking {:?}", image);
    let key = read_key(key_file)?;
    let mut volume = Volume::new(open_image(image, block_size)?);
    volume.unlock(&key, slot)?;

    println!("✓ Volume unlocked");
    println!("  Instance: {}", volume.instance_guid());
    println!("  Key slot: {}", slot);
    Ok(())
}
