//! Key slot management commands.

use super::{open_image, read_key};
use crate::error::CliResult;
use std::path::Path;
use tracing::info;
use zxcrypt_core::{KeySlot, Volume};

/// Unlocks with an enrolled key and seals the data key under a new key.
pub fn enroll(
    image: &Path,
    block_size: u32,
    key_file: &Path,
    slot: KeySlot,
    new_key_file: &Path,
    new_slot: KeySlot,
) -> CliResult<()> {
    info!("Enrolling key slot {} on {:?}", new_slot, image);
    let key = read_key(key_file)?;
    let new_key = read_key(new_key_file)?;

    let mut volume = Volume::new(open_image(image, block_size)?);
    volume.unlock(&key, slot)?;
    volume.enroll(&new_key, new_slot)?;

    println!("✓ Key enrolled in slot {}", new_slot);
    Ok(())
}

/// Unlocks with an enrolled key and destroys another slot.
pub fn revoke(
    image: &Path,
    block_size: u32,
    key_file: &Path,
    slot: KeySlot,
    revoke_slot: KeySlot,
) -> CliResult<()> {
    info!("Revoking key slot {} on {:?}", revoke_slot, image);
    let key = read_key(key_file)?;

    let mut volume = Volume::new(open_image(image, block_size)?);
    volume.unlock(&key, slot)?;
    volume.revoke(revoke_slot)?;

    println!("✓ Key slot {} revoked", revoke_slot);
    Ok(())
}
