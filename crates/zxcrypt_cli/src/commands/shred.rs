//! Shred command implementation.

use super::open_image;
use crate::error::CliResult;
use std::path::Path;
use tracing::info;
use zxcrypt_core::Volume;

/// Destroys every superblock copy on the image. No key is needed.
pub fn run(image: &Path, block_size: u32) -> CliResult<()> {
    info!("Shredding {:?}", image);
    let mut volume = Volume::new(open_image(image, block_size)?);
    volume.init()?;
    volume.shred()?;

    println!("✓ Volume shredded; its data can no longer be unlocked");
    Ok(())
}
