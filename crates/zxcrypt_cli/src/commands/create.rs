//! Create command implementation.

use crate::error::CliResult;
use std::path::Path;
use tracing::info;
use zxcrypt_storage::FileBlockDevice;

/// Creates a zeroed image of `blocks` blocks.
pub fn run(image: &Path, block_size: u32, blocks: u64) -> CliResult<()> {
    info!("Creating image {:?}", image);
    FileBlockDevice::create(image, block_size, blocks)?;

    println!("✓ Image created");
    println!("  Path: {:?}", image);
    println!("  Blocks: {} x {} bytes", blocks, block_size);
    Ok(())
}
