//! Format command implementation.

use super::{open_image, read_key};
use crate::error::CliResult;
use std::path::Path;
use tracing::info;
use zxcrypt_core::{KeySlot, Volume};

/// Formats the image with a new volume whose data key is sealed under the
/// key in `key_file`.
pub fn run(image: &Path, block_size: u32, key_file: &Path, slot: KeySlot) -> CliResult<()> {
    info!("Formatting {:?}", image);
    let key = read_key(key_file)?;
    let mut volume = Volume::new(open_image(image, block_size)?);
    let summary = volume.format(&key, slot)?;

    println!("✓ Volume formatted");
    println!("  Instance: {}", volume.instance_guid());
    println!("  Key slot: {}", slot);
    println!(
        "  Copies written: {}/{}",
        summary.written,
        summary.written + summary.unchanged + summary.failed
    );
    Ok(())
}
