//! Inspect command implementation.

use super::open_image;
use crate::error::{CliError, CliResult};
use serde::Serialize;
use std::path::Path;
use zxcrypt_core::{BlockCursor, Volume};
use zxcrypt_storage::BlockDevice;

/// Superblock inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Image path.
    pub path: String,
    /// Device block size in bytes.
    pub block_size: u32,
    /// Number of device blocks.
    pub block_count: u64,
    /// Instance GUID.
    pub instance_guid: String,
    /// Format version number.
    pub version: u32,
    /// Human-readable algorithm suite.
    pub algorithms: String,
    /// Length of one key slot.
    pub slot_len: usize,
    /// Number of key slots.
    pub num_slots: usize,
    /// Byte offsets of the superblock copies.
    pub copies: Vec<u64>,
}

/// Runs the inspect command.
pub fn run(image: &Path, block_size: u32, format: &str) -> CliResult<()> {
    let device = open_image(image, block_size)?;
    let info = device.block_info()?;
    let header = Volume::inspect(&device)?;

    let result = InspectResult {
        path: image.display().to_string(),
        block_size: info.block_size,
        block_count: info.block_count,
        instance_guid: header.instance_guid.to_string(),
        version: header.version.as_u32(),
        algorithms: header.version.to_string(),
        slot_len: header.slot_len,
        num_slots: header.num_slots,
        copies: BlockCursor::new(u64::from(info.block_size)).collect(),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        "text" => print_text(&result),
        other => return Err(CliError::Usage(format!("unknown output format {other:?}"))),
    }
    Ok(())
}

fn print_text(result: &InspectResult) {
    println!("zxcrypt volume: {}", result.path);
    println!("  Blocks: {} x {} bytes", result.block_count, result.block_size);
    println!("  Instance: {}", result.instance_guid);
    println!("  Version: {}", result.algorithms);
    println!("  Key slots: {} x {} bytes", result.num_slots, result.slot_len);
    println!("  Copies at: {:?}", result.copies);
}
