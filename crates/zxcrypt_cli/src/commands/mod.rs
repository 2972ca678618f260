//! CLI command implementations.

pub mod create;
pub mod format;
pub mod inspect;
pub mod keys;
pub mod shred;
pub mod unlock;

use crate::error::{CliError, CliResult};
use std::fs;
use std::path::Path;
use zxcrypt_core::{Secret, STRONG_KEY_LEN, WEAK_KEY_LEN};
use zxcrypt_storage::FileBlockDevice;

/// Opens an existing image.
pub fn open_image(path: &Path, block_size: u32) -> CliResult<FileBlockDevice> {
    Ok(FileBlockDevice::open(path, block_size)?)
}

/// Reads a raw root key from `path`.
pub fn read_key(path: &Path) -> CliResult<Secret> {
    let bytes = fs::read(path).map_err(|source| CliError::KeyFile {
        path: path.to_path_buf(),
        source,
    })?;
    let key = Secret::from(bytes);
    match key.len() {
        WEAK_KEY_LEN | STRONG_KEY_LEN => Ok(key),
        len => Err(CliError::KeyLength {
            path: path.to_path_buf(),
            len,
        }),
    }
}
