//! Versioned algorithm suites.

use crate::crypto::{AeadAlgorithm, CipherAlgorithm, DigestAlgorithm};
use crate::error::{VolumeError, VolumeResult};
use std::fmt;

/// On-disk format version, selecting the algorithm suite of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Version {
    /// AES-128-GCM-SIV key wrapping, AES-256-XTS data encryption and
    /// HKDF-SHA256 key derivation.
    #[default]
    Aes256XtsSha256,
}

impl Version {
    /// Version used when formatting new volumes.
    pub const DEFAULT: Self = Self::Aes256XtsSha256;

    /// Returns the value stored in the superblock.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Aes256XtsSha256 => 1,
        }
    }

    /// Parses the value stored in the superblock.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` for unknown versions, including the
    /// uninitialized version 0.
    pub fn from_u32(raw: u32) -> VolumeResult<Self> {
        match raw {
            1 => Ok(Self::Aes256XtsSha256),
            _ => Err(VolumeError::not_supported(format!(
                "unknown zxcrypt version {raw}"
            ))),
        }
    }

    /// Returns the algorithm suite of this version.
    #[must_use]
    pub const fn algorithms(self) -> Algorithms {
        match self {
            Self::Aes256XtsSha256 => Algorithms {
                aead: AeadAlgorithm::Aes128GcmSiv,
                cipher: CipherAlgorithm::Aes256Xts,
                digest: DigestAlgorithm::Sha256,
            },
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aes256XtsSha256 => write!(f, "AES256-XTS-SHA256 (v{})", self.as_u32()),
        }
    }
}

/// The concrete primitives of a [`Version`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Algorithms {
    /// Wraps the data key into key slots.
    pub aead: AeadAlgorithm,
    /// Encrypts device data with the unwrapped data key.
    pub cipher: CipherAlgorithm,
    /// Drives HKDF when deriving wrapping keys.
    pub digest: DigestAlgorithm,
}

impl Algorithms {
    /// Length of the wrapped plaintext: data key followed by data IV.
    #[must_use]
    pub const fn wrapped_len(&self) -> usize {
        self.cipher.key_len() + self.cipher.iv_len()
    }

    /// Length of one key slot: the wrapped plaintext plus the AEAD tag.
    #[must_use]
    pub const fn slot_len(&self) -> usize {
        self.wrapped_len() + self.aead.tag_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;

    #[test]
    fn default_suite() {
        let algorithms = Version::DEFAULT.algorithms();
        assert_eq!(algorithms.aead, AeadAlgorithm::Aes128GcmSiv);
        assert_eq!(algorithms.cipher, CipherAlgorithm::Aes256Xts);
        assert_eq!(algorithms.digest, DigestAlgorithm::Sha256);
        assert_eq!(algorithms.slot_len(), 96);
    }

    #[test]
    fn version_roundtrip() {
        assert_eq!(Version::from_u32(1).unwrap(), Version::Aes256XtsSha256);
        assert_eq!(Version::Aes256XtsSha256.as_u32(), 1);
    }

    #[test]
    fn unknown_versions_rejected() {
        for raw in [0, 2, u32::MAX, 0x0100_0000] {
            assert_eq!(
                Version::from_u32(raw).unwrap_err().status(),
                Status::NotSupported
            );
        }
    }
}
