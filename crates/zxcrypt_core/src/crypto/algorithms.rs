//! Data cipher and digest parameters.

/// Block cipher used for data encryption on the unlocked device.
///
/// Only its key and IV lengths matter to volume metadata: they size the
/// data key and data IV that the key slots wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherAlgorithm {
    /// AES-256 in XTS mode (two 256-bit keys).
    Aes256Xts,
}

impl CipherAlgorithm {
    /// Returns the key length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes256Xts => 64,
        }
    }

    /// Returns the IV length in bytes.
    #[must_use]
    pub const fn iv_len(self) -> usize {
        match self {
            Self::Aes256Xts => 16,
        }
    }
}

/// Digest used by HKDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the digest output length in bytes.
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
        }
    }
}
