//! Heap-allocated key material that is wiped on drop.

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secret bytes such as root keys, data keys and wrapping keys.
///
/// The buffer is zeroized when dropped and never printed by `Debug`.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    bytes: Vec<u8>,
}

impl Secret {
    /// Copies `bytes` into a new secret.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Creates a secret of `len` zero bytes, to be filled in place.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: vec![0u8; len],
        }
    }

    /// Creates a secret of `len` random bytes.
    #[must_use]
    pub fn random(len: usize) -> Self {
        let mut secret = Self::zeroed(len);
        rand::thread_rng().fill_bytes(&mut secret.bytes);
        secret
    }

    /// Concatenates two secrets into a new one.
    #[must_use]
    pub fn concat(first: &Secret, second: &Secret) -> Self {
        let mut bytes = Vec::with_capacity(first.len() + second.len());
        bytes.extend_from_slice(first.as_bytes());
        bytes.extend_from_slice(second.as_bytes());
        Self { bytes }
    }

    /// Returns the secret bytes.
    ///
    /// # Security
    ///
    /// Don't log or persist the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the secret bytes for in-place initialization.
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Returns the length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the secret holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Wipes and empties the secret.
    pub fn clear(&mut self) {
        self.bytes.zeroize();
    }
}

impl From<Vec<u8>> for Secret {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
