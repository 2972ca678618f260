//! Authenticated encryption used to wrap data keys.

use super::Secret;
use crate::error::{VolumeError, VolumeResult};
use aes_gcm_siv::{
    aead::{Aead as _, KeyInit, Payload},
    Aes128GcmSiv, Nonce,
};

/// Length of the explicit nonce carried in the low bytes of the IV.
pub const NONCE_LEN: usize = std::mem::size_of::<u64>();

/// AEAD algorithm used to seal key slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AeadAlgorithm {
    /// AES-128 in GCM-SIV mode.
    Aes128GcmSiv,
}

impl AeadAlgorithm {
    /// Returns the key length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes128GcmSiv => 16,
        }
    }

    /// Returns the IV length in bytes.
    #[must_use]
    pub const fn iv_len(self) -> usize {
        match self {
            Self::Aes128GcmSiv => 12,
        }
    }

    /// Returns the authentication tag length in bytes.
    #[must_use]
    pub const fn tag_len(self) -> usize {
        match self {
            Self::Aes128GcmSiv => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Seal,
    Open,
}

/// A keyed AEAD context, initialized either for sealing or for opening.
///
/// The nonce of each operation is the little-endian value of the first
/// [`NONCE_LEN`] bytes of the IV. Sealing returns the nonce it used and then
/// advances it, so one context never seals twice under the same nonce.
/// Opening takes the nonce explicitly and writes it into the IV.
pub struct Aead {
    algorithm: AeadAlgorithm,
    cipher: Aes128GcmSiv,
    iv: Secret,
    mode: Mode,
}

impl Aead {
    /// Creates a context for sealing with `key` and `iv`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgs` if the key or IV length does not match the
    /// algorithm.
    pub fn init_seal(algorithm: AeadAlgorithm, key: &Secret, iv: &[u8]) -> VolumeResult<Self> {
        Self::init(algorithm, key, iv, Mode::Seal)
    }

    /// Creates a context for opening with `key` and `iv`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgs` if the key or IV length does not match the
    /// algorithm.
    pub fn init_open(algorithm: AeadAlgorithm, key: &Secret, iv: &[u8]) -> VolumeResult<Self> {
        Self::init(algorithm, key, iv, Mode::Open)
    }

    fn init(algorithm: AeadAlgorithm, key: &Secret, iv: &[u8], mode: Mode) -> VolumeResult<Self> {
        if key.len() != algorithm.key_len() {
            return Err(VolumeError::invalid_args(format!(
                "AEAD key must be {} bytes, got {}",
                algorithm.key_len(),
                key.len()
            )));
        }
        if iv.len() != algorithm.iv_len() {
            return Err(VolumeError::invalid_args(format!(
                "AEAD IV must be {} bytes, got {}",
                algorithm.iv_len(),
                iv.len()
            )));
        }

        let cipher = Aes128GcmSiv::new_from_slice(key.as_bytes())
            .map_err(|_| VolumeError::crypto("failed to key AES-128-GCM-SIV"))?;

        Ok(Self {
            algorithm,
            cipher,
            iv: Secret::from_bytes(iv),
            mode,
        })
    }

    /// Returns the algorithm of this context.
    #[must_use]
    pub fn algorithm(&self) -> AeadAlgorithm {
        self.algorithm
    }

    fn nonce(&self) -> u64 {
        let mut low = [0u8; NONCE_LEN];
        low.copy_from_slice(&self.iv.as_bytes()[..NONCE_LEN]);
        u64::from_le_bytes(low)
    }

    fn set_nonce(&mut self, nonce: u64) {
        self.iv.as_mut_bytes()[..NONCE_LEN].copy_from_slice(&nonce.to_le_bytes());
    }

    /// Seals `ptext` with `aad` as associated data.
    ///
    /// Returns the nonce used and `ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// Returns `BadState` if the context was initialized for opening or the
    /// nonce space is exhausted.
    pub fn seal(&mut self, ptext: &[u8], aad: &[u8]) -> VolumeResult<(u64, Vec<u8>)> {
        if self.mode != Mode::Seal {
            return Err(VolumeError::bad_state("AEAD context is not initialized for sealing"));
        }

        let nonce = self.nonce();
        let next = nonce
            .checked_add(1)
            .ok_or_else(|| VolumeError::bad_state("AEAD nonce space exhausted"))?;

        let ctext = self
            .cipher
            .encrypt(Nonce::from_slice(self.iv.as_bytes()), Payload { msg: ptext, aad })
            .map_err(|_| VolumeError::crypto("AEAD seal failed"))?;

        self.set_nonce(next);
        Ok((nonce, ctext))
    }

    /// Opens `ctext` (ciphertext followed by the tag) sealed under `nonce`
    /// with `aad` as associated data.
    ///
    /// # Errors
    ///
    /// Returns `Integrity` if authentication fails, `BadState` if the
    /// context was initialized for sealing and `InvalidArgs` if `ctext` is
    /// shorter than a tag.
    pub fn open(&mut self, nonce: u64, ctext: &[u8], aad: &[u8]) -> VolumeResult<Secret> {
        if self.mode != Mode::Open {
            return Err(VolumeError::bad_state("AEAD context is not initialized for opening"));
        }
        if ctext.len() < self.algorithm.tag_len() {
            return Err(VolumeError::invalid_args("ciphertext shorter than tag"));
        }

        self.set_nonce(nonce);
        self.cipher
            .decrypt(Nonce::from_slice(self.iv.as_bytes()), Payload { msg: ctext, aad })
            .map(Secret::from)
            .map_err(|_| VolumeError::integrity("AEAD authentication failed"))
    }
}

impl std::fmt::Debug for Aead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aead")
            .field("algorithm", &self.algorithm)
            .field("mode", &self.mode)
            .finish()
    }
}
