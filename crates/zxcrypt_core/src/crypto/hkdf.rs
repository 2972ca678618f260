//! HKDF key derivation.

use super::{DigestAlgorithm, Secret};
use crate::error::{VolumeError, VolumeResult};
use sha2::Sha256;

/// Options for [`Hkdf::init`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HkdfFlags(u16);

impl HkdfFlags {
    /// No options.
    pub const NONE: Self = Self(0);
    /// Accept input keys shorter than the digest output.
    pub const ALLOW_WEAK_KEY: Self = Self(1);

    /// Returns true if every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

enum Prk {
    Sha256(::hkdf::Hkdf<Sha256>),
}

/// An HKDF instance: the extract step is done by [`init`](Self::init), the
/// expand step by [`derive`](Self::derive).
pub struct Hkdf {
    digest: DigestAlgorithm,
    prk: Prk,
}

impl Hkdf {
    /// Extracts a pseudorandom key from `key` and `salt`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgs` if `key` is empty, or shorter than the digest
    /// output without [`HkdfFlags::ALLOW_WEAK_KEY`].
    pub fn init(
        digest: DigestAlgorithm,
        key: &Secret,
        salt: &[u8],
        flags: HkdfFlags,
    ) -> VolumeResult<Self> {
        if key.is_empty() {
            return Err(VolumeError::invalid_args("HKDF input key is empty"));
        }
        if key.len() < digest.digest_len() && !flags.contains(HkdfFlags::ALLOW_WEAK_KEY) {
            return Err(VolumeError::invalid_args(format!(
                "weak HKDF input key: {} bytes, need {}",
                key.len(),
                digest.digest_len()
            )));
        }

        let prk = match digest {
            DigestAlgorithm::Sha256 => Prk::Sha256(::hkdf::Hkdf::<Sha256>::new(
                Some(salt),
                key.as_bytes(),
            )),
        };
        Ok(Self { digest, prk })
    }

    /// Returns the digest of this instance.
    #[must_use]
    pub fn digest(&self) -> DigestAlgorithm {
        self.digest
    }

    /// Expands `len` bytes of output keyed by `label`.
    ///
    /// # Errors
    ///
    /// Returns `Crypto` if `len` exceeds what the digest can expand to.
    pub fn derive(&self, label: &str, len: usize) -> VolumeResult<Secret> {
        self.expand(label.as_bytes(), len)
    }

    fn expand(&self, info: &[u8], len: usize) -> VolumeResult<Secret> {
        let mut out = Secret::zeroed(len);
        let expanded = match &self.prk {
            Prk::Sha256(hk) => hk.expand(info, out.as_mut_bytes()),
        };
        expanded.map_err(|_| VolumeError::crypto(format!("HKDF cannot expand to {len} bytes")))?;
        Ok(out)
    }
}

impl std::fmt::Debug for Hkdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hkdf")
            .field("digest", &self.digest)
            .finish()
    }
}
