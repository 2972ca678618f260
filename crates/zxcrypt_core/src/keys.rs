//! Derivation of per-slot wrapping keys from a root key.

use crate::crypto::{Hkdf, HkdfFlags, Secret, NONCE_LEN};
use crate::error::{VolumeError, VolumeResult};
use crate::superblock::{KeySlot, GUID_LEN};
use crate::version::Algorithms;

/// Length of a full-strength root key.
pub const STRONG_KEY_LEN: usize = 32;

/// Length of a root key from hardware with limited key entropy.
pub const WEAK_KEY_LEN: usize = 16;

const WRAP_KEY_LABEL: &str = "wrap key";
const WRAP_IV_LABEL: &str = "wrap iv";

/// Key and IV that seal or open one key slot.
#[derive(Debug)]
pub struct WrapMaterial {
    /// AEAD key.
    pub key: Secret,
    /// AEAD IV.
    pub iv: Secret,
}

impl WrapMaterial {
    /// Returns the nonce carried in the low bytes of the IV.
    #[must_use]
    pub fn nonce(&self) -> u64 {
        let mut low = [0u8; NONCE_LEN];
        low.copy_from_slice(&self.iv.as_bytes()[..NONCE_LEN]);
        u64::from_le_bytes(low)
    }
}

/// Derives the wrapping key and IV for `slot`.
///
/// HKDF is keyed with `root_key` and salted with the instance GUID, then
/// expanded once under `"wrap key <slot>"` and once under
/// `"wrap iv <slot>"` to the AEAD's key and IV lengths.
///
/// Root keys must be [`STRONG_KEY_LEN`] bytes, or [`WEAK_KEY_LEN`] bytes when
/// `allow_weak_keys` is set.
///
/// # Errors
///
/// Returns `InvalidArgs` for any other key length, and propagates HKDF
/// failures.
pub fn derive_wrap_material(
    algorithms: &Algorithms,
    root_key: &Secret,
    instance_guid: &[u8; GUID_LEN],
    slot: KeySlot,
    allow_weak_keys: bool,
) -> VolumeResult<WrapMaterial> {
    let flags = match root_key.len() {
        STRONG_KEY_LEN => HkdfFlags::NONE,
        WEAK_KEY_LEN if allow_weak_keys => HkdfFlags::ALLOW_WEAK_KEY,
        WEAK_KEY_LEN => {
            return Err(VolumeError::invalid_args(
                "16-byte root keys are disabled by configuration",
            ))
        }
        len => {
            return Err(VolumeError::invalid_args(format!(
                "root key must be {WEAK_KEY_LEN} or {STRONG_KEY_LEN} bytes, got {len}"
            )))
        }
    };

    if algorithms.aead.iv_len() < NONCE_LEN {
        return Err(VolumeError::internal("AEAD IV cannot carry a nonce"));
    }

    let hkdf = Hkdf::init(algorithms.digest, root_key, instance_guid, flags)?;
    let key = hkdf.derive(
        &format!("{WRAP_KEY_LABEL} {slot}"),
        algorithms.aead.key_len(),
    )?;
    let iv = hkdf.derive(&format!("{WRAP_IV_LABEL} {slot}"), algorithms.aead.iv_len())?;

    Ok(WrapMaterial { key, iv })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;
    use crate::version::Version;

    const GUID: [u8; GUID_LEN] = [0x42; GUID_LEN];

    fn algorithms() -> Algorithms {
        Version::DEFAULT.algorithms()
    }

    #[test]
    fn derivation_is_deterministic() {
        let root = Secret::from_bytes(&[9u8; 32]);
        let a = derive_wrap_material(&algorithms(), &root, &GUID, 0, true).unwrap();
        let b = derive_wrap_material(&algorithms(), &root, &GUID, 0, true).unwrap();
        assert_eq!(a.key.as_bytes(), b.key.as_bytes());
        assert_eq!(a.iv.as_bytes(), b.iv.as_bytes());
        assert_eq!(a.key.len(), 16);
        assert_eq!(a.iv.len(), 12);
    }

    #[test]
    fn slots_get_distinct_material() {
        let root = Secret::from_bytes(&[9u8; 32]);
        let a = derive_wrap_material(&algorithms(), &root, &GUID, 0, true).unwrap();
        let b = derive_wrap_material(&algorithms(), &root, &GUID, 1, true).unwrap();
        assert_ne!(a.key.as_bytes(), b.key.as_bytes());
        assert_ne!(a.iv.as_bytes(), b.iv.as_bytes());
    }

    #[test]
    fn guid_salts_derivation() {
        let root = Secret::from_bytes(&[9u8; 32]);
        let a = derive_wrap_material(&algorithms(), &root, &GUID, 0, true).unwrap();
        let b = derive_wrap_material(&algorithms(), &root, &[0x43; GUID_LEN], 0, true).unwrap();
        assert_ne!(a.key.as_bytes(), b.key.as_bytes());
    }

    #[test]
    fn matches_hkdf_sha256_labels() {
        use sha2::Sha256;

        let root = Secret::from_bytes(&[5u8; 32]);
        let material = derive_wrap_material(&algorithms(), &root, &GUID, 3, true).unwrap();

        let hk = ::hkdf::Hkdf::<Sha256>::new(Some(&GUID[..]), root.as_bytes());
        let mut key = [0u8; 16];
        let mut iv = [0u8; 12];
        hk.expand(b"wrap key 3", &mut key).unwrap();
        hk.expand(b"wrap iv 3", &mut iv).unwrap();
        assert_eq!(material.key.as_bytes(), &key);
        assert_eq!(material.iv.as_bytes(), &iv);
    }

    #[test]
    fn weak_keys_follow_configuration() {
        let root = Secret::from_bytes(&[9u8; 16]);
        assert!(derive_wrap_material(&algorithms(), &root, &GUID, 0, true).is_ok());

        let err = derive_wrap_material(&algorithms(), &root, &GUID, 0, false).unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgs);
    }

    #[test]
    fn other_key_lengths_rejected() {
        for len in [0, 1, 15, 17, 24, 31, 33, 64] {
            let root = Secret::from_bytes(&vec![1u8; len]);
            let err = derive_wrap_material(&algorithms(), &root, &GUID, 0, true).unwrap_err();
            assert_eq!(err.status(), Status::InvalidArgs, "length {len}");
        }
    }

    #[test]
    fn nonce_is_low_iv_bytes() {
        let material = WrapMaterial {
            key: Secret::zeroed(16),
            iv: Secret::from_bytes(&[1, 0, 0, 0, 0, 0, 0, 0, 9, 9, 9, 9]),
        };
        assert_eq!(material.nonce(), 1);
    }
}
