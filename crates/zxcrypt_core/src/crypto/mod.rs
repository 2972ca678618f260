//! Cryptographic primitive bindings.
//!
//! Thin, length-checked wrappers over the RustCrypto crates, shaped after
//! the call contracts the volume layer relies on:
//!
//! - [`Aead`] seals and opens key slots (AES-128-GCM-SIV) and exposes the
//!   nonce it used
//! - [`Hkdf`] derives per-slot wrapping keys (HKDF-SHA256)
//! - [`CipherAlgorithm`] sizes the data key and IV
//! - [`Secret`] holds key material and wipes it on drop

mod aead;
mod algorithms;
mod hkdf;
mod secret;

pub use aead::{Aead, AeadAlgorithm, NONCE_LEN};
pub use algorithms::{CipherAlgorithm, DigestAlgorithm};
pub use hkdf::{Hkdf, HkdfFlags};
pub use secret::Secret;
