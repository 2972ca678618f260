//! Error types for zxcrypt volume operations.

use thiserror::Error;
use zxcrypt_storage::StorageError;

/// Result type for volume operations.
pub type VolumeResult<T> = Result<T, VolumeError>;

/// Coarse status class of a [`VolumeError`].
///
/// Callers that only need to branch on the kind of failure (for example to
/// decide whether a device should be reformatted) can match on this instead
/// of the error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Block I/O failed.
    Io,
    /// Not a zxcrypt device, or an unsupported format.
    NotSupported,
    /// A caller-supplied argument was invalid.
    InvalidArgs,
    /// No copy could be unlocked with the given key and slot.
    AccessDenied,
    /// Authenticated decryption failed.
    IoDataIntegrity,
    /// An internal invariant was violated.
    Internal,
    /// Offset arithmetic overflowed.
    OutOfRange,
    /// The device is too small.
    NoSpace,
    /// The volume is not in a state that allows the operation.
    BadState,
}

/// Errors that can occur in zxcrypt volume operations.
#[derive(Debug, Error)]
pub enum VolumeError {
    /// Block device error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The device is not zxcrypt formatted, or uses an unsupported format.
    #[error("not supported: {message}")]
    NotSupported {
        /// Description of the unsupported condition.
        message: String,
    },

    /// Invalid argument.
    #[error("invalid argument: {message}")]
    InvalidArgs {
        /// Description of the invalid argument.
        message: String,
    },

    /// Unlocking failed on every copy of the superblock.
    #[error("access denied")]
    AccessDenied,

    /// A wrapped key failed authentication.
    #[error("integrity check failed: {message}")]
    Integrity {
        /// Description of the failure.
        message: String,
    },

    /// An internal invariant was violated.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the violated invariant.
        message: String,
    },

    /// Offset or length arithmetic overflowed.
    #[error("out of range: {message}")]
    OutOfRange {
        /// Description of the overflow.
        message: String,
    },

    /// The device is too small to hold the volume metadata.
    #[error("no space: {message}")]
    NoSpace {
        /// Description of the shortfall.
        message: String,
    },

    /// Operation not permitted in the current state.
    #[error("bad state: {message}")]
    BadState {
        /// Why the operation is not permitted.
        message: String,
    },

    /// A cryptographic primitive failed for a reason other than
    /// authentication.
    #[error("crypto error: {message}")]
    Crypto {
        /// Description of the failure.
        message: String,
    },
}

impl VolumeError {
    /// Creates a not supported error.
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs {
            message: message.into(),
        }
    }

    /// Creates an integrity error.
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an out of range error.
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::OutOfRange {
            message: message.into(),
        }
    }

    /// Creates a no space error.
    pub fn no_space(message: impl Into<String>) -> Self {
        Self::NoSpace {
            message: message.into(),
        }
    }

    /// Creates a bad state error.
    pub fn bad_state(message: impl Into<String>) -> Self {
        Self::BadState {
            message: message.into(),
        }
    }

    /// Creates a crypto error.
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Returns the status class of this error.
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::Storage(_) => Status::Io,
            Self::NotSupported { .. } => Status::NotSupported,
            Self::InvalidArgs { .. } => Status::InvalidArgs,
            Self::AccessDenied => Status::AccessDenied,
            Self::Integrity { .. } => Status::IoDataIntegrity,
            Self::Internal { .. } | Self::Crypto { .. } => Status::Internal,
            Self::OutOfRange { .. } => Status::OutOfRange,
            Self::NoSpace { .. } => Status::NoSpace,
            Self::BadState { .. } => Status::BadState,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert_eq!(
            VolumeError::not_supported("bad magic").status(),
            Status::NotSupported
        );
        assert_eq!(VolumeError::invalid_args("x").status(), Status::InvalidArgs);
        assert_eq!(VolumeError::AccessDenied.status(), Status::AccessDenied);
        assert_eq!(
            VolumeError::integrity("tag").status(),
            Status::IoDataIntegrity
        );
        assert_eq!(
            VolumeError::from(StorageError::NotSupported).status(),
            Status::Io
        );
        assert_eq!(VolumeError::crypto("hkdf").status(), Status::Internal);
    }

    #[test]
    fn display_includes_message() {
        let err = VolumeError::bad_state("volume is locked");
        assert_eq!(err.to_string(), "bad state: volume is locked");
    }
}
