//! Volume configuration.

use crate::version::Version;

/// Configuration for a [`crate::Volume`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Algorithm suite written by `create_block`.
    pub version: Version,

    /// Whether 16-byte root keys are accepted. Some hardware key sources
    /// cannot supply more entropy than that.
    pub allow_weak_keys: bool,

    /// Whether `commit_block` skips copies whose on-disk contents already
    /// match the in-memory superblock.
    pub skip_matching_copies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: Version::DEFAULT,
            allow_weak_keys: true,
            skip_matching_copies: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the version used for new superblocks.
    #[must_use]
    pub const fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Sets whether 16-byte root keys are accepted.
    #[must_use]
    pub const fn allow_weak_keys(mut self, value: bool) -> Self {
        self.allow_weak_keys = value;
        self
    }

    /// Sets whether matching copies are left untouched on commit.
    #[must_use]
    pub const fn skip_matching_copies(mut self, value: bool) -> Self {
        self.skip_matching_copies = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.version, Version::Aes256XtsSha256);
        assert!(config.allow_weak_keys);
        assert!(config.skip_matching_copies);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .allow_weak_keys(false)
            .skip_matching_copies(false);

        assert!(!config.allow_weak_keys);
        assert!(!config.skip_matching_copies);
    }
}
