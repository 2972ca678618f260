//! Iteration over the redundant superblock copies.

use crate::superblock::METADATA_BLOCKS;

/// Result of positioning a [`BlockCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The cursor is on a copy; process it and advance.
    Next,
    /// Every copy has been visited.
    Stop,
}

/// Cursor over the byte offsets of the [`METADATA_BLOCKS`] superblock
/// copies, which occupy consecutive blocks at the start of the device.
///
/// Callers either drive it explicitly:
///
/// ```rust
/// use zxcrypt_core::{BlockCursor, Step};
///
/// let mut cursor = BlockCursor::new(4096);
/// let mut step = cursor.begin();
/// let mut offsets = Vec::new();
/// while step == Step::Next {
///     offsets.push(cursor.offset());
///     step = cursor.advance();
/// }
/// assert_eq!(offsets, vec![0, 4096]);
/// ```
///
/// or use it as an iterator of offsets.
#[derive(Debug, Clone)]
pub struct BlockCursor {
    block_len: u64,
    index: u64,
    started: bool,
}

impl BlockCursor {
    /// Creates a cursor for superblocks of `block_len` bytes.
    #[must_use]
    pub fn new(block_len: u64) -> Self {
        Self {
            block_len,
            index: 0,
            started: false,
        }
    }

    /// Moves to the first copy.
    pub fn begin(&mut self) -> Step {
        self.started = true;
        self.index = 0;
        self.step()
    }

    /// Moves to the next copy.
    pub fn advance(&mut self) -> Step {
        self.index = self.index.saturating_add(1);
        self.step()
    }

    /// Returns the byte offset of the current copy.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.index.saturating_mul(self.block_len)
    }

    fn step(&self) -> Step {
        let in_range = self.index < METADATA_BLOCKS
            && self.block_len != 0
            && self.index.checked_mul(self.block_len).is_some();
        if in_range {
            Step::Next
        } else {
            Step::Stop
        }
    }
}

impl Iterator for BlockCursor {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let step = if self.started {
            self.advance()
        } else {
            self.begin()
        };
        (step == Step::Next).then(|| self.offset())
    }
}
