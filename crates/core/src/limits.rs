//! Size limits for the bounded-value KV store
//!
//! The store rejects any single value above a hard byte ceiling. The loader
//! never measures bytes on the hot path; it splits a key's values at a value
//! *count* chosen conservatively against the ceiling.

use crate::collections::{FieldLayout, KvCollection};

/// Hard per-value ceiling of the store (20 MiB)
pub const HARD_VALUE_BYTES: usize = 20 * 1024 * 1024;

/// Size the block threshold is sized against (~15 MiB)
pub const SAFE_VALUE_BYTES: usize = 15 * 1024 * 1024;

/// Default number of values per stored block
pub const DEFAULT_BLOCK_SIZE: usize = 500_000;

/// Divisor applied to the block size of collections whose entries carry targets
pub const TARGETS_BLOCK_DIVISOR: usize = 4;

/// Default per-call store timeout, in seconds
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 100;

/// Per-collection block thresholds derived from one base size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLimits {
    /// Values per block for collections with plain entries
    pub base: usize,
}

impl Default for BlockLimits {
    fn default() -> Self {
        BlockLimits {
            base: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl BlockLimits {
    /// Limits with the given base block size
    pub fn new(base: usize) -> Self {
        BlockLimits { base }
    }

    /// Values per block for `collection`.
    ///
    /// Targeted entries are several hashes wide, so those collections get a
    /// quarter of the base. Never returns less than 1.
    pub fn block_size_for(&self, collection: KvCollection) -> usize {
        let size = match collection.layout() {
            FieldLayout::Targets => self.base / TARGETS_BLOCK_DIVISOR,
            FieldLayout::Pair | FieldLayout::MergeRest => self.base,
        };
        size.max(1)
    }
}
