//! Content-addressed composite hashing
//!
//! The hash family itself belongs to the parser side; the pipeline only needs
//! `composite_hash(list) -> hash` to reduce multi-token keys to a single token.

use sha2::{Digest, Sha256};

/// Separator placed between tokens before hashing
pub const COMPOUND_SEPARATOR: &str = " ";

/// Reduces an ordered list of tokens to a single content hash.
///
/// Implementations must be deterministic and must return the token itself for
/// a one-element list, so already-reduced keys pass through unchanged.
pub trait CompositeHasher: Send + Sync {
    /// Hash an ordered list of tokens into one token
    fn composite_hash(&self, parts: &[&str]) -> String;
}

/// Default hasher: SHA-256 over space-joined tokens, truncated to 16 bytes.
///
/// The 32-character lowercase hex output never contains a comma or newline,
/// so it is always safe as a temporary-file field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256CompositeHasher;

impl Sha256CompositeHasher {
    /// Create the default hasher
    pub fn new() -> Self {
        Self
    }
}

impl CompositeHasher for Sha256CompositeHasher {
    fn composite_hash(&self, parts: &[&str]) -> String {
        if let [single] = parts {
            return (*single).to_string();
        }
        let mut hasher = Sha256::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                hasher.update(COMPOUND_SEPARATOR.as_bytes());
            }
            hasher.update(part.as_bytes());
        }
        hex::encode(&hasher.finalize()[..16])
    }
}
