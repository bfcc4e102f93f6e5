//! Error types for hyperload
//!
//! This module defines all error types used throughout the build/load pipeline.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Recoverability
//!
//! - `DuplicateKeys`: recoverable, handled by insert policy
//! - `ChunkedUpdate`: fatal, stops the stage that raised it
//! - `Timeout` / `Store`: aborts the stage, never retried here
//!
//! A missing key on a store `get` is not an error at all; stores return `Ok(None)`.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for hyperload operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for hyperload
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (temporary files, spill runs, config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A temporary-file line that does not fit the requested field layout
    #[error("Malformed record at {}:{line}: {reason}", .path.display())]
    MalformedRecord {
        /// File the line was read from
        path: PathBuf,
        /// 1-based line number
        line: u64,
        /// What was wrong with it
        reason: String,
    },

    /// A token that would corrupt record boundaries if written
    #[error("Invalid token {token:?}: {reason}")]
    InvalidToken {
        /// Offending token
        token: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Some documents of an unordered bulk insert collided with existing ids
    #[error("{} duplicate key(s) in {collection} ({inserted} inserted)", .duplicates.len())]
    DuplicateKeys {
        /// Target collection
        collection: String,
        /// Documents that were inserted despite the duplicates
        inserted: usize,
        /// Ids that were rejected
        duplicates: Vec<String>,
    },

    /// Update mode requested on a key whose values span more than one block
    #[error("Update mode is not allowed on chunked key {key:?} in {collection}")]
    ChunkedUpdate {
        /// KV collection being loaded
        collection: String,
        /// Key that overflowed
        key: String,
    },

    /// The store rejected a value above its byte ceiling
    #[error("Value for key {key:?} is {actual} bytes (max {max})")]
    ValueTooLarge {
        /// Key being written
        key: String,
        /// Encoded size
        actual: usize,
        /// Store ceiling
        max: usize,
    },

    /// A store call did not complete within its timeout
    #[error("Store call for key {key:?} timed out after {timeout:?}")]
    Timeout {
        /// Key being written
        key: String,
        /// Timeout applied to the call
        timeout: Duration,
    },

    /// Any other backing-store failure
    #[error("Store error: {0}")]
    Store(String),

    /// The link snapshot was requested before it was taken
    #[error("Link snapshot has not been taken yet")]
    SnapshotNotReady,

    /// The link snapshot was taken a second time
    #[error("Link snapshot was already taken")]
    SnapshotAlreadyTaken,

    /// A link was staged after the snapshot was taken
    #[error("Staging area is frozen; link {0} would be missed by the index builders")]
    StagingFrozen(String),

    /// Configuration parse or validation failure
    #[error("Configuration error: {0}")]
    Config(String),

    /// A pipeline stage failed
    #[error("Stage {stage} failed: {source}")]
    StageFailed {
        /// Stage name
        stage: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap an error with the name of the stage it came from
    pub fn in_stage(self, stage: impl Into<String>) -> Self {
        Error::StageFailed {
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// True for bulk-insert duplicate-key outcomes
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Error::DuplicateKeys { .. })
    }

    /// True for errors that must never be contained to a single record
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::ChunkedUpdate { .. } => true,
            Error::StageFailed { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
