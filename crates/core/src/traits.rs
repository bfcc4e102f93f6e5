//! Backing-store abstractions
//!
//! The pipeline only needs three store operations: insert-many on the
//! document store, get and upsert on the bounded-value KV store. Client
//! libraries implement these traits; `hyperload-storage` ships in-memory
//! implementations for tests and dry runs.
//!
//! Thread safety: all methods must be safe to call concurrently from
//! multiple stage threads (requires Send + Sync).

use serde_json::Value;
use std::time::Duration;

use crate::collections::{DocumentCollection, KvCollection};
use crate::error::Result;

/// Document store organized by collection
pub trait DocumentStore: Send + Sync {
    /// Insert documents without ordering guarantees.
    ///
    /// Every document that can be inserted is inserted, even when others in
    /// the same call fail. Returns the number inserted, or
    /// `Error::DuplicateKeys` when some `_id`s already existed.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKeys` for id collisions and any transport error as-is.
    fn insert_many(&self, collection: DocumentCollection, documents: Vec<Value>) -> Result<usize>;
}

/// Key-value store with a hard per-value byte ceiling
pub trait BoundedKvStore: Send + Sync {
    /// Current value at `key`, or `None` if it was never written
    ///
    /// # Errors
    ///
    /// Returns an error only for store failures; a missing key is `Ok(None)`.
    fn get(&self, collection: KvCollection, key: &str) -> Result<Option<Value>>;

    /// Insert or overwrite `key`.
    ///
    /// # Errors
    ///
    /// Returns `ValueTooLarge` above the ceiling, `Timeout` when the call
    /// exceeds `timeout`, or any other store failure.
    fn upsert(&self, collection: KvCollection, key: &str, value: Value, timeout: Duration) -> Result<()>;

    /// Per-value byte ceiling enforced by the store
    fn max_value_bytes(&self) -> usize;
}
