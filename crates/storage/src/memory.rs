//! In-memory backing stores
//!
//! Reference implementations of [`DocumentStore`] and [`BoundedKvStore`] for
//! tests, benchmarks, and dry runs. Both are sharded with DashMap so stage
//! threads writing to different collections do not contend.
//!
//! The KV store enforces the byte ceiling the same way a real store does,
//! measuring the serialized JSON, and supports fault injection for exercising
//! the loader's error paths.

use dashmap::DashMap;
use hyperload_core::limits::HARD_VALUE_BYTES;
use hyperload_core::{BoundedKvStore, DocumentCollection, DocumentStore, Error, KvCollection, Result};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Document field holding the primary key
pub const ID_FIELD: &str = "_id";

/// Document store keeping every collection in a hash map keyed by `_id`
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: DashMap<DocumentCollection, FxHashMap<String, Value>>,
    failing: Mutex<FxHashSet<DocumentCollection>>,
    calls: AtomicU64,
}

impl InMemoryDocumentStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert into `collection` fail with a store error
    pub fn fail_collection(&self, collection: DocumentCollection) {
        self.failing.lock().insert(collection);
    }

    /// Document with the given `_id`
    pub fn get(&self, collection: DocumentCollection, id: &str) -> Option<Value> {
        self.collections
            .get(&collection)
            .and_then(|docs| docs.get(id).cloned())
    }

    /// Number of documents in `collection`
    pub fn count(&self, collection: DocumentCollection) -> usize {
        self.collections.get(&collection).map_or(0, |docs| docs.len())
    }

    /// Sorted `_id`s of `collection`
    pub fn ids(&self, collection: DocumentCollection) -> Vec<String> {
        let mut ids: Vec<String> = self
            .collections
            .get(&collection)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Number of `insert_many` calls received
    pub fn insert_calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn insert_many(&self, collection: DocumentCollection, documents: Vec<Value>) -> Result<usize> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.failing.lock().contains(&collection) {
            return Err(Error::Store(format!("{} is unavailable", collection)));
        }

        let mut docs = self.collections.entry(collection).or_default();
        let mut inserted = 0;
        let mut duplicates = Vec::new();
        let mut missing_id = 0usize;
        for document in documents {
            let id = match document.get(ID_FIELD).and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => {
                    missing_id += 1;
                    continue;
                }
            };
            if docs.contains_key(&id) {
                duplicates.push(id);
                continue;
            }
            docs.insert(id, document);
            inserted += 1;
        }

        if !duplicates.is_empty() {
            return Err(Error::DuplicateKeys {
                collection: collection.to_string(),
                inserted,
                duplicates,
            });
        }
        if missing_id > 0 {
            return Err(Error::Store(format!(
                "{} document(s) without {} in {}",
                missing_id, ID_FIELD, collection
            )));
        }
        Ok(inserted)
    }
}

/// Bounded KV store keyed by `(collection, key)`
#[derive(Debug)]
pub struct InMemoryKvStore {
    entries: DashMap<(KvCollection, String), Value>,
    max_value_bytes: usize,
    upserts: AtomicU64,
    fail_after: Option<u64>,
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryKvStore {
    /// Store with the production ceiling of 20 MiB per value
    pub fn new() -> Self {
        Self::with_max_value_bytes(HARD_VALUE_BYTES)
    }

    /// Store with a custom per-value ceiling
    pub fn with_max_value_bytes(max_value_bytes: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_value_bytes,
            upserts: AtomicU64::new(0),
            fail_after: None,
        }
    }

    /// Accept `n` upserts, then time out every later one
    pub fn fail_upserts_after(mut self, n: u64) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Seed a value without counting it as an upsert
    pub fn seed(&self, collection: KvCollection, key: &str, value: Value) {
        self.entries.insert((collection, key.to_string()), value);
    }

    /// Number of upserts accepted
    pub fn upserts(&self) -> u64 {
        self.upserts.load(Ordering::Relaxed)
    }

    /// Number of keys held for `collection`
    pub fn len(&self, collection: KvCollection) -> usize {
        self.entries.iter().filter(|e| e.key().0 == collection).count()
    }

    /// True when no collection holds any key
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted keys of `collection`
    pub fn keys(&self, collection: KvCollection) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().0 == collection)
            .map(|e| e.key().1.clone())
            .collect();
        keys.sort();
        keys
    }
}

impl BoundedKvStore for InMemoryKvStore {
    fn get(&self, collection: KvCollection, key: &str) -> Result<Option<Value>> {
        Ok(self
            .entries
            .get(&(collection, key.to_string()))
            .map(|v| v.value().clone()))
    }

    fn upsert(&self, collection: KvCollection, key: &str, value: Value, timeout: Duration) -> Result<()> {
        let size = serde_json::to_vec(&value)?.len();
        if size > self.max_value_bytes {
            return Err(Error::ValueTooLarge {
                key: key.to_string(),
                actual: size,
                max: self.max_value_bytes,
            });
        }
        if let Some(limit) = self.fail_after {
            if self.upserts.load(Ordering::Relaxed) >= limit {
                return Err(Error::Timeout {
                    key: key.to_string(),
                    timeout,
                });
            }
        }
        self.entries.insert((collection, key.to_string()), value);
        self.upserts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn max_value_bytes(&self) -> usize {
        self.max_value_bytes
    }
}
