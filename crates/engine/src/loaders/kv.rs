//! Bounded-KV loader
//!
//! Streams one sorted temporary file into the KV store, one grouped block at
//! a time. Storage layout per key:
//!
//! ```text
//! single block:   key -> [v1, v2, ...]
//! N + 1 blocks:   key -> N + 1
//!                 key_0 -> [block 0]   (moved from `key` when block 1 arrives)
//!                 key_1 -> [block 1]
//!                 ...
//!                 key_N -> [block N]
//! ```
//!
//! In update mode a single-block key is merged into whatever the store
//! already holds, as an order-preserving set union. Update mode on a key that
//! spans several blocks is a contract violation: the loader refuses it before
//! writing anything for that key and aborts the stage.
//!
//! Store failures abort the stage; upserts already made are kept.

use hyperload_core::{
    chunk_key, BoundedKvStore, Error, KvCollection, KvValue, Result, ValueEntry,
};
use hyperload_core::limits::{DEFAULT_BLOCK_SIZE, DEFAULT_STORE_TIMEOUT_SECS};
use hyperload_staging::{Phase, PhaseCounters};
use hyperload_storage::{KeyValueRuns, RunEntry, TempFiles};
use rustc_hash::FxHashSet;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::config::PipelineConfig;

/// Outcome of loading one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Collection loaded
    pub collection: KvCollection,
    /// Distinct keys loaded
    pub keys: u64,
    /// Blocks read from the file
    pub blocks: u64,
    /// Keys split into chunks
    pub chunked_keys: u64,
    /// Upserts issued
    pub upserts: u64,
}

impl LoadReport {
    fn new(collection: KvCollection) -> Self {
        Self {
            collection,
            keys: 0,
            blocks: 0,
            chunked_keys: 0,
            upserts: 0,
        }
    }
}

/// Loads one KV collection from its sorted temporary file
pub struct KvLoader {
    store: Arc<dyn BoundedKvStore>,
    collection: KvCollection,
    path: PathBuf,
    block_size: usize,
    update: bool,
    timeout: Duration,
}

impl KvLoader {
    /// Overwriting loader with default block size and timeout
    pub fn new(store: Arc<dyn BoundedKvStore>, collection: KvCollection, path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            collection,
            path: path.into(),
            block_size: DEFAULT_BLOCK_SIZE,
            update: false,
            timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
        }
    }

    /// Loader for `collection` as configured
    pub fn from_config(
        store: Arc<dyn BoundedKvStore>,
        collection: KvCollection,
        config: &PipelineConfig,
        files: &TempFiles,
    ) -> Self {
        Self::new(store, collection, files.path(collection))
            .with_block_size(config.block_size_for(collection))
            .with_update(config.update)
            .with_timeout(config.store_timeout())
    }

    /// Values per stored block
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Merge into existing values instead of overwriting
    pub fn with_update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    /// Timeout passed to every upsert
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// File being loaded
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole file, then count the collection as uploaded.
    ///
    /// # Errors
    ///
    /// Stops at the first failure: `ChunkedUpdate` for update mode on a
    /// multi-block key, `MalformedRecord` for a bad line, or any store error.
    pub fn load(&self, counters: &PhaseCounters) -> Result<LoadReport> {
        let start = Instant::now();
        info!(
            target: "hyperload::load",
            collection = %self.collection,
            path = %self.path.display(),
            block_size = self.block_size,
            update = self.update,
            "KV load started"
        );

        let mut report = LoadReport::new(self.collection);
        let runs = KeyValueRuns::open(&self.path, self.collection.layout(), self.block_size)?;
        for entry in runs {
            let entry = entry?;
            report.blocks += 1;
            if let Err(e) = self.load_entry(entry, &mut report) {
                error!(target: "hyperload::load", collection = %self.collection, error = %e, "KV load aborted");
                return Err(e);
            }
        }

        counters.increment(Phase::Upload);
        info!(
            target: "hyperload::load",
            collection = %self.collection,
            keys = report.keys,
            chunked_keys = report.chunked_keys,
            upserts = report.upserts,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "KV load finished"
        );
        Ok(report)
    }

    fn load_entry(&self, entry: RunEntry, report: &mut LoadReport) -> Result<()> {
        if self.update && !entry.is_single_block() {
            return Err(Error::ChunkedUpdate {
                collection: self.collection.to_string(),
                key: entry.key,
            });
        }

        let RunEntry { key, values, block, .. } = entry;
        match block {
            0 => {
                let values = if self.update {
                    self.merge_with_stored(&key, values)?
                } else {
                    values
                };
                self.upsert(&key, KvValue::Entries(values).to_json(), report)?;
                report.keys += 1;
            }
            1 => {
                let first = self.store.get(self.collection, &key)?.ok_or_else(|| {
                    Error::Store(format!(
                        "block 0 of {:?} is missing from {}",
                        key, self.collection
                    ))
                })?;
                self.upsert(&chunk_key(&key, 0), first, report)?;
                self.upsert(&key, KvValue::ChunkCount(2).to_json(), report)?;
                self.upsert(&chunk_key(&key, 1), KvValue::Entries(values).to_json(), report)?;
                report.chunked_keys += 1;
                debug!(target: "hyperload::load", collection = %self.collection, key = %key, "Key split into chunks");
            }
            n => {
                self.upsert(&key, KvValue::ChunkCount(n as u64 + 1).to_json(), report)?;
                self.upsert(&chunk_key(&key, n), KvValue::Entries(values).to_json(), report)?;
            }
        }
        Ok(())
    }

    /// Stored entries of `key` followed by new `incoming` ones, each kept once
    fn merge_with_stored(&self, key: &str, incoming: Vec<ValueEntry>) -> Result<Vec<ValueEntry>> {
        let stored = match self.store.get(self.collection, key)? {
            None => Vec::new(),
            Some(value) => match KvValue::from_json(&value)? {
                KvValue::Entries(entries) => entries,
                KvValue::ChunkCount(_) => {
                    return Err(Error::ChunkedUpdate {
                        collection: self.collection.to_string(),
                        key: key.to_string(),
                    })
                }
            },
        };

        let like = match incoming.first() {
            Some(first) => first.clone(),
            None => return Ok(stored),
        };
        let mut seen = FxHashSet::default();
        let mut merged = Vec::with_capacity(stored.len() + incoming.len());
        for entry in stored
            .into_iter()
            .map(|e| e.normalized_like(&like))
            .chain(incoming)
        {
            if seen.insert(entry.clone()) {
                merged.push(entry);
            }
        }
        Ok(merged)
    }

    fn upsert(&self, key: &str, value: Value, report: &mut LoadReport) -> Result<()> {
        self.store.upsert(self.collection, key, value, self.timeout)?;
        report.upserts += 1;
        Ok(())
    }
}

/// Every entry stored for `key`, following chunk counts.
///
/// Returns `None` when the key was never written.
pub fn read_full_value(
    store: &dyn BoundedKvStore,
    collection: KvCollection,
    key: &str,
) -> Result<Option<Vec<ValueEntry>>> {
    let value = match store.get(collection, key)? {
        Some(value) => value,
        None => return Ok(None),
    };
    match KvValue::from_json(&value)? {
        KvValue::Entries(entries) => Ok(Some(entries)),
        KvValue::ChunkCount(n) => {
            let mut all = Vec::new();
            for i in 0..n as usize {
                let name = chunk_key(key, i);
                let chunk = store.get(collection, &name)?.ok_or_else(|| {
                    Error::Store(format!("chunk {:?} is missing from {}", name, collection))
                })?;
                match KvValue::from_json(&chunk)? {
                    KvValue::Entries(entries) => all.extend(entries),
                    KvValue::ChunkCount(_) => {
                        return Err(Error::Serialization(format!(
                            "chunk {:?} holds a chunk count",
                            name
                        )))
                    }
                }
            }
            Ok(Some(all))
        }
    }
}
