//! Document-store loader
//!
//! Two stages share this loader:
//! - [`DocumentLoader::flush_non_links`] drains typedefs and terminals out of
//!   the staging area and inserts them; every terminal's `hash,name` is also
//!   streamed into the `names` temporary file
//! - [`DocumentLoader::upload_links`] partitions the link snapshot by arity
//!   and inserts each bucket into its own collection
//!
//! Insert failures never abort a stage. Duplicate-key outcomes are swallowed
//! when duplicates are allowed; every other failure is logged and the next
//! batch goes ahead. Nothing is rolled back or retried.

use hyperload_core::{
    CompositeHasher, DocumentCollection, DocumentStore, Error, KvCollection, Link, Result,
};
use hyperload_staging::{Phase, StagingArea};
use hyperload_storage::{ExternalSorter, RecordWriter, TempFiles};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::DEFAULT_INSERT_BATCH_SIZE;

/// Outcome of inserting one collection's documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertStats {
    /// Documents the store accepted
    pub inserted: u64,
    /// Documents rejected as duplicate ids
    pub duplicates: u64,
    /// Batches that failed for any other reason
    pub failed_batches: u64,
}

/// Outcome of [`DocumentLoader::flush_non_links`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushReport {
    /// `atom_types` insert outcome
    pub typedefs: InsertStats,
    /// `nodes` insert outcome
    pub terminals: InsertStats,
    /// Records written to the `names` file
    pub names: u64,
}

/// Outcome of [`DocumentLoader::upload_links`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkUploadReport {
    /// Insert outcome per links collection that received documents
    pub collections: Vec<(DocumentCollection, InsertStats)>,
}

impl LinkUploadReport {
    /// Insert outcome for `collection`
    pub fn stats_for(&self, collection: DocumentCollection) -> InsertStats {
        self.collections
            .iter()
            .find(|(c, _)| *c == collection)
            .map(|(_, s)| *s)
            .unwrap_or_default()
    }
}

/// Inserts entities into the document store in fixed-size unordered batches
pub struct DocumentLoader {
    store: Arc<dyn DocumentStore>,
    allow_duplicates: bool,
    batch_size: usize,
}

impl DocumentLoader {
    /// Loader with the default batch size that logs duplicates
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            allow_duplicates: false,
            batch_size: DEFAULT_INSERT_BATCH_SIZE,
        }
    }

    /// Swallow duplicate-key errors instead of logging them
    pub fn allow_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    /// Documents per `insert_many` call
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Insert `documents` in batches, containing every failure to its batch
    pub fn insert_batches(&self, collection: DocumentCollection, documents: Vec<Value>) -> InsertStats {
        let mut stats = InsertStats::default();
        let mut documents = documents.into_iter().peekable();
        while documents.peek().is_some() {
            let batch: Vec<Value> = documents.by_ref().take(self.batch_size).collect();
            let size = batch.len();
            match self.store.insert_many(collection, batch) {
                Ok(n) => stats.inserted += n as u64,
                Err(Error::DuplicateKeys {
                    inserted,
                    duplicates,
                    ..
                }) => {
                    stats.inserted += inserted as u64;
                    stats.duplicates += duplicates.len() as u64;
                    if self.allow_duplicates {
                        debug!(target: "hyperload::load", %collection, duplicates = duplicates.len(), "Duplicate documents ignored");
                    } else {
                        error!(
                            target: "hyperload::load",
                            %collection,
                            duplicates = duplicates.len(),
                            first = ?duplicates.first(),
                            "Duplicate documents rejected"
                        );
                    }
                }
                Err(e) => {
                    stats.failed_batches += 1;
                    error!(target: "hyperload::load", %collection, batch = size, error = %e, "Document batch failed");
                }
            }
        }
        stats
    }

    /// Drain typedefs and terminals, insert them, and write the `names` file.
    ///
    /// The `names` file is sorted before the build counter is incremented.
    ///
    /// # Errors
    ///
    /// Returns an error only for `names` file I/O; insert failures are
    /// logged and counted.
    pub fn flush_non_links(
        &self,
        staging: &StagingArea,
        files: &TempFiles,
        hasher: &Arc<dyn CompositeHasher>,
        sorter: &dyn ExternalSorter,
    ) -> Result<FlushReport> {
        let start = Instant::now();
        info!(target: "hyperload::load", "Non-link flush started");
        let mut report = FlushReport::default();

        let typedefs: Vec<Value> = staging
            .drain_typedefs()
            .iter()
            .map(|t| t.to_document())
            .collect();
        report.typedefs = self.insert_batches(DocumentCollection::AtomTypes, typedefs);

        let terminals = staging.drain_terminals();
        let mut names = RecordWriter::create(files.path(KvCollection::Names), Arc::clone(hasher))?;
        let mut documents = Vec::with_capacity(terminals.len());
        for terminal in &terminals {
            documents.push(terminal.to_document());
            if let Err(e) = names.write(&terminal.hash_code, &terminal.terminal_name) {
                warn!(target: "hyperload::load", terminal = %terminal.hash_code, error = %e, "Terminal left out of names index");
            }
        }
        drop(terminals);
        let names_path = names.path().to_path_buf();
        report.names = names.finish()?;
        sorter.sort_by_first_field(&names_path)?;

        report.terminals = self.insert_batches(DocumentCollection::Nodes, documents);

        staging.counters().increment(Phase::Build);
        info!(
            target: "hyperload::load",
            typedefs = report.typedefs.inserted,
            terminals = report.terminals.inserted,
            names = report.names,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Non-link flush finished"
        );
        Ok(report)
    }

    /// Insert the link snapshot, one collection per arity bucket.
    ///
    /// Marks the links as uploaded on the staging counters when done.
    pub fn upload_links(&self, links: &[Link], staging: &StagingArea) -> LinkUploadReport {
        let start = Instant::now();
        info!(target: "hyperload::load", links = links.len(), "Link upload started");

        let mut buckets: Vec<(DocumentCollection, Vec<Value>)> = [
            DocumentCollection::LinksArity1,
            DocumentCollection::LinksArity2,
            DocumentCollection::LinksArityN,
        ]
        .into_iter()
        .map(|c| (c, Vec::new()))
        .collect();
        for link in links {
            let collection = DocumentCollection::for_arity(link.arity());
            if let Some((_, bucket)) = buckets.iter_mut().find(|(c, _)| *c == collection) {
                bucket.push(link.to_document());
            }
        }

        let mut report = LinkUploadReport::default();
        for (collection, documents) in buckets {
            if documents.is_empty() {
                continue;
            }
            let stats = self.insert_batches(collection, documents);
            report.collections.push((collection, stats));
        }

        staging.counters().mark_links_uploaded();
        info!(
            target: "hyperload::load",
            collections = ?report.collections,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Link upload finished"
        );
        report
    }
}
