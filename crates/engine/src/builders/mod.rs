//! Index builders
//!
//! Each builder reads the frozen link snapshot, writes one temporary file
//! per KV collection it owns, and sorts those files before it reports
//! completion, so a loader never opens an unsorted file.
//!
//! Builders own disjoint sets of collections and may run concurrently.

pub mod connectivity;
pub mod pattern;
pub mod templates;

pub use connectivity::ConnectivityBuilder;
pub use pattern::{pattern_keys, PatternBuilder};
pub use templates::TypeTemplateBuilder;

use hyperload_core::{CompositeHasher, KvCollection, Link, Result};
use hyperload_staging::{Phase, PhaseCounters};
use hyperload_storage::{ExternalSorter, RecordWriter, TempFiles};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Everything a builder reads
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    /// Frozen link snapshot
    pub links: &'a [Link],
    /// Collection -> temporary file map
    pub files: &'a TempFiles,
    /// Reduces composite keys to one token
    pub hasher: &'a Arc<dyn CompositeHasher>,
    /// Sorts each output file in place
    pub sorter: &'a dyn ExternalSorter,
}

impl<'a> BuildContext<'a> {
    /// Open a fresh writer on `collection`'s temporary file
    pub fn writer(&self, collection: KvCollection) -> Result<RecordWriter> {
        RecordWriter::create(self.files.path(collection), Arc::clone(self.hasher))
    }
}

/// Records written per collection by one builder
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildReport {
    /// Builder name
    pub builder: &'static str,
    /// `(collection, records)` for every file the builder produced
    pub records: Vec<(KvCollection, u64)>,
}

impl BuildReport {
    /// Records written to `collection`, 0 if the builder does not own it
    pub fn records_for(&self, collection: KvCollection) -> u64 {
        self.records
            .iter()
            .find(|(c, _)| *c == collection)
            .map_or(0, |(_, n)| *n)
    }
}

/// A stage deriving one or more KV indices from the link snapshot
pub trait IndexBuilder: Send + Sync {
    /// Stage name used in logs and reports
    fn name(&self) -> &'static str;

    /// Collections whose temporary files this builder writes
    fn outputs(&self) -> &'static [KvCollection];

    /// Write the unsorted temporary files.
    ///
    /// Returns the finished writers; [`run_builder`] syncs and sorts them.
    fn write(&self, ctx: &BuildContext<'_>) -> Result<Vec<(KvCollection, RecordWriter)>>;
}

/// Write, sync, and sort a builder's files, then count it as built
pub fn run_builder(
    builder: &dyn IndexBuilder,
    ctx: &BuildContext<'_>,
    counters: &PhaseCounters,
) -> Result<BuildReport> {
    let start = Instant::now();
    info!(
        target: "hyperload::build",
        builder = builder.name(),
        links = ctx.links.len(),
        outputs = ?builder.outputs(),
        "Builder started"
    );

    let writers = builder.write(ctx)?;
    let mut report = BuildReport {
        builder: builder.name(),
        records: Vec::with_capacity(writers.len()),
    };
    for (collection, writer) in writers {
        let path = writer.path().to_path_buf();
        let records = writer.finish()?;
        ctx.sorter.sort_by_first_field(&path)?;
        report.records.push((collection, records));
    }

    counters.increment(Phase::Build);
    info!(
        target: "hyperload::build",
        builder = builder.name(),
        records = ?report.records,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Builder finished"
    );
    Ok(report)
}
