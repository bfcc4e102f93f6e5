//! Pipeline orchestrator
//!
//! Runs one load in four phases, each a set of scoped threads joined before
//! the next phase starts:
//!
//! 1. **Parse**: one thread per [`ExpressionSource`], staging entities
//! 2. **Freeze**: the link set becomes an immutable snapshot, exactly once
//! 3. **Build**: non-link flush, link upload, and the three index builders,
//!    each sorting its own files before it finishes
//! 4. **Load**: one KV loader per collection
//!
//! A failing stage never cancels its siblings. Once a phase has joined, every
//! failure is logged and the first one is returned as `StageFailed`; later
//! phases do not start.

use hyperload_core::{
    BoundedKvStore, CompositeHasher, DocumentStore, Entity, Error, KvCollection, Result,
    Sha256CompositeHasher,
};
use hyperload_staging::{CounterSnapshot, Phase, StagingArea};
use hyperload_storage::{ExternalSorter, MergeSorter, TempFiles};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::builders::{
    run_builder, BuildContext, BuildReport, ConnectivityBuilder, IndexBuilder, PatternBuilder,
    TypeTemplateBuilder,
};
use crate::config::PipelineConfig;
use crate::loaders::{DocumentLoader, FlushReport, KvLoader, LinkUploadReport, LoadReport};

/// Producer of parsed entities, one per parse thread
pub trait ExpressionSource: Send {
    /// Name used for the parse thread and in logs
    fn name(&self) -> &str;

    /// Stage every entity; returns how many were new
    ///
    /// # Errors
    ///
    /// Returns the first parse or staging failure.
    fn stage_into(&mut self, staging: &StagingArea) -> Result<u64>;
}

/// Source over entities that are already built
#[derive(Debug, Clone)]
pub struct VecSource {
    name: String,
    entities: Vec<Entity>,
}

impl VecSource {
    /// Source named `name` yielding `entities` in order
    pub fn new<I, E>(name: impl Into<String>, entities: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Entity>,
    {
        Self {
            name: name.into(),
            entities: entities.into_iter().map(Into::into).collect(),
        }
    }
}

impl ExpressionSource for VecSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn stage_into(&mut self, staging: &StagingArea) -> Result<u64> {
        let mut added = 0;
        for entity in self.entities.drain(..) {
            if staging.add(entity)? {
                added += 1;
            }
        }
        Ok(added)
    }
}

/// What one pipeline run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// New entities staged by all sources
    pub staged: u64,
    /// Links in the frozen snapshot
    pub links: usize,
    /// Typedef and terminal flush outcome
    pub flush: FlushReport,
    /// Link document upload outcome
    pub link_upload: LinkUploadReport,
    /// One report per index builder
    pub builds: Vec<BuildReport>,
    /// One report per KV collection, in load order
    pub loads: Vec<LoadReport>,
    /// Phase counters at the end of the run
    pub counters: CounterSnapshot,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl PipelineReport {
    /// Load report for `collection`
    pub fn load_for(&self, collection: KvCollection) -> Option<&LoadReport> {
        self.loads.iter().find(|r| r.collection == collection)
    }
}

enum StageOutput {
    Flush(FlushReport),
    Links(LinkUploadReport),
    Build(BuildReport),
}

type Stage<'env, T> = (String, Box<dyn FnOnce() -> Result<T> + Send + 'env>);

fn stage<'env, T, F>(name: impl Into<String>, work: F) -> Stage<'env, T>
where
    F: FnOnce() -> Result<T> + Send + 'env,
{
    (name.into(), Box::new(work))
}

/// Owns the staging area and store handles for one load
pub struct Pipeline {
    config: PipelineConfig,
    files: TempFiles,
    staging: StagingArea,
    documents: Arc<dyn DocumentStore>,
    kv: Arc<dyn BoundedKvStore>,
    hasher: Arc<dyn CompositeHasher>,
    sorter: Arc<dyn ExternalSorter>,
}

impl Pipeline {
    /// Validate `config`, create its temporary directory, and set up staging
    ///
    /// # Errors
    ///
    /// Returns `Config` for invalid settings or `Io` if `temp_dir` cannot be created.
    pub fn new(
        config: PipelineConfig,
        documents: Arc<dyn DocumentStore>,
        kv: Arc<dyn BoundedKvStore>,
    ) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.temp_dir)?;
        let staging = StagingArea::with_pattern_exclusions(config.pattern_exclusions.iter().cloned());
        Ok(Self {
            files: config.temp_files(),
            sorter: Arc::new(MergeSorter::new(config.sort_run_lines)),
            config,
            staging,
            documents,
            kv,
            hasher: Arc::new(Sha256CompositeHasher),
        })
    }

    /// Replace the composite hasher
    pub fn with_hasher(mut self, hasher: Arc<dyn CompositeHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Replace the external sorter
    pub fn with_sorter(mut self, sorter: Arc<dyn ExternalSorter>) -> Self {
        self.sorter = sorter;
        self
    }

    /// Staging area parsers feed
    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Temporary file map
    pub fn files(&self) -> &TempFiles {
        &self.files
    }

    /// Active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every phase to completion.
    ///
    /// A pipeline runs once; a second call fails because the link snapshot
    /// has already been taken.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure of the first failing phase as `StageFailed`.
    pub fn run(&self, sources: Vec<Box<dyn ExpressionSource>>) -> Result<PipelineReport> {
        let start = Instant::now();
        info!(
            target: "hyperload::pipeline",
            sources = sources.len(),
            temp_dir = %self.config.temp_dir.display(),
            update = self.config.update,
            "Pipeline started"
        );

        let staged = self.parse(sources)?;
        self.staging.log_summary();

        let snapshot = self.staging.freeze_links()?;
        info!(target: "hyperload::pipeline", links = snapshot.len(), "Link snapshot taken");

        let (flush, link_upload, builds) = self.build(&snapshot)?;
        let loads = self.load()?;

        if !self.config.keep_temp_files {
            if let Err(e) = self.files.remove_all() {
                warn!(target: "hyperload::pipeline", error = %e, "Temporary files not removed");
            }
        }

        let report = PipelineReport {
            staged,
            links: snapshot.len(),
            flush,
            link_upload,
            builds,
            loads,
            counters: self.staging.counters().snapshot(),
            elapsed: start.elapsed(),
        };
        info!(
            target: "hyperload::pipeline",
            staged = report.staged,
            links = report.links,
            counters = ?report.counters,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Pipeline finished"
        );
        Ok(report)
    }

    fn parse(&self, sources: Vec<Box<dyn ExpressionSource>>) -> Result<u64> {
        let staging = &self.staging;
        let stages: Vec<Stage<'_, u64>> = sources
            .into_iter()
            .map(|mut source| {
                let name = source.name().to_string();
                stage(name, move || {
                    let added = source.stage_into(staging)?;
                    staging.counters().increment(Phase::Parse);
                    info!(target: "hyperload::pipeline", source = source.name(), added, "Source parsed");
                    Ok(added)
                })
            })
            .collect();

        let outputs = first_failure("parse", run_phase("parse", stages))?;
        Ok(outputs.into_iter().sum())
    }

    fn build(&self, links: &[hyperload_core::Link]) -> Result<(FlushReport, LinkUploadReport, Vec<BuildReport>)> {
        let staging = &self.staging;
        let files = &self.files;
        let hasher = &self.hasher;
        let sorter: &dyn ExternalSorter = self.sorter.as_ref();
        let ctx = BuildContext {
            links,
            files,
            hasher,
            sorter,
        };
        let loader = DocumentLoader::new(Arc::clone(&self.documents))
            .allow_duplicates(self.config.allow_duplicates)
            .with_batch_size(self.config.insert_batch_size);
        let loader = &loader;

        let exclusions: FxHashSet<String> = staging.pattern_exclusions();
        let index_builders: Vec<Box<dyn IndexBuilder>> = vec![
            Box::new(ConnectivityBuilder),
            Box::new(PatternBuilder::new(exclusions, self.config.max_pattern_arity)),
            Box::new(TypeTemplateBuilder),
        ];

        let mut stages: Vec<Stage<'_, StageOutput>> = vec![
            stage("flush", move || {
                loader
                    .flush_non_links(staging, files, hasher, sorter)
                    .map(StageOutput::Flush)
            }),
            stage("links", move || {
                Ok(StageOutput::Links(loader.upload_links(links, staging)))
            }),
        ];
        for builder in index_builders {
            let counters = staging.counters();
            stages.push(stage(builder.name(), move || {
                run_builder(builder.as_ref(), &ctx, counters).map(StageOutput::Build)
            }));
        }

        let mut flush = FlushReport::default();
        let mut link_upload = LinkUploadReport::default();
        let mut builds = Vec::new();
        for output in first_failure("build", run_phase("build", stages))? {
            match output {
                StageOutput::Flush(report) => flush = report,
                StageOutput::Links(report) => link_upload = report,
                StageOutput::Build(report) => builds.push(report),
            }
        }
        Ok((flush, link_upload, builds))
    }

    fn load(&self) -> Result<Vec<LoadReport>> {
        let counters = self.staging.counters();
        let stages: Vec<Stage<'_, LoadReport>> = KvCollection::ALL
            .iter()
            .map(|&collection| {
                let loader = KvLoader::from_config(Arc::clone(&self.kv), collection, &self.config, &self.files);
                stage(collection.as_str(), move || loader.load(counters))
            })
            .collect();
        first_failure("load", run_phase("load", stages))
    }
}

/// Run every stage on its own scoped thread and join them all
fn run_phase<'env, T: Send + 'env>(phase: &str, stages: Vec<Stage<'env, T>>) -> Vec<(String, Result<T>)> {
    let start = Instant::now();
    info!(target: "hyperload::pipeline", phase, stages = stages.len(), "Phase started");
    let results: Vec<(String, Result<T>)> = thread::scope(|scope| {
        let handles: Vec<_> = stages
            .into_iter()
            .map(|(name, work)| {
                let spawned = thread::Builder::new()
                    .name(format!("{}-{}", phase, name))
                    .spawn_scoped(scope, work);
                (name, spawned)
            })
            .collect();
        handles
            .into_iter()
            .map(|(name, spawned)| {
                let result = match spawned {
                    Ok(handle) => handle
                        .join()
                        .unwrap_or_else(|_| Err(Error::Store(format!("stage {} panicked", name)))),
                    Err(e) => Err(Error::Io(e)),
                };
                (name, result)
            })
            .collect()
    });
    info!(
        target: "hyperload::pipeline",
        phase,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Phase finished"
    );
    results
}

/// Log every failed stage and return the first, or all outputs in stage order
fn first_failure<T>(phase: &str, results: Vec<(String, Result<T>)>) -> Result<Vec<T>> {
    let mut outputs = Vec::with_capacity(results.len());
    let mut first = None;
    for (stage, result) in results {
        match result {
            Ok(output) => outputs.push(output),
            Err(e) => {
                error!(target: "hyperload::pipeline", phase, stage = %stage, fatal = e.is_fatal(), error = %e, "Stage failed");
                if first.is_none() {
                    first = Some(e.in_stage(stage));
                }
            }
        }
    }
    match first {
        Some(e) => Err(e),
        None => Ok(outputs),
    }
}
