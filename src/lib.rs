//! Hyperload - bulk index builder and loader for content-addressed hypergraphs
//!
//! Hyperload takes parsed typedefs, terminals, and links, stages them in
//! memory, derives the connectivity, pattern, and type-template indices
//! through sorted temporary files, and loads everything into a document
//! store and a KV store with a per-value byte ceiling.
//!
//! # Quick Start
//!
//! ```ignore
//! use hyperload::{Pipeline, PipelineConfig, VecSource};
//! use hyperload::storage::{InMemoryDocumentStore, InMemoryKvStore};
//! use std::sync::Arc;
//!
//! let pipeline = Pipeline::new(
//!     PipelineConfig::in_dir("/var/tmp/hyperload"),
//!     Arc::new(InMemoryDocumentStore::new()),
//!     Arc::new(InMemoryKvStore::new()),
//! )?;
//! let report = pipeline.run(vec![Box::new(VecSource::new("kb", entities))])?;
//! ```
//!
//! # Architecture
//!
//! - [`types`]: entity types, store traits, errors
//! - [`staging`]: the staging area shared by parser threads
//! - [`storage`]: temporary files, external sort, grouped reader, in-memory stores
//! - [`engine`]: configuration, builders, loaders, and the pipeline

pub use hyperload_core as types;
pub use hyperload_engine as engine;
pub use hyperload_staging as staging;
pub use hyperload_storage as storage;

pub use hyperload_core::{
    BoundedKvStore, CompositeHasher, DocumentCollection, DocumentStore, Entity, Error,
    KvCollection, Link, Result, Sha256CompositeHasher, Terminal, Typedef, WILDCARD,
};
pub use hyperload_engine::{ExpressionSource, Pipeline, PipelineConfig, PipelineReport, VecSource};
pub use hyperload_staging::StagingArea;
