//! Build and load engine for hyperload
//!
//! This crate turns a staged entity set into loaded indices:
//! - PipelineConfig: `hyperload.toml` settings
//! - Index builders: connectivity, pattern, and type-template files
//! - Loaders: document-store inserts and bounded-KV streaming with chunking
//! - Pipeline: the phase orchestrator over scoped threads
//!
//! The engine is the only component that knows about:
//! - Phase ordering (parse, freeze, build, load)
//! - Which builder owns which temporary file
//! - How a collection's block size and update mode are chosen

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builders;
pub mod config;
pub mod loaders;
pub mod pipeline;

pub use builders::{
    pattern_keys, run_builder, BuildContext, BuildReport, ConnectivityBuilder, IndexBuilder,
    PatternBuilder, TypeTemplateBuilder,
};
pub use config::{PipelineConfig, CONFIG_FILE_NAME};
pub use loaders::{
    read_full_value, DocumentLoader, FlushReport, InsertStats, KvLoader, LinkUploadReport,
    LoadReport,
};
pub use pipeline::{ExpressionSource, Pipeline, PipelineReport, VecSource};
