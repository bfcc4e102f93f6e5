//! Core types and traits for hyperload
//!
//! This crate defines the foundational types used throughout the pipeline:
//! - Typedef, Terminal, Link: content-addressed entities
//! - CompositeHasher: the `composite_hash(list) -> hash` seam
//! - DocumentCollection, KvCollection: store collection identifiers
//! - ValueEntry, KvValue: shapes of values held by the bounded KV store
//! - BlockLimits: per-collection value-count thresholds
//! - DocumentStore, BoundedKvStore: backing-store traits
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collections;
pub mod error;
pub mod hasher;
pub mod limits;
pub mod traits;
pub mod types;
pub mod value;

pub use collections::{DocumentCollection, FieldLayout, KvCollection};
pub use error::{Error, Result};
pub use hasher::{CompositeHasher, Sha256CompositeHasher};
pub use limits::BlockLimits;
pub use traits::{BoundedKvStore, DocumentStore};
pub use types::{Entity, Handle, Link, Terminal, Typedef, WILDCARD};
pub use value::{chunk_key, KvValue, ValueEntry};
