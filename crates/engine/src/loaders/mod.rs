//! Bulk loaders
//!
//! - [`DocumentLoader`]: typedefs, terminals, and links into the document store
//! - [`KvLoader`]: one sorted temporary file into the bounded KV store

pub mod document;
pub mod kv;

pub use document::{DocumentLoader, FlushReport, InsertStats, LinkUploadReport};
pub use kv::{read_full_value, KvLoader, LoadReport};
