//! Temporary-file storage layer for hyperload
//!
//! This crate owns everything between the index builders and the loaders:
//! - TempFiles: the collection -> temporary file map
//! - RecordWriter: append-only `key,value...` writer with token validation
//! - MergeSorter: external, stable sort by first field with atomic replace
//! - KeyValueRuns: lazy grouped reader yielding bounded blocks per key
//! - InMemoryDocumentStore / InMemoryKvStore: reference backing stores
//!
//! # Record format
//!
//! One record per line, comma-delimited, key first. Keys and list tokens are
//! content hashes and never contain the delimiter; free-text values are
//! read back with the merge-rest layout.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod files;
pub mod memory;
pub mod reader;
pub mod sort;
pub mod writer;

pub use files::{sorted_sibling, TempFiles};
pub use memory::{InMemoryDocumentStore, InMemoryKvStore, ID_FIELD};
pub use reader::{KeyValueRuns, RunEntry};
pub use sort::{ExternalSorter, MergeSorter, SortStats};
pub use writer::{RecordWriter, FIELD_DELIMITER};
