//! End-to-end pipeline tests
//!
//! Every test drives a full parse, build, and load over the in-memory
//! stores and inspects what landed in them.

#[path = "../common/mod.rs"]
mod common;

mod chunking;
mod failures;
mod full_load;
mod update_mode;
