//! Staging area for the hyperload pipeline
//!
//! This crate holds parsed entities between the parser threads and the
//! pipeline stages:
//! - StagingArea: three deduplicating entity sets, each behind its own lock
//! - Link snapshot: frozen once after parsing, shared read-only afterwards
//! - PhaseCounters: parse/build/upload completion counters

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod area;
pub mod counters;

pub use area::StagingArea;
pub use counters::{CounterSnapshot, Phase, PhaseCounters};
