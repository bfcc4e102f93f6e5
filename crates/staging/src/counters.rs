//! Phase completion counters
//!
//! Counters are the only cross-thread progress signal. Each phase has its
//! own atomic, so incrementing one never contends with another, and readers
//! get a point-in-time value without blocking writers.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Pipeline phases that report completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// A parser finished feeding the staging area
    Parse,
    /// An index builder (or the non-link flush) finished its files
    Build,
    /// A KV loader finished uploading one collection
    Upload,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Parse => "parse",
            Phase::Build => "build",
            Phase::Upload => "upload",
        };
        f.write_str(name)
    }
}

/// Monotonic completion counters, one per phase
#[derive(Debug, Default)]
pub struct PhaseCounters {
    parse: AtomicU64,
    build: AtomicU64,
    upload: AtomicU64,
    links_uploaded: AtomicBool,
}

impl PhaseCounters {
    /// Fresh counters, all zero
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, phase: Phase) -> &AtomicU64 {
        match phase {
            Phase::Parse => &self.parse,
            Phase::Build => &self.build,
            Phase::Upload => &self.upload,
        }
    }

    /// Record one completion; returns the new count
    pub fn increment(&self, phase: Phase) -> u64 {
        self.slot(phase).fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Current count for `phase`
    pub fn get(&self, phase: Phase) -> u64 {
        self.slot(phase).load(Ordering::Acquire)
    }

    /// Flag the link documents as uploaded
    pub fn mark_links_uploaded(&self) {
        self.links_uploaded.store(true, Ordering::Release);
    }

    /// Whether the link documents have been uploaded
    pub fn links_uploaded(&self) -> bool {
        self.links_uploaded.load(Ordering::Acquire)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            parse: self.get(Phase::Parse),
            build: self.get(Phase::Build),
            upload: self.get(Phase::Upload),
            links_uploaded: self.links_uploaded(),
        }
    }
}

/// Copy of the counters at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    /// Finished parsers
    pub parse: u64,
    /// Finished builders
    pub build: u64,
    /// Finished KV loaders
    pub upload: u64,
    /// Link documents uploaded
    pub links_uploaded: bool,
}
