//! Shared staging area between parser threads and pipeline stages
//!
//! # Design
//!
//! - One lock per entity kind; no global lock, so a parser staging a link
//!   never waits on one staging a terminal
//! - Critical sections are insert or take only; no I/O under a lock
//! - Typedefs and terminals are drained destructively by the document loader
//! - Links are frozen exactly once into an immutable snapshot that every
//!   builder reads without further synchronization
//!
//! # Ordering contract
//!
//! [`StagingArea::freeze_links`] must run after every parser has finished.
//! Links staged afterwards would be invisible to the builders, so
//! [`StagingArea::add_link`] rejects them with `StagingFrozen`.

use hyperload_core::{Entity, Error, Link, Result, Terminal, Typedef};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::counters::PhaseCounters;

/// Process-wide buffers for parsed entities
#[derive(Debug)]
pub struct StagingArea {
    typedefs: Mutex<FxHashSet<Typedef>>,
    terminals: Mutex<FxHashSet<Terminal>>,
    /// `None` once frozen
    links: Mutex<Option<FxHashSet<Link>>>,
    snapshot: OnceCell<Arc<[Link]>>,
    pattern_exclusions: RwLock<FxHashSet<String>>,
    counters: PhaseCounters,
}

impl Default for StagingArea {
    fn default() -> Self {
        Self::new()
    }
}

impl StagingArea {
    /// Create an empty staging area
    pub fn new() -> Self {
        Self {
            typedefs: Mutex::new(FxHashSet::default()),
            terminals: Mutex::new(FxHashSet::default()),
            links: Mutex::new(Some(FxHashSet::default())),
            snapshot: OnceCell::new(),
            pattern_exclusions: RwLock::new(FxHashSet::default()),
            counters: PhaseCounters::new(),
        }
    }

    /// Create a staging area with named types excluded from the pattern index
    pub fn with_pattern_exclusions<I, S>(exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let area = Self::new();
        area.pattern_exclusions
            .write()
            .extend(exclusions.into_iter().map(Into::into));
        area
    }

    // ========================================================================
    // Staging
    // ========================================================================

    /// Stage any entity.
    ///
    /// Returns `true` if the entity was new, `false` if an entity with the
    /// same hash was already staged.
    ///
    /// # Errors
    ///
    /// Returns `StagingFrozen` for a link staged after the snapshot.
    pub fn add(&self, entity: impl Into<Entity>) -> Result<bool> {
        match entity.into() {
            Entity::Typedef(t) => Ok(self.add_typedef(t)),
            Entity::Terminal(t) => Ok(self.add_terminal(t)),
            Entity::Link(l) => self.add_link(l),
        }
    }

    /// Stage a type declaration
    pub fn add_typedef(&self, typedef: Typedef) -> bool {
        self.typedefs.lock().insert(typedef)
    }

    /// Stage a node
    pub fn add_terminal(&self, terminal: Terminal) -> bool {
        self.terminals.lock().insert(terminal)
    }

    /// Stage a link
    ///
    /// # Errors
    ///
    /// Returns `StagingFrozen` once [`freeze_links`](Self::freeze_links) ran.
    pub fn add_link(&self, link: Link) -> Result<bool> {
        let mut guard = self.links.lock();
        match guard.as_mut() {
            Some(set) => Ok(set.insert(link)),
            None => Err(Error::StagingFrozen(link.hash_code)),
        }
    }

    /// Exclude a named type from the pattern index
    pub fn exclude_from_patterns(&self, named_type: impl Into<String>) {
        self.pattern_exclusions.write().insert(named_type.into());
    }

    /// Copy of the current pattern exclusion list
    pub fn pattern_exclusions(&self) -> FxHashSet<String> {
        self.pattern_exclusions.read().clone()
    }

    // ========================================================================
    // Draining
    // ========================================================================

    /// Take every staged typedef, leaving the set empty
    pub fn drain_typedefs(&self) -> Vec<Typedef> {
        let taken = std::mem::take(&mut *self.typedefs.lock());
        taken.into_iter().collect()
    }

    /// Take every staged terminal, leaving the set empty
    pub fn drain_terminals(&self) -> Vec<Terminal> {
        let taken = std::mem::take(&mut *self.terminals.lock());
        taken.into_iter().collect()
    }

    // ========================================================================
    // Link snapshot
    // ========================================================================

    /// Freeze the link set into the immutable snapshot.
    ///
    /// The snapshot is sorted by hash so every run over the same input sees
    /// the same order.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotAlreadyTaken` on a second call.
    pub fn freeze_links(&self) -> Result<Arc<[Link]>> {
        let set = self
            .links
            .lock()
            .take()
            .ok_or(Error::SnapshotAlreadyTaken)?;

        let mut links: Vec<Link> = set.into_iter().collect();
        links.sort_unstable_by(|a, b| a.hash_code.cmp(&b.hash_code));
        let snapshot: Arc<[Link]> = links.into();

        if self.snapshot.set(Arc::clone(&snapshot)).is_err() {
            return Err(Error::SnapshotAlreadyTaken);
        }
        info!(target: "hyperload::staging", links = snapshot.len(), "Link snapshot taken");
        Ok(snapshot)
    }

    /// The frozen link snapshot
    ///
    /// # Errors
    ///
    /// Returns `SnapshotNotReady` before [`freeze_links`](Self::freeze_links).
    pub fn link_snapshot(&self) -> Result<Arc<[Link]>> {
        self.snapshot.get().cloned().ok_or(Error::SnapshotNotReady)
    }

    /// Whether the link snapshot has been taken
    pub fn is_frozen(&self) -> bool {
        self.snapshot.get().is_some()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Number of staged typedefs
    pub fn typedef_count(&self) -> usize {
        self.typedefs.lock().len()
    }

    /// Number of staged terminals
    pub fn terminal_count(&self) -> usize {
        self.terminals.lock().len()
    }

    /// Number of staged links, or snapshot size once frozen
    pub fn link_count(&self) -> usize {
        if let Some(snapshot) = self.snapshot.get() {
            return snapshot.len();
        }
        self.links.lock().as_ref().map_or(0, |set| set.len())
    }

    /// Completion counters
    pub fn counters(&self) -> &PhaseCounters {
        &self.counters
    }

    /// Log a summary of what is currently staged
    pub fn log_summary(&self) {
        debug!(
            target: "hyperload::staging",
            typedefs = self.typedef_count(),
            terminals = self.terminal_count(),
            links = self.link_count(),
            frozen = self.is_frozen(),
            "Staging area summary"
        );
    }
}
