//! Wildcard pattern index
//!
//! For a link with type hash `T` and elements `e1..ea`, every key is an
//! `a + 1` slot list where each slot is either its concrete token or
//! [`WILDCARD`]. All `2^(a+1)` combinations are emitted except the fully
//! concrete one, which would only ever match the link itself. A query with
//! any subset of known targets and/or a known type maps to exactly one key.
//!
//! Keys are reduced with the composite hasher before they are written; the
//! value is `[link, e1..ea]`.

use hyperload_core::{Handle, KvCollection, Link, Result, WILDCARD};
use hyperload_storage::RecordWriter;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::debug;

use super::{BuildContext, IndexBuilder};
use crate::config::DEFAULT_MAX_PATTERN_ARITY;

/// One pattern key, type slot first
pub type PatternKey<'a> = SmallVec<[&'a str; 4]>;

/// Every wildcard combination of `[type_hash, *elements]` but the all-concrete one.
///
/// The first key is always `[WILDCARD, *elements]`. Produces `2^(a+1) - 1`
/// distinct keys for arity `a`: 3, 7, and 15 for arities 1, 2, and 3.
pub fn pattern_keys<'a>(type_hash: &'a str, elements: &'a [Handle]) -> Vec<PatternKey<'a>> {
    let slots = elements.len() + 1;
    let combinations = match u32::try_from(slots).ok().and_then(|s| 1usize.checked_shl(s)) {
        Some(n) => n,
        None => return Vec::new(),
    };

    // Bit 0 wildcards the type slot, bit i the i-th element
    (1..combinations)
        .map(|mask| {
            let mut key = PatternKey::with_capacity(slots);
            key.push(if mask & 1 != 0 { WILDCARD } else { type_hash });
            for (i, element) in elements.iter().enumerate() {
                let wildcard = mask & (1 << (i + 1)) != 0;
                key.push(if wildcard { WILDCARD } else { element.as_str() });
            }
            key
        })
        .collect()
}

/// Writes the `patterns` file
#[derive(Debug, Clone)]
pub struct PatternBuilder {
    exclusions: FxHashSet<String>,
    max_arity: usize,
}

impl Default for PatternBuilder {
    fn default() -> Self {
        Self::new(FxHashSet::default(), DEFAULT_MAX_PATTERN_ARITY)
    }
}

const OUTPUTS: &[KvCollection] = &[KvCollection::Patterns];

impl PatternBuilder {
    /// Skip links whose named type is in `exclusions` or whose arity exceeds `max_arity`
    pub fn new(exclusions: FxHashSet<String>, max_arity: usize) -> Self {
        Self {
            exclusions,
            max_arity,
        }
    }

    /// Whether `link` gets pattern keys at all
    pub fn indexes(&self, link: &Link) -> bool {
        link.arity() <= self.max_arity && !self.exclusions.contains(&link.named_type)
    }
}

impl IndexBuilder for PatternBuilder {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn outputs(&self) -> &'static [KvCollection] {
        OUTPUTS
    }

    fn write(&self, ctx: &BuildContext<'_>) -> Result<Vec<(KvCollection, RecordWriter)>> {
        let mut patterns = ctx.writer(KvCollection::Patterns)?;
        let mut skipped = 0u64;
        for link in ctx.links {
            if !self.indexes(link) {
                skipped += 1;
                continue;
            }
            let value = link.handle_with_targets();
            for key in pattern_keys(&link.named_type_hash, &link.elements) {
                patterns.write_record(&key, &value)?;
            }
        }
        if skipped > 0 {
            debug!(target: "hyperload::build", skipped, "Links left out of the pattern index");
        }
        Ok(vec![(KvCollection::Patterns, patterns)])
    }
}
