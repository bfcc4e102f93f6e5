//! Collection identifiers for both backing stores

use serde::{Deserialize, Serialize};
use std::fmt;

/// Document-store collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCollection {
    /// Type declarations
    AtomTypes,
    /// Terminals
    Nodes,
    /// Links of arity 1
    LinksArity1,
    /// Links of arity 2
    LinksArity2,
    /// Links of arity 3 or more
    LinksArityN,
}

impl DocumentCollection {
    /// Store-side collection name
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCollection::AtomTypes => "atom_types",
            DocumentCollection::Nodes => "nodes",
            DocumentCollection::LinksArity1 => "links_1",
            DocumentCollection::LinksArity2 => "links_2",
            DocumentCollection::LinksArityN => "links_n",
        }
    }

    /// Collection holding links of the given arity
    pub fn for_arity(arity: usize) -> Self {
        match arity {
            0 | 1 => DocumentCollection::LinksArity1,
            2 => DocumentCollection::LinksArity2,
            _ => DocumentCollection::LinksArityN,
        }
    }
}

impl fmt::Display for DocumentCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the fields after the key are read back from a temporary file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLayout {
    /// Exactly `key,value`
    Pair,
    /// `key,rest...` with the rest rejoined into one value
    MergeRest,
    /// `key,value,target...` kept as a `(value, targets)` tuple
    Targets,
}

/// Bounded-KV collections, one temporary file each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KvCollection {
    /// target -> links referencing it
    IncomingSet,
    /// link -> its targets
    OutgoingSet,
    /// wildcard pattern key -> matching links with targets
    Patterns,
    /// type hash -> links of that type with targets
    Templates,
    /// terminal hash -> terminal name
    Names,
}

impl KvCollection {
    /// Number of KV collections
    pub const COUNT: usize = 5;

    /// All KV collections, in load order
    pub const ALL: [KvCollection; Self::COUNT] = [
        KvCollection::IncomingSet,
        KvCollection::OutgoingSet,
        KvCollection::Patterns,
        KvCollection::Templates,
        KvCollection::Names,
    ];

    /// Store-side collection name, also the temporary file stem
    pub fn as_str(&self) -> &'static str {
        match self {
            KvCollection::IncomingSet => "incoming_set",
            KvCollection::OutgoingSet => "outgoing_set",
            KvCollection::Patterns => "patterns",
            KvCollection::Templates => "templates",
            KvCollection::Names => "names",
        }
    }

    /// Record layout of this collection's temporary file
    pub fn layout(&self) -> FieldLayout {
        match self {
            KvCollection::IncomingSet | KvCollection::OutgoingSet => FieldLayout::Pair,
            KvCollection::Patterns | KvCollection::Templates => FieldLayout::Targets,
            KvCollection::Names => FieldLayout::MergeRest,
        }
    }
}

impl fmt::Display for KvCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
