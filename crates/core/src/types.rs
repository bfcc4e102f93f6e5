//! Core entity types
//!
//! Three kinds of entity flow through the pipeline:
//! - [`Typedef`]: a named type declaration, no targets
//! - [`Terminal`]: a node, identified by its content hash and carrying a name
//! - [`Link`]: a typed, ordered n-ary expression over other entities' hashes
//!
//! Every entity is content addressed. Equality and hashing use `hash_code`
//! only, so two links with the same type and targets collapse into one entry
//! of any set they are staged into.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::hash::{Hash, Hasher};

use crate::hasher::CompositeHasher;

/// Content hash of an entity, as a hex token
pub type Handle = String;

/// Reserved token standing for "any value" in a pattern key
pub const WILDCARD: &str = "*";

/// Named type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Typedef {
    /// Content hash of the declaration
    pub hash_code: Handle,
    /// Name of the declared type
    pub named_type: String,
    /// Hash of the declared type name
    pub named_type_hash: Handle,
    /// Hash of the type this type is declared as
    pub composite_type_hash: Handle,
}

/// A node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Terminal {
    /// Content hash of the node
    pub hash_code: Handle,
    /// Node name, free text
    pub terminal_name: String,
    /// Name of the node's type
    pub named_type: String,
    /// Hash of the node's type
    pub composite_type_hash: Handle,
}

/// A typed, ordered link over target hashes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Content hash, derived from `named_type_hash` and `elements`
    pub hash_code: Handle,
    /// Name of the link type
    pub named_type: String,
    /// Hash of the link type name
    pub named_type_hash: Handle,
    /// Hash of the full type signature, target types included
    pub composite_type_hash: Handle,
    /// Target hashes, in order
    pub elements: Vec<Handle>,
    /// Whether the link appeared at the top level of its source
    #[serde(default)]
    pub is_toplevel: bool,
}

impl Typedef {
    /// Document-store record for this typedef
    pub fn to_document(&self) -> Value {
        json!({
            "_id": self.hash_code,
            "composite_type_hash": self.composite_type_hash,
            "named_type": self.named_type,
            "named_type_hash": self.named_type_hash,
        })
    }
}

impl Terminal {
    /// Document-store record for this node
    pub fn to_document(&self) -> Value {
        json!({
            "_id": self.hash_code,
            "composite_type_hash": self.composite_type_hash,
            "name": self.terminal_name,
            "named_type": self.named_type,
        })
    }
}

impl Link {
    /// Build a link, deriving its content hash from the type hash and targets.
    pub fn new(
        hasher: &dyn CompositeHasher,
        named_type: impl Into<String>,
        named_type_hash: impl Into<Handle>,
        composite_type_hash: impl Into<Handle>,
        elements: Vec<Handle>,
    ) -> Self {
        let named_type_hash = named_type_hash.into();
        let hash_code = Self::compute_hash(hasher, &named_type_hash, &elements);
        Self {
            hash_code,
            named_type: named_type.into(),
            named_type_hash,
            composite_type_hash: composite_type_hash.into(),
            elements,
            is_toplevel: false,
        }
    }

    /// Mark the link as top level
    pub fn toplevel(mut self) -> Self {
        self.is_toplevel = true;
        self
    }

    /// `composite_hash([named_type_hash, *elements])`
    pub fn compute_hash(
        hasher: &dyn CompositeHasher,
        named_type_hash: &str,
        elements: &[Handle],
    ) -> Handle {
        let mut parts: Vec<&str> = Vec::with_capacity(elements.len() + 1);
        parts.push(named_type_hash);
        parts.extend(elements.iter().map(String::as_str));
        hasher.composite_hash(&parts)
    }

    /// Number of targets
    #[inline]
    pub fn arity(&self) -> usize {
        self.elements.len()
    }

    /// `[hash_code, *elements]`, the value written to the pattern and template indices
    pub fn handle_with_targets(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(self.elements.len() + 1);
        out.push(&self.hash_code);
        out.extend(self.elements.iter().map(String::as_str));
        out
    }

    /// Document-store record for this link.
    ///
    /// Targets are spread over `key_0..key_{n-1}`; links of arity three or more
    /// also carry the full `keys` array.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("_id".into(), json!(self.hash_code));
        doc.insert("composite_type_hash".into(), json!(self.composite_type_hash));
        doc.insert("named_type".into(), json!(self.named_type));
        doc.insert("named_type_hash".into(), json!(self.named_type_hash));
        doc.insert("is_toplevel".into(), json!(self.is_toplevel));
        for (i, element) in self.elements.iter().enumerate() {
            doc.insert(format!("key_{}", i), json!(element));
        }
        if self.arity() >= 3 {
            doc.insert("keys".into(), json!(self.elements));
        }
        Value::Object(doc)
    }
}

macro_rules! content_addressed {
    ($($ty:ty),*) => {$(
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.hash_code == other.hash_code
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.hash_code.hash(state);
            }
        }
    )*};
}

content_addressed!(Typedef, Terminal, Link);

/// Any stageable entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    /// Type declaration
    Typedef(Typedef),
    /// Node
    Terminal(Terminal),
    /// Link
    Link(Link),
}

impl Entity {
    /// Content hash of the wrapped entity
    pub fn hash_code(&self) -> &str {
        match self {
            Entity::Typedef(t) => &t.hash_code,
            Entity::Terminal(t) => &t.hash_code,
            Entity::Link(l) => &l.hash_code,
        }
    }
}

impl From<Typedef> for Entity {
    fn from(t: Typedef) -> Self {
        Entity::Typedef(t)
    }
}

impl From<Terminal> for Entity {
    fn from(t: Terminal) -> Self {
        Entity::Terminal(t)
    }
}

impl From<Link> for Entity {
    fn from(l: Link) -> Self {
        Entity::Link(l)
    }
}
