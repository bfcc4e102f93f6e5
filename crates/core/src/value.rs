//! Values held by the bounded-value KV store
//!
//! The store keeps JSON. A key holds either a list of entries or, once its
//! values have been split across `{key}_0..{key}_{n-1}`, the chunk count `n`.
//!
//! Encoding:
//! - `Token(t)` -> `"t"`
//! - `Targeted { head, targets }` -> `["head", ["t1", "t2"]]`
//! - `ChunkCount(n)` -> `n`
//!
//! Decoding is lenient about targeted entries because stores and earlier loads
//! do not always round-trip nested arrays identically; see [`ValueEntry::from_json`].

use serde_json::Value;

use crate::error::{Error, Result};

/// One element of a stored value list
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueEntry {
    /// Plain token
    Token(String),
    /// Head token with the link's targets
    Targeted {
        /// Link hash
        head: String,
        /// Target hashes
        targets: Vec<String>,
    },
}

impl ValueEntry {
    /// Build a targeted entry
    pub fn targeted(head: impl Into<String>, targets: Vec<String>) -> Self {
        ValueEntry::Targeted {
            head: head.into(),
            targets,
        }
    }

    /// Head token (the token itself for plain entries)
    pub fn head(&self) -> &str {
        match self {
            ValueEntry::Token(t) => t,
            ValueEntry::Targeted { head, .. } => head,
        }
    }

    /// JSON encoding of this entry
    pub fn to_json(&self) -> Value {
        match self {
            ValueEntry::Token(t) => Value::String(t.clone()),
            ValueEntry::Targeted { head, targets } => Value::Array(vec![
                Value::String(head.clone()),
                Value::Array(targets.iter().cloned().map(Value::String).collect()),
            ]),
        }
    }

    /// Decode an entry read back from the store.
    ///
    /// Accepted shapes:
    /// - `"t"` -> `Token`
    /// - `["h", ["t1", ...]]` -> `Targeted`
    /// - `["h", "t1"]` -> `Targeted` with one target
    /// - `["h", "t1", "t2", ...]` -> `Targeted` (flat tuple)
    /// - `["h"]` -> `Targeted` with no targets
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(ValueEntry::Token(s.clone())),
            Value::Array(items) => {
                let (head, rest) = items
                    .split_first()
                    .ok_or_else(|| Error::Serialization("empty value entry".to_string()))?;
                let head = as_token(head)?;
                let targets = match rest {
                    [Value::Array(nested)] => nested.iter().map(as_token).collect::<Result<_>>()?,
                    flat => flat.iter().map(as_token).collect::<Result<_>>()?,
                };
                Ok(ValueEntry::Targeted { head, targets })
            }
            other => Err(Error::Serialization(format!(
                "unexpected value entry: {}",
                other
            ))),
        }
    }

    /// Convert to the shape of `like`, so merged lists are homogeneous.
    ///
    /// A targeted entry becomes a plain token by dropping its targets; a plain
    /// token becomes a targeted entry with no targets.
    pub fn normalized_like(self, like: &ValueEntry) -> Self {
        match (self, like) {
            (ValueEntry::Targeted { head, .. }, ValueEntry::Token(_)) => ValueEntry::Token(head),
            (ValueEntry::Token(t), ValueEntry::Targeted { .. }) => ValueEntry::Targeted {
                head: t,
                targets: Vec::new(),
            },
            (entry, _) => entry,
        }
    }
}

fn as_token(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(Error::Serialization(format!(
            "expected a string token, found {}",
            other
        ))),
    }
}

/// Whole value stored under one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvValue {
    /// The key's values, or one chunk of them
    Entries(Vec<ValueEntry>),
    /// Number of `{key}_i` chunks the values were split into
    ChunkCount(u64),
}

impl KvValue {
    /// JSON encoding of this value
    pub fn to_json(&self) -> Value {
        match self {
            KvValue::Entries(entries) => Value::Array(entries.iter().map(ValueEntry::to_json).collect()),
            KvValue::ChunkCount(n) => Value::from(*n),
        }
    }

    /// Decode a value read back from the store
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(KvValue::Entries(
                items.iter().map(ValueEntry::from_json).collect::<Result<_>>()?,
            )),
            Value::Number(n) => n
                .as_u64()
                .map(KvValue::ChunkCount)
                .ok_or_else(|| Error::Serialization(format!("invalid chunk count: {}", n))),
            other => Err(Error::Serialization(format!("unexpected stored value: {}", other))),
        }
    }

    /// Entries, if this is not a chunk count
    pub fn entries(&self) -> Option<&[ValueEntry]> {
        match self {
            KvValue::Entries(e) => Some(e),
            KvValue::ChunkCount(_) => None,
        }
    }
}

/// Key under which chunk `index` of `key` is stored
pub fn chunk_key(key: &str, index: usize) -> String {
    format!("{}_{}", key, index)
}
