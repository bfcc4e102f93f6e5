//! Shared test utilities for the root integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Once};

pub use hyperload::engine::read_full_value;
pub use hyperload::storage::{InMemoryDocumentStore, InMemoryKvStore};
pub use hyperload::types::{chunk_key, ValueEntry};
pub use hyperload::{
    BoundedKvStore, CompositeHasher, DocumentCollection, DocumentStore, Entity, Error,
    ExpressionSource, KvCollection, Link, Pipeline, PipelineConfig, Sha256CompositeHasher,
    StagingArea, Terminal, Typedef, VecSource, WILDCARD,
};
use tempfile::TempDir;

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route pipeline logs to the test harness output
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Hashing helpers
// ============================================================================

pub fn h(parts: &[&str]) -> String {
    Sha256CompositeHasher.composite_hash(parts)
}

/// Hash of a type name
pub fn type_hash(name: &str) -> String {
    h(&["type", name])
}

/// Hash of a Concept node
pub fn node(name: &str) -> String {
    h(&["Concept", name])
}

// ============================================================================
// Knowledge base fixture
// ============================================================================

/// A small typed hypergraph
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    pub typedefs: Vec<Typedef>,
    pub terminals: Vec<Terminal>,
    pub links: Vec<Link>,
}

impl KnowledgeBase {
    pub fn typedef(&mut self, name: &str) -> &mut Self {
        self.typedefs.push(Typedef {
            hash_code: h(&["typedef", name]),
            named_type: name.to_string(),
            named_type_hash: type_hash(name),
            composite_type_hash: type_hash("Type"),
        });
        self
    }

    pub fn concept(&mut self, name: &str) -> &mut Self {
        self.terminals.push(Terminal {
            hash_code: node(name),
            terminal_name: name.to_string(),
            named_type: "Concept".to_string(),
            composite_type_hash: type_hash("Concept"),
        });
        self
    }

    /// Link of type `named_type` over Concept nodes
    pub fn link(&mut self, named_type: &str, targets: &[&str]) -> &mut Self {
        let link = concept_link(named_type, targets);
        self.links.push(link);
        self
    }

    pub fn entities(&self) -> Vec<Entity> {
        let mut out: Vec<Entity> = Vec::new();
        out.extend(self.typedefs.iter().cloned().map(Entity::from));
        out.extend(self.terminals.iter().cloned().map(Entity::from));
        out.extend(self.links.iter().cloned().map(Entity::from));
        out
    }

    pub fn source(&self, name: &str) -> Box<dyn ExpressionSource> {
        Box::new(VecSource::new(name, self.entities()))
    }
}

pub fn concept_link(named_type: &str, targets: &[&str]) -> Link {
    let type_h = type_hash(named_type);
    let mut signature = vec![type_h.clone()];
    signature.extend(targets.iter().map(|_| type_hash("Concept")));
    let signature: Vec<&str> = signature.iter().map(String::as_str).collect();
    Link::new(
        &Sha256CompositeHasher,
        named_type,
        type_h,
        h(&signature),
        targets.iter().map(|t| node(t)).collect(),
    )
    .toplevel()
}

/// Animals: Concept nodes with Inheritance and Similarity links
pub fn animals() -> KnowledgeBase {
    let mut kb = KnowledgeBase::default();
    kb.typedef("Concept").typedef("Inheritance").typedef("Similarity").typedef("List");
    for name in ["human", "monkey", "chimp", "snake", "earthworm", "mammal", "animal", "reptile"] {
        kb.concept(name);
    }
    kb.link("Inheritance", &["human", "mammal"])
        .link("Inheritance", &["monkey", "mammal"])
        .link("Inheritance", &["chimp", "mammal"])
        .link("Inheritance", &["mammal", "animal"])
        .link("Inheritance", &["reptile", "animal"])
        .link("Inheritance", &["snake", "reptile"])
        .link("Similarity", &["human", "monkey"])
        .link("Similarity", &["human", "chimp"])
        .link("Similarity", &["chimp", "monkey"])
        .link("List", &["earthworm"])
        .link("List", &["human", "monkey", "chimp"])
        .link("List", &["snake", "earthworm", "reptile", "animal"]);
    kb
}

// ============================================================================
// Pipeline harness
// ============================================================================

/// A pipeline over in-memory stores rooted in a private temp dir
pub struct TestPipeline {
    pub dir: TempDir,
    pub documents: Arc<InMemoryDocumentStore>,
    pub kv: Arc<InMemoryKvStore>,
}

impl TestPipeline {
    pub fn new() -> Self {
        Self::with_kv(InMemoryKvStore::new())
    }

    pub fn with_kv(kv: InMemoryKvStore) -> Self {
        init_tracing();
        Self {
            dir: tempfile::tempdir().unwrap(),
            documents: Arc::new(InMemoryDocumentStore::new()),
            kv: Arc::new(kv),
        }
    }

    /// Defaults rooted in this harness' temp dir
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig::in_dir(self.dir.path())
    }

    /// A fresh pipeline sharing this harness' stores
    pub fn pipeline(&self, config: PipelineConfig) -> Pipeline {
        Pipeline::new(config, self.documents.clone(), self.kv.clone()).unwrap()
    }
}

// ============================================================================
// KV inspection
// ============================================================================

/// Full value list of `key`, following chunks; empty when absent
pub fn stored(kv: &InMemoryKvStore, collection: KvCollection, key: &str) -> Vec<ValueEntry> {
    read_full_value(kv, collection, key).unwrap().unwrap_or_default()
}

/// Head tokens of a value list
pub fn heads(entries: &[ValueEntry]) -> BTreeSet<String> {
    entries.iter().map(|e| e.head().to_string()).collect()
}

/// Hashes of the given links
pub fn hashes<'a>(links: impl IntoIterator<Item = &'a Link>) -> BTreeSet<String> {
    links.into_iter().map(|l| l.hash_code.clone()).collect()
}
