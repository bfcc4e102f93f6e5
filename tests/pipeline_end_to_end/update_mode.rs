//! Loads merging into an already populated KV store

use crate::common::*;

fn first_load(t: &TestPipeline) -> KnowledgeBase {
    let mut kb = KnowledgeBase::default();
    kb.typedef("Concept").typedef("Inheritance");
    kb.concept("human").concept("monkey").concept("mammal");
    kb.link("Inheritance", &["human", "mammal"])
        .link("Inheritance", &["monkey", "mammal"]);
    t.pipeline(PipelineConfig::in_dir(t.dir.path().join("first")))
        .run(vec![kb.source("first")])
        .unwrap();
    kb
}

#[test]
fn test_update_merges_with_stored_values() {
    let t = TestPipeline::new();
    let first = first_load(&t);

    let mut second = KnowledgeBase::default();
    second.typedef("Concept").typedef("Inheritance");
    second.concept("chimp").concept("human").concept("mammal");
    second
        .link("Inheritance", &["chimp", "mammal"])
        .link("Inheritance", &["human", "mammal"]);
    let config = PipelineConfig {
        update: true,
        allow_duplicates: true,
        ..PipelineConfig::in_dir(t.dir.path().join("second"))
    };
    let report = t.pipeline(config).run(vec![second.source("second")]).unwrap();
    assert_eq!(report.counters.upload, 5);

    let incoming = stored(&t.kv, KvCollection::IncomingSet, &node("mammal"));
    assert_eq!(incoming.len(), 3);
    assert_eq!(heads(&incoming), hashes(first.links.iter().chain(&second.links)));

    // Stored entries come first, new ones are appended
    let stored_first: Vec<&str> = incoming[..2].iter().map(ValueEntry::head).collect();
    assert_eq!(stored_first.len(), 2);
    assert!(first.links.iter().all(|l| stored_first.contains(&l.hash_code.as_str())));

    let templates = stored(&t.kv, KvCollection::Templates, &type_hash("Inheritance"));
    assert_eq!(templates.len(), 3);

    assert_eq!(t.documents.count(DocumentCollection::Nodes), 4);
    assert_eq!(report.flush.terminals.duplicates, 2);
}

#[test]
fn test_overwrite_replaces_stored_values() {
    let t = TestPipeline::new();
    first_load(&t);

    let mut second = KnowledgeBase::default();
    second.typedef("Concept").typedef("Inheritance").concept("chimp").concept("mammal");
    second.link("Inheritance", &["chimp", "mammal"]);
    let config = PipelineConfig {
        allow_duplicates: true,
        ..PipelineConfig::in_dir(t.dir.path().join("second"))
    };
    t.pipeline(config).run(vec![second.source("second")]).unwrap();

    let incoming = stored(&t.kv, KvCollection::IncomingSet, &node("mammal"));
    assert_eq!(heads(&incoming), hashes(&second.links));
}

#[test]
fn test_update_rejects_multi_block_keys() {
    let t = TestPipeline::new();
    let mut kb = KnowledgeBase::default();
    kb.typedef("Concept").typedef("Inheritance").concept("mammal");
    for i in 0..6 {
        let name = format!("child{}", i);
        kb.concept(&name).link("Inheritance", &[name.as_str(), "mammal"]);
    }
    let config = PipelineConfig {
        update: true,
        block_size: 4,
        ..t.config()
    };

    let err = t.pipeline(config).run(vec![kb.source("crowded")]).unwrap_err();
    assert!(err.is_fatal());
    match &err {
        Error::StageFailed { stage, source } => {
            assert_eq!(stage, "incoming_set");
            assert!(matches!(**source, Error::ChunkedUpdate { .. }));
        }
        other => panic!("expected stage failure, got {:?}", other),
    }
    assert_eq!(t.kv.get(KvCollection::IncomingSet, &node("mammal")).unwrap(), None);
}
