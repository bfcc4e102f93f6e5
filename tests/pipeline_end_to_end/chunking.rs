//! Keys whose value lists overflow one block

use crate::common::*;
use serde_json::json;

const CHILDREN: usize = 10;

/// `CHILDREN` concepts all inheriting from `mammal`
fn crowded() -> KnowledgeBase {
    let mut kb = KnowledgeBase::default();
    kb.typedef("Concept").typedef("Inheritance").concept("mammal");
    for i in 0..CHILDREN {
        let name = format!("child{}", i);
        kb.concept(&name).link("Inheritance", &[name.as_str(), "mammal"]);
    }
    kb
}

fn small_blocks(t: &TestPipeline) -> PipelineConfig {
    PipelineConfig {
        block_size: 4,
        ..t.config()
    }
}

#[test]
fn test_incoming_set_is_split_into_chunks() {
    let t = TestPipeline::new();
    let kb = crowded();
    let report = t.pipeline(small_blocks(&t)).run(vec![kb.source("crowded")]).unwrap();

    // 10 values in blocks of 4: 4 + 4 + 2
    let mammal = node("mammal");
    assert_eq!(t.kv.get(KvCollection::IncomingSet, &mammal).unwrap(), Some(json!(3)));
    for i in 0..3 {
        assert!(t.kv.get(KvCollection::IncomingSet, &chunk_key(&mammal, i)).unwrap().is_some());
    }
    assert_eq!(t.kv.get(KvCollection::IncomingSet, &chunk_key(&mammal, 3)).unwrap(), None);

    let entries = stored(&t.kv, KvCollection::IncomingSet, &mammal);
    assert_eq!(entries.len(), CHILDREN);
    assert_eq!(heads(&entries), hashes(&kb.links));

    let load = report.load_for(KvCollection::IncomingSet).unwrap();
    assert_eq!(load.chunked_keys, 1);
    // mammal plus one key per child
    assert_eq!(load.keys, CHILDREN as u64 + 1);
}

#[test]
fn test_unchunked_keys_stay_plain() {
    let t = TestPipeline::new();
    let kb = crowded();
    t.pipeline(small_blocks(&t)).run(vec![kb.source("crowded")]).unwrap();

    let child = node("child0");
    let value = t.kv.get(KvCollection::IncomingSet, &child).unwrap().unwrap();
    assert!(value.is_array());
    assert_eq!(t.kv.get(KvCollection::IncomingSet, &chunk_key(&child, 0)).unwrap(), None);
    assert_eq!(
        stored(&t.kv, KvCollection::OutgoingSet, &kb.links[0].hash_code),
        vec![ValueEntry::Token(node("child0")), ValueEntry::Token(node("mammal"))]
    );
}

#[test]
fn test_targets_collections_use_quarter_blocks() {
    let t = TestPipeline::new();
    let kb = crowded();
    let report = t.pipeline(small_blocks(&t)).run(vec![kb.source("crowded")]).unwrap();

    // Block size 4 / 4 = 1 link per block
    let inheritance = type_hash("Inheritance");
    assert_eq!(
        t.kv.get(KvCollection::Templates, &inheritance).unwrap(),
        Some(json!(CHILDREN))
    );
    let entries = stored(&t.kv, KvCollection::Templates, &inheritance);
    assert_eq!(heads(&entries), hashes(&kb.links));
    assert!(entries.iter().all(|e| matches!(
        e,
        ValueEntry::Targeted { targets, .. } if targets.len() == 2
    )));

    let key = h(&[inheritance.as_str(), WILDCARD, node("mammal").as_str()]);
    assert_eq!(stored(&t.kv, KvCollection::Patterns, &key).len(), CHILDREN);
    assert!(report.load_for(KvCollection::Patterns).unwrap().chunked_keys > 0);
}

#[test]
fn test_chunks_fit_a_tight_value_ceiling() {
    // Ten entries of a 32-char hash cannot fit 256 bytes, four can
    let t = TestPipeline::with_kv(InMemoryKvStore::with_max_value_bytes(256));
    let kb = crowded();
    t.pipeline(small_blocks(&t)).run(vec![kb.source("crowded")]).unwrap();
    assert_eq!(stored(&t.kv, KvCollection::IncomingSet, &node("mammal")).len(), CHILDREN);

    let t = TestPipeline::with_kv(InMemoryKvStore::with_max_value_bytes(256));
    let err = t.pipeline(t.config()).run(vec![kb.source("crowded")]).unwrap_err();
    match err {
        Error::StageFailed { source, .. } => {
            assert!(matches!(*source, Error::ValueTooLarge { .. }))
        }
        other => panic!("expected stage failure, got {:?}", other),
    }
}
