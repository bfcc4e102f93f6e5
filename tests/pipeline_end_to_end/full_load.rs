//! A clean load of the animals knowledge base

use crate::common::*;

fn find<'a>(kb: &'a KnowledgeBase, named_type: &str, targets: &[&str]) -> &'a Link {
    let wanted: Vec<String> = targets.iter().map(|t| node(t)).collect();
    kb.links
        .iter()
        .find(|l| l.named_type == named_type && l.elements == wanted)
        .unwrap()
}

#[test]
fn test_full_load_populates_every_collection() {
    let t = TestPipeline::new();
    let kb = animals();
    let report = t.pipeline(t.config()).run(vec![kb.source("animals")]).unwrap();

    assert_eq!(report.staged, 24);
    assert_eq!(report.links, 12);
    assert_eq!(report.counters.parse, 1);
    assert_eq!(report.counters.build, 4);
    assert_eq!(report.counters.upload, 5);
    assert!(report.counters.links_uploaded);
    assert_eq!(report.loads.len(), 5);

    let docs = &t.documents;
    assert_eq!(docs.count(DocumentCollection::AtomTypes), 4);
    assert_eq!(docs.count(DocumentCollection::Nodes), 8);
    assert_eq!(docs.count(DocumentCollection::LinksArity1), 1);
    assert_eq!(docs.count(DocumentCollection::LinksArity2), 9);
    assert_eq!(docs.count(DocumentCollection::LinksArityN), 2);
    assert_eq!(report.flush.terminals.inserted, 8);
    assert_eq!(report.flush.names, 8);
}

#[test]
fn test_link_documents_spread_targets() {
    let t = TestPipeline::new();
    let kb = animals();
    t.pipeline(t.config()).run(vec![kb.source("animals")]).unwrap();

    let pair = find(&kb, "Inheritance", &["human", "mammal"]);
    let doc = t.documents.get(DocumentCollection::LinksArity2, &pair.hash_code).unwrap();
    assert_eq!(doc["key_0"], node("human").as_str());
    assert_eq!(doc["key_1"], node("mammal").as_str());
    assert!(doc.get("keys").is_none());

    let list = find(&kb, "List", &["snake", "earthworm", "reptile", "animal"]);
    let doc = t.documents.get(DocumentCollection::LinksArityN, &list.hash_code).unwrap();
    assert_eq!(doc["keys"].as_array().unwrap().len(), 4);
}

#[test]
fn test_names_and_connectivity() {
    let t = TestPipeline::new();
    let kb = animals();
    t.pipeline(t.config()).run(vec![kb.source("animals")]).unwrap();
    let kv = &t.kv;

    assert_eq!(kv.len(KvCollection::Names), 8);
    assert_eq!(
        stored(kv, KvCollection::Names, &node("earthworm")),
        vec![ValueEntry::Token("earthworm".into())]
    );

    // Outgoing keeps target order
    let list = find(&kb, "List", &["snake", "earthworm", "reptile", "animal"]);
    let targets: Vec<ValueEntry> = list.elements.iter().cloned().map(ValueEntry::Token).collect();
    assert_eq!(stored(kv, KvCollection::OutgoingSet, &list.hash_code), targets);

    let expected = hashes([
        find(&kb, "Inheritance", &["human", "mammal"]),
        find(&kb, "Similarity", &["human", "monkey"]),
        find(&kb, "Similarity", &["human", "chimp"]),
        find(&kb, "List", &["human", "monkey", "chimp"]),
    ]);
    assert_eq!(heads(&stored(kv, KvCollection::IncomingSet, &node("human"))), expected);
    assert_eq!(kv.len(KvCollection::OutgoingSet), 12);
}

#[test]
fn test_pattern_lookups() {
    let t = TestPipeline::new();
    let kb = animals();
    t.pipeline(t.config()).run(vec![kb.source("animals")]).unwrap();
    let kv = &t.kv;
    let inheritance = type_hash("Inheritance");
    let mammal = node("mammal");

    // Inheritance(*, mammal)
    let key = h(&[inheritance.as_str(), WILDCARD, mammal.as_str()]);
    let entries = stored(kv, KvCollection::Patterns, &key);
    let expected = hashes([
        find(&kb, "Inheritance", &["human", "mammal"]),
        find(&kb, "Inheritance", &["monkey", "mammal"]),
        find(&kb, "Inheritance", &["chimp", "mammal"]),
    ]);
    assert_eq!(heads(&entries), expected);
    for entry in &entries {
        match entry {
            ValueEntry::Targeted { targets, .. } => assert_eq!(targets[1], mammal),
            other => panic!("expected targeted entry, got {:?}", other),
        }
    }

    // Any binary link
    let any = h(&[WILDCARD, WILDCARD, WILDCARD]);
    assert_eq!(stored(kv, KvCollection::Patterns, &any).len(), 9);

    // The ternary List link is indexed, the quaternary one is not
    let ternary = h(&[WILDCARD, WILDCARD, WILDCARD, WILDCARD]);
    assert_eq!(stored(kv, KvCollection::Patterns, &ternary).len(), 1);
    let quaternary = h(&[WILDCARD, WILDCARD, WILDCARD, WILDCARD, WILDCARD]);
    assert_eq!(kv.get(KvCollection::Patterns, &quaternary).unwrap(), None);
}

#[test]
fn test_templates_cover_every_link_of_a_type() {
    let t = TestPipeline::new();
    let kb = animals();
    t.pipeline(t.config()).run(vec![kb.source("animals")]).unwrap();

    let similarity: Vec<&Link> = kb.links.iter().filter(|l| l.named_type == "Similarity").collect();
    let by_type = stored(&t.kv, KvCollection::Templates, &type_hash("Similarity"));
    assert_eq!(heads(&by_type), hashes(similarity.iter().copied()));

    let by_signature = stored(&t.kv, KvCollection::Templates, &similarity[0].composite_type_hash);
    assert_eq!(heads(&by_signature), heads(&by_type));

    // The List links share a type but not a signature
    let lists = stored(&t.kv, KvCollection::Templates, &type_hash("List"));
    assert_eq!(lists.len(), 3);
}

#[test]
fn test_overlapping_sources_are_deduplicated() {
    let t = TestPipeline::new();
    let kb = animals();
    let report = t
        .pipeline(t.config())
        .run(vec![kb.source("first"), kb.source("second"), kb.source("third")])
        .unwrap();

    assert_eq!(report.staged, 24);
    assert_eq!(report.counters.parse, 3);
    assert_eq!(report.flush.typedefs.duplicates, 0);
    assert_eq!(t.documents.count(DocumentCollection::LinksArity2), 9);
    assert_eq!(stored(&t.kv, KvCollection::IncomingSet, &node("human")).len(), 4);
}

#[test]
fn test_excluded_types_skip_patterns_only() {
    let t = TestPipeline::new();
    let kb = animals();
    let config = PipelineConfig {
        pattern_exclusions: vec!["Similarity".into()],
        ..t.config()
    };
    t.pipeline(config).run(vec![kb.source("animals")]).unwrap();

    let any = h(&[WILDCARD, WILDCARD, WILDCARD]);
    let entries = stored(&t.kv, KvCollection::Patterns, &any);
    assert_eq!(entries.len(), 6);
    assert!(entries.iter().all(|e| {
        kb.links
            .iter()
            .any(|l| l.hash_code == e.head() && l.named_type == "Inheritance")
    }));

    assert_eq!(stored(&t.kv, KvCollection::Templates, &type_hash("Similarity")).len(), 3);
    assert_eq!(t.documents.count(DocumentCollection::LinksArity2), 9);
}

#[test]
fn test_temp_files_kept_or_removed() {
    let kb = animals();

    let t = TestPipeline::new();
    let pipeline = t.pipeline(t.config());
    pipeline.run(vec![kb.source("animals")]).unwrap();
    assert!(pipeline.files().iter().all(|(_, path)| path.exists()));

    let t = TestPipeline::new();
    let config = PipelineConfig {
        keep_temp_files: false,
        ..t.config()
    };
    let pipeline = t.pipeline(config);
    pipeline.run(vec![kb.source("animals")]).unwrap();
    assert!(pipeline.files().iter().all(|(_, path)| !path.exists()));
    assert_eq!(t.kv.len(KvCollection::Names), 8);
}

#[test]
fn test_preexisting_documents() {
    let kb = animals();
    for allow in [true, false] {
        let t = TestPipeline::new();
        t.documents
            .insert_many(DocumentCollection::Nodes, vec![kb.terminals[0].to_document()])
            .unwrap();

        let config = PipelineConfig {
            allow_duplicates: allow,
            ..t.config()
        };
        let report = t.pipeline(config).run(vec![kb.source("animals")]).unwrap();
        assert_eq!(report.flush.terminals.inserted, 7);
        assert_eq!(report.flush.terminals.duplicates, 1);
        assert_eq!(report.flush.terminals.failed_batches, 0);
        assert_eq!(t.documents.count(DocumentCollection::Nodes), 8);
        assert_eq!(report.counters.upload, 5);
    }
}
