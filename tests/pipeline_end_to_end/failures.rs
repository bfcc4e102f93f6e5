//! Stage failures and how far they reach

use crate::common::*;

struct BrokenSource;

impl ExpressionSource for BrokenSource {
    fn name(&self) -> &str {
        "broken"
    }

    fn stage_into(&mut self, _staging: &StagingArea) -> hyperload::Result<u64> {
        Err(Error::MalformedRecord {
            path: "broken.metta".into(),
            line: 3,
            reason: "unbalanced parentheses".into(),
        })
    }
}

#[test]
fn test_parse_failure_stops_before_any_store_call() {
    let t = TestPipeline::new();
    let pipeline = t.pipeline(t.config());
    let err = pipeline
        .run(vec![animals().source("animals"), Box::new(BrokenSource)])
        .unwrap_err();

    match err {
        Error::StageFailed { stage, .. } => assert_eq!(stage, "broken"),
        other => panic!("expected stage failure, got {:?}", other),
    }
    // The sibling source still finished
    assert_eq!(pipeline.staging().counters().snapshot().parse, 1);
    assert!(!pipeline.staging().is_frozen());
    assert_eq!(t.documents.insert_calls(), 0);
    assert!(t.kv.is_empty());
}

#[test]
fn test_document_failures_do_not_stop_the_load() {
    let t = TestPipeline::new();
    t.documents.fail_collection(DocumentCollection::LinksArity2);
    let report = t.pipeline(t.config()).run(vec![animals().source("animals")]).unwrap();

    let stats = report.link_upload.stats_for(DocumentCollection::LinksArity2);
    assert_eq!(stats.failed_batches, 1);
    assert_eq!(stats.inserted, 0);
    assert!(report.counters.links_uploaded);
    assert_eq!(report.counters.upload, 5);
    assert_eq!(t.documents.count(DocumentCollection::LinksArityN), 2);
    assert_eq!(t.kv.len(KvCollection::OutgoingSet), 12);
}

#[test]
fn test_store_timeout_fails_the_load_phase() {
    let t = TestPipeline::with_kv(InMemoryKvStore::new().fail_upserts_after(0));
    let pipeline = t.pipeline(t.config());
    let err = pipeline.run(vec![animals().source("animals")]).unwrap_err();

    assert!(!err.is_fatal());
    match err {
        Error::StageFailed { source, .. } => assert!(matches!(*source, Error::Timeout { .. })),
        other => panic!("expected stage failure, got {:?}", other),
    }
    let counters = pipeline.staging().counters().snapshot();
    assert_eq!(counters.build, 4);
    assert_eq!(counters.upload, 0);
    assert!(t.kv.is_empty());
    // Build-phase document inserts already landed
    assert_eq!(t.documents.count(DocumentCollection::Nodes), 8);
}

#[test]
fn test_links_after_the_snapshot_are_rejected() {
    let t = TestPipeline::new();
    let pipeline = t.pipeline(t.config());
    pipeline.run(vec![animals().source("animals")]).unwrap();

    let err = pipeline.run(vec![animals().source("again")]).unwrap_err();
    match err {
        Error::StageFailed { stage, source } => {
            assert_eq!(stage, "again");
            assert!(matches!(*source, Error::StagingFrozen(_)));
        }
        other => panic!("expected stage failure, got {:?}", other),
    }
    assert!(matches!(pipeline.run(Vec::new()), Err(Error::SnapshotAlreadyTaken)));
}

#[test]
fn test_invalid_config_is_rejected_up_front() {
    let t = TestPipeline::new();
    let config = PipelineConfig {
        block_size: 1,
        ..t.config()
    };
    assert!(matches!(
        Pipeline::new(config, t.documents.clone(), t.kv.clone()),
        Err(Error::Config(_))
    ));
}
