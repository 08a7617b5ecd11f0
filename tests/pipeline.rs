//! End-to-end ingestion and query tests over deterministic mock providers.

use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use greenrag::providers::mock::{
    FailingClassifier, FailingEmbedder, MockAnswerGenerator, MockClassifier, MockEmbedder,
};
use greenrag::{
    CreditType, Embedder, IngestionPipeline, PageText, QueryService, RagError, StoreError,
    VectorStore,
};

const DIMENSION: usize = 16;

fn store_in(dir: &Path) -> Arc<VectorStore> {
    Arc::new(VectorStore::open(dir, DIMENSION).unwrap())
}

fn pipeline(store: Arc<VectorStore>, label: &str) -> IngestionPipeline {
    IngestionPipeline::new(
        store,
        Arc::new(MockEmbedder::new(DIMENSION)),
        Arc::new(MockClassifier::new(label)),
    )
}

fn words(n: usize) -> String {
    (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

#[tokio::test]
async fn one_350_word_page_produces_two_chunks() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    let pipeline = pipeline(store.clone(), "Energy Efficiency");

    let report = pipeline
        .ingest(&[PageText::new(5, words(350))])
        .await
        .unwrap();

    assert_eq!(report.pages, 1);
    assert_eq!(report.chunks, 2);
    assert_eq!(store.len(), 2);

    let hits = store
        .search(&vec![0.0; DIMENSION], 2)
        .expect("store holds two entries");
    for hit in &hits {
        assert_eq!(hit.entry.page_number, 5);
        assert_eq!(hit.entry.credit_type, CreditType::EnergyEfficiency);
    }
    let word_counts: Vec<usize> = {
        let mut ordered: Vec<_> = hits
            .iter()
            .map(|h| h.entry.chunk_text.split_whitespace().count())
            .collect();
        ordered.sort_unstable();
        ordered
    };
    assert_eq!(word_counts, vec![50, 300]);
}

#[tokio::test]
async fn persist_then_reload_in_a_fresh_store_round_trips() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    let ingest = pipeline(store.clone(), "Water Conservation");
    ingest
        .ingest(&[PageText::new(9, words(350))])
        .await
        .unwrap();

    let fresh = store_in(dir.path());
    assert_eq!(fresh.len(), 2);

    let probe = MockEmbedder::new(DIMENSION)
        .embed("probe text")
        .await
        .unwrap();
    let before = store.search(&probe, 2).unwrap();
    let after = fresh.search(&probe, 2).unwrap();
    for (b, a) in before.iter().zip(after.iter()) {
        assert_eq!(b.entry, a.entry);
        assert_eq!(b.distance, a.distance);
    }
    assert!(after.iter().all(|hit| hit.entry.page_number == 9));
}

#[tokio::test]
async fn zero_page_document_leaves_store_and_artifacts_untouched() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    let pipeline = pipeline(store.clone(), "General");

    let report = pipeline.ingest(&[]).await.unwrap();
    assert_eq!(report.chunks, 0);
    assert!(store.is_empty());
    assert!(!store.index_path().exists());
    assert!(!store.entries_path().exists());
}

#[tokio::test]
async fn wordless_pages_stage_no_chunks() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    let pipeline = pipeline(store.clone(), "General");

    let report = pipeline
        .ingest(&[PageText::new(1, "   \n\t "), PageText::new(2, "")])
        .await
        .unwrap();
    assert_eq!(report.pages, 2);
    assert_eq!(report.chunks, 0);
    assert!(store.is_empty());
    assert!(!store.index_path().exists());
}

#[tokio::test]
async fn embedder_failure_mid_document_abandons_everything() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    // First chunk embeds fine, second fails.
    let pipeline = IngestionPipeline::new(
        store.clone(),
        Arc::new(FailingEmbedder::new(DIMENSION, 1)),
        Arc::new(MockClassifier::new("General")),
    );

    let err = pipeline
        .ingest(&[PageText::new(3, words(350))])
        .await
        .unwrap_err();
    match err {
        RagError::Chunk { page, index, source } => {
            assert_eq!(page, 3);
            assert_eq!(index, 1);
            assert!(matches!(*source, RagError::Embedding(_)));
        }
        other => panic!("expected chunk context, got {other}"),
    }
    assert!(store.is_empty());
    assert!(!store.index_path().exists());
    assert!(!store.entries_path().exists());
}

#[tokio::test]
async fn classifier_failure_names_the_offending_chunk() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    let pipeline = IngestionPipeline::new(
        store.clone(),
        Arc::new(MockEmbedder::new(DIMENSION)),
        Arc::new(FailingClassifier),
    );

    let err = pipeline
        .ingest(&[PageText::new(1, "some words here")])
        .await
        .unwrap_err();
    match err {
        RagError::Chunk { page, index, source } => {
            assert_eq!(page, 1);
            assert_eq!(index, 0);
            assert!(matches!(*source, RagError::Classification(_)));
        }
        other => panic!("expected chunk context, got {other}"),
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn unrecognized_labels_are_stored_as_general() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    let pipeline = pipeline(store.clone(), "Thermal Comfort");

    pipeline
        .ingest(&[PageText::new(1, "insulation detail")])
        .await
        .unwrap();
    let hits = store.search(&vec![0.0; DIMENSION], 1).unwrap();
    assert_eq!(hits[0].entry.credit_type, CreditType::General);
}

#[tokio::test]
async fn ingestions_accumulate_in_page_then_chunk_order() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    let pipeline = pipeline(store.clone(), "General");

    pipeline
        .ingest(&[
            PageText::new(1, words(350)),
            PageText::new(2, "short trailing page"),
        ])
        .await
        .unwrap();
    pipeline
        .ingest(&[PageText::new(1, "second document")])
        .await
        .unwrap();

    assert_eq!(store.len(), 4);
    // Probing with a stored chunk's exact text finds it at distance zero.
    let probe = MockEmbedder::new(DIMENSION)
        .embed("short trailing page")
        .await
        .unwrap();
    let hit = &store.search(&probe, 1).unwrap()[0];
    assert_eq!(hit.entry.chunk_text, "short trailing page");
    assert_eq!(hit.entry.page_number, 2);
    assert_eq!(hit.distance, 0.0);
}

#[tokio::test]
async fn query_answers_from_the_nearest_chunk() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    let pipeline = pipeline(store.clone(), "Water Conservation");
    pipeline
        .ingest(&[
            PageText::new(4, "rainwater harvesting earns credits"),
            PageText::new(7, "daylighting requirements for offices"),
        ])
        .await
        .unwrap();

    let service = QueryService::new(
        store,
        Arc::new(MockEmbedder::new(DIMENSION)),
        Arc::new(MockAnswerGenerator),
    );
    let outcome = service
        .answer("rainwater harvesting earns credits")
        .await
        .unwrap();

    assert_eq!(outcome.entry.page_number, 4);
    assert_eq!(outcome.distance, 0.0);
    assert_eq!(
        outcome.answer,
        "Answer to 'rainwater harvesting earns credits' grounded on page 4"
    );
}

#[tokio::test]
async fn query_on_an_empty_store_surfaces_empty_index() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    let service = QueryService::new(
        store,
        Arc::new(MockEmbedder::new(DIMENSION)),
        Arc::new(MockAnswerGenerator),
    );

    let err = service.answer("anything yet?").await.unwrap_err();
    assert!(matches!(err, RagError::Store(StoreError::EmptyIndex)));
}
