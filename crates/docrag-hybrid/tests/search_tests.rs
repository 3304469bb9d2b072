mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{filler, Harness, MemoryVectorIndex, CountingLexical, DIM};
use docrag_core::types::{DocumentMeta, ExtractedDocument, SearchFilter};
use docrag_core::Error;
use docrag_embed::HashEmbedder;
use docrag_hybrid::{HybridSearcher, IngestOptions, SearchOptions};

fn doc(doc_id: &str, file: &str, text: String) -> ExtractedDocument {
    let mut meta = DocumentMeta { doc_id: Some(doc_id.into()), ..Default::default() };
    meta.fields.insert("file_name".into(), serde_json::json!(file));
    ExtractedDocument { text, meta }
}

async fn seeded() -> (Harness, HybridSearcher) {
    let h = Harness::new();
    let controller = h.controller(IngestOptions::default());
    let hydraulics = filler(&["hydraulic", "pump", "pressure", "relief", "valve", "inspection"], 500);
    let cabin = filler(&["cabin", "lighting", "panel", "dimmer", "circuit", "breaker"], 500);
    controller.ingest_document(&doc("doc-h", "hydraulics.txt", hydraulics)).await.expect("ingest");
    controller.ingest_document(&doc("doc-c", "cabin.txt", cabin)).await.expect("ingest");
    let searcher = HybridSearcher::from_indices(h.embedder.clone(), h.vector.clone(), h.lexical.clone());
    (h, searcher)
}

#[tokio::test]
async fn hybrid_search_ranks_matching_document_first() {
    let (_h, searcher) = seeded().await;
    let hits = searcher.search("relief valve pressure", &SearchOptions::default().with_limit(3)).await.expect("search");

    assert!(!hits.is_empty() && hits.len() <= 3);
    assert_eq!(hits[0].file_name(), Some("hydraulics.txt"));
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn threshold_applies_to_dense_leg_only() {
    let (_h, searcher) = seeded().await;

    // nothing reaches a cosine similarity above 1
    let dense = searcher
        .dense()
        .search("relief valve pressure", 10, Some(1.5), &SearchFilter::default())
        .await
        .expect("dense");
    assert!(dense.is_empty());

    let opts = SearchOptions::default().with_limit(10).with_threshold(Some(1.5));
    let hits = searcher.search("relief valve pressure", &opts).await.expect("search");
    let lexical = searcher.lexical().search("relief valve pressure", 30, &SearchFilter::default()).expect("lexical");

    assert!(!hits.is_empty());
    let fused_ids: Vec<_> = hits.iter().map(|h| h.id).collect();
    let lexical_ids: Vec<_> = lexical.iter().take(10).map(|h| h.id).collect();
    assert_eq!(fused_ids, lexical_ids);
}

#[tokio::test]
async fn blank_query_touches_no_index() {
    let (h, searcher) = seeded().await;
    let lexical_before = h.lexical.searches.load(Ordering::SeqCst);

    for query in ["", "   ", "\n\t"] {
        let hits = searcher.search(query, &SearchOptions::default()).await.expect("search");
        assert!(hits.is_empty());
    }
    assert!(searcher.lexical().search(" ", 5, &SearchFilter::default()).expect("lexical").is_empty());

    assert_eq!(h.lexical.searches.load(Ordering::SeqCst), lexical_before);
    assert_eq!(h.vector.searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn file_filter_scopes_both_legs() {
    let (h, searcher) = seeded().await;
    let opts = SearchOptions::default().with_limit(20).with_filter(SearchFilter::file_name("cabin.txt"));

    let hits = searcher.search("relief valve cabin lighting", &opts).await.expect("search");

    assert!(!hits.is_empty());
    assert!(hits.iter().all(|hit| hit.file_name() == Some("cabin.txt")));
    assert!(h.vector.searches.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn failing_leg_fails_the_query() {
    let embedder = Arc::new(HashEmbedder::new(DIM));
    let searcher = HybridSearcher::from_indices(
        embedder,
        Arc::new(MemoryVectorIndex::failing()),
        Arc::new(CountingLexical::new()),
    );
    let err = searcher.search("relief valve", &SearchOptions::default()).await;
    assert!(matches!(err, Err(Error::UpstreamUnavailable { .. })));
}

#[tokio::test]
async fn fused_results_respect_limit() {
    let (_h, searcher) = seeded().await;
    for limit in [1, 2, 4] {
        let hits = searcher
            .search("hydraulic cabin valve panel", &SearchOptions::default().with_limit(limit))
            .await
            .expect("search");
        assert!(hits.len() <= limit);
    }
}
