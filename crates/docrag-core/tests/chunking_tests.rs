use docrag_core::chunking::{chunk_id_for, pages_for_range, point_id_for, Chunker, ChunkingConfig};
use docrag_core::types::{Chunk, DocumentMeta, PageSpan};
use docrag_core::Error;
use serde_json::json;

fn words(n: usize) -> String {
    (0..n).map(|i| format!("w{i:03}")).collect::<Vec<_>>().join(" ")
}

fn meta(doc_id: &str) -> DocumentMeta {
    let mut meta = DocumentMeta { doc_id: Some(doc_id.to_string()), ..Default::default() };
    meta.fields.insert("file_name".into(), json!("manual.txt"));
    meta
}

fn ids(chunks: &[Chunk]) -> Vec<(String, u64)> {
    chunks.iter().map(|c| (c.chunk_id.clone(), c.point_id)).collect()
}

fn small() -> Chunker {
    Chunker::new(ChunkingConfig { target_chars: 200, min_chars: 50, overlap_chars: 40 }).expect("config")
}

#[test]
fn same_text_same_ids() {
    let text = words(200);
    let a = small().chunk(&text, &meta("doc-1")).expect("chunk");
    let b = small().chunk(&text, &meta("doc-1")).expect("chunk");
    assert!(a.len() > 1);
    assert_eq!(ids(&a), ids(&b));

    let other = small().chunk(&text, &meta("doc-2")).expect("chunk");
    assert_ne!(a[0].chunk_id, other[0].chunk_id, "doc_id is part of the identity");
}

#[test]
fn ids_follow_the_documented_derivation() {
    let chunks = small().chunk(&words(200), &meta("doc-1")).expect("chunk");
    let first = &chunks[0];
    assert_eq!(first.chunk_index, 1);
    assert_eq!(first.chunk_id, chunk_id_for("doc-1", 1, &first.text));
    assert_eq!(first.point_id, point_id_for(&first.chunk_id));
    assert_eq!(first.chunk_id.len(), 40);
}

/// Length of the longest head of `next` that `cur` ends with, up to `max`.
fn shared_text(cur: &str, next: &str, max: usize) -> usize {
    (1..=max.min(next.len())).rev().find(|&k| cur.ends_with(&next[..k])).unwrap_or(0)
}

#[test]
fn consecutive_chunks_share_overlap_text() {
    let chunks = small().chunk(&words(200), &meta("doc-1")).expect("chunk");
    assert!(chunks.len() > 2);
    for pair in chunks.windows(2) {
        let shared = shared_text(&pair[0].text, &pair[1].text, 40);
        assert!(shared > 0, "chunk {} shares no text with its successor", pair[0].chunk_index);
    }
}

#[test]
fn overlapping_chunks_are_placed_at_the_cursor() {
    let text = words(60);
    let mut m = meta("doc-1");
    m.page_spans = vec![PageSpan { page: 1, start: 0, end: 100 }, PageSpan { page: 2, start: 100, end: 400 }];
    let chunks = Chunker::new(ChunkingConfig { target_chars: 100, min_chars: 10, overlap_chars: 30 })
        .expect("config")
        .chunk(&text, &m)
        .expect("chunk");

    assert_eq!(chunks.len(), 4);
    assert_eq!((chunks[0].char_start, chunks[0].char_end), (0, 99));
    assert_eq!(chunks[1].char_start, 99, "second chunk starts at the first chunk's end");
    for pair in chunks.windows(2) {
        assert_eq!(pair[1].char_start, pair[0].char_end);
        assert!(shared_text(&pair[0].text, &pair[1].text, 30) > 0);
    }
    assert_eq!((chunks[1].page_start, chunks[1].page_end), (Some(1), Some(2)));
    assert_eq!((chunks[2].page_start, chunks[2].page_end), (Some(2), Some(2)));
}

#[test]
fn offsets_span_the_chunk_text() {
    let text = words(200);
    let chunks = small().chunk(&text, &meta("doc-1")).expect("chunk");
    assert_eq!(&text[chunks[0].char_start..chunks[0].char_end], chunks[0].text);
    for chunk in &chunks {
        assert_eq!(chunk.char_end - chunk.char_start, chunk.text.chars().count());
    }
}

#[test]
fn short_tail_is_dropped() {
    let text = words(38);
    let chunks = Chunker::new(ChunkingConfig { target_chars: 100, min_chars: 50, overlap_chars: 20 })
        .expect("config")
        .chunk(&text, &meta("doc-1"))
        .expect("chunk");
    assert_eq!(chunks.iter().map(|c| c.chunk_index).collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn blank_windows_still_consume_ordinals() {
    let text = format!("{}{}{}", "a".repeat(60), " ".repeat(200), "b".repeat(60));
    let chunks = Chunker::new(ChunkingConfig { target_chars: 100, min_chars: 50, overlap_chars: 20 })
        .expect("config")
        .chunk(&text, &meta("doc-1"))
        .expect("chunk");
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].chunk_index, 1);
    assert_eq!(chunks[1].chunk_index, 4);
    assert_eq!((chunks[1].char_start, chunks[1].char_end), (260, 320));
    assert_eq!(&text[260..320], chunks[1].text);
}

#[test]
fn missing_doc_id_is_a_configuration_error() {
    let err = small().chunk(&words(50), &DocumentMeta::default()).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    let empty = DocumentMeta { doc_id: Some(String::new()), ..Default::default() };
    assert!(small().chunk(&words(50), &empty).is_err());
}

#[test]
fn empty_text_yields_no_chunks() {
    assert!(small().chunk("", &meta("doc-1")).expect("chunk").is_empty());
    assert!(small().chunk("   \n  ", &meta("doc-1")).expect("chunk").is_empty());
}

#[test]
fn chunk_spanning_a_page_break_covers_both_pages() {
    let spans = [PageSpan { page: 1, start: 0, end: 100 }, PageSpan { page: 2, start: 100, end: 250 }];
    assert_eq!(pages_for_range(&spans, 80, 120), (Some(1), Some(2)));
    assert_eq!(pages_for_range(&spans, 0, 100), (Some(1), Some(1)));
    assert_eq!(pages_for_range(&spans, 100, 101), (Some(2), Some(2)));
    assert_eq!(pages_for_range(&spans, 300, 310), (None, None));
    assert_eq!(pages_for_range(&[], 0, 10), (None, None));
}

#[test]
fn pages_are_assigned_from_spans() {
    let text = words(50);
    let mut m = meta("doc-1");
    m.page_spans = vec![PageSpan { page: 1, start: 0, end: 125 }, PageSpan { page: 2, start: 125, end: 250 }];
    let chunks = Chunker::new(ChunkingConfig { target_chars: 100, min_chars: 10, overlap_chars: 10 })
        .expect("config")
        .chunk(&text, &m)
        .expect("chunk");
    assert_eq!((chunks[0].page_start, chunks[0].page_end), (Some(1), Some(1)));
    assert_eq!((chunks[1].page_start, chunks[1].page_end), (Some(1), Some(2)));
    let last = chunks.last().expect("last");
    assert_eq!((last.page_start, last.page_end), (Some(2), Some(2)));
}

#[test]
fn payload_carries_identity_and_document_metadata() {
    let chunk = small().chunk(&words(200), &meta("doc-1")).expect("chunk").remove(0);
    let payload = chunk.payload();
    assert_eq!(payload["doc_id"], json!("doc-1"));
    assert_eq!(payload["chunk_id"], json!(chunk.chunk_id));
    assert_eq!(payload["file_name"], json!("manual.txt"));
    assert_eq!(payload["text"], json!(chunk.text));
    assert!(payload["page_start"].is_null());

    let row = chunk.export_row();
    assert_eq!(row["id"], json!(chunk.point_id));
}
