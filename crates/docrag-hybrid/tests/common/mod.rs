#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use docrag_core::chunking::{Chunker, ChunkingConfig};
use docrag_core::retry::RetryPolicy;
use docrag_core::traits::{Embedder, LexicalIndex, VectorIndex};
use docrag_core::types::{Chunk, EmbeddedChunk, PointId, RetrievalHit, SearchFilter, VectorQuery};
use docrag_core::{Error, Result};
use docrag_embed::HashEmbedder;
use docrag_hybrid::{DualIndexWriter, IngestController, IngestOptions};
use docrag_text::FtsIndex;

pub const DIM: usize = 64;

pub fn small_chunks() -> ChunkingConfig {
    ChunkingConfig { target_chars: 200, min_chars: 40, overlap_chars: 50 }
}

/// Roughly `len` characters of space-separated words, never longer.
pub fn filler(seed: &[&str], len: usize) -> String {
    let mut out = String::new();
    for word in seed.iter().cycle() {
        let extra = if out.is_empty() { word.len() } else { word.len() + 1 };
        if out.len() + extra > len {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

pub fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).expect("write fixture");
}

fn matches_filter(chunk: &Chunk, filter: &SearchFilter) -> bool {
    filter.file_name.as_deref().map_or(true, |f| chunk.file_name() == Some(f))
        && filter.doc_id.as_deref().map_or(true, |d| chunk.doc_id == d)
}

/// Brute-force cosine index kept in memory.
#[derive(Default)]
pub struct MemoryVectorIndex {
    points: Mutex<BTreeMap<PointId, EmbeddedChunk>>,
    pub searches: AtomicUsize,
    pub fail_search: bool,
}

impl MemoryVectorIndex {
    pub fn failing() -> Self {
        Self { fail_search: true, ..Default::default() }
    }

    pub fn len(&self) -> usize {
        self.points.lock().expect("lock").len()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_ready(&self, _dim: usize) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, points: &[EmbeddedChunk]) -> Result<()> {
        let mut map = self.points.lock().expect("lock");
        for p in points {
            map.insert(p.chunk.point_id, p.clone());
        }
        Ok(())
    }

    async fn delete_by_doc_id(&self, doc_id: &str) -> Result<()> {
        self.points.lock().expect("lock").retain(|_, p| p.chunk.doc_id != doc_id);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.points.lock().expect("lock").clear();
        Ok(())
    }

    async fn search(&self, query: &VectorQuery) -> Result<Vec<RetrievalHit>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail_search {
            return Err(Error::upstream("memory index", "search disabled"));
        }
        let map = self.points.lock().expect("lock");
        let mut hits: Vec<RetrievalHit> = map
            .values()
            .filter(|p| matches_filter(&p.chunk, &query.filter))
            .map(|p| {
                let score: f32 = p.vector.iter().zip(&query.vector).map(|(a, b)| a * b).sum();
                RetrievalHit { id: p.chunk.point_id, score, payload: p.chunk.payload() }
            })
            .filter(|h| query.score_threshold.map_or(true, |t| h.score >= t))
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(query.limit);
        Ok(hits)
    }

    async fn ids_for_doc(&self, doc_id: &str) -> Result<Vec<PointId>> {
        Ok(self.points.lock().expect("lock").values().filter(|p| p.chunk.doc_id == doc_id).map(|p| p.chunk.point_id).collect())
    }
}

/// In-memory FTS index that counts searches.
pub struct CountingLexical {
    pub inner: FtsIndex,
    pub searches: AtomicUsize,
}

impl CountingLexical {
    pub fn new() -> Self {
        Self { inner: FtsIndex::open_in_memory().expect("fts"), searches: AtomicUsize::new(0) }
    }
}

impl LexicalIndex for CountingLexical {
    fn init(&self) -> Result<()> {
        self.inner.init()
    }

    fn upsert(&self, chunks: &[&Chunk]) -> Result<()> {
        self.inner.upsert(chunks)
    }

    fn delete_by_doc_id(&self, doc_id: &str) -> Result<usize> {
        self.inner.delete_by_doc_id(doc_id)
    }

    fn clear(&self) -> Result<()> {
        self.inner.clear()
    }

    fn search(&self, query: &str, limit: usize, filter: &SearchFilter) -> Result<Vec<RetrievalHit>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.search(query, limit, filter)
    }

    fn ids_for_doc(&self, doc_id: &str) -> Result<Vec<PointId>> {
        self.inner.ids_for_doc(doc_id)
    }
}

/// Hash embedder that fails on any batch containing `POISON`.
pub struct PoisonEmbedder(pub HashEmbedder);

impl Embedder for PoisonEmbedder {
    fn dim(&self) -> usize {
        self.0.dim()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains("POISON")) {
            return Err(Error::Embedding("poisoned input".into()));
        }
        self.0.embed_batch(texts)
    }
}

pub struct Harness {
    pub embedder: Arc<dyn Embedder>,
    pub vector: Arc<MemoryVectorIndex>,
    pub lexical: Arc<CountingLexical>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_embedder(Arc::new(PoisonEmbedder(HashEmbedder::new(DIM))))
    }

    pub fn with_embedder(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder, vector: Arc::new(MemoryVectorIndex::default()), lexical: Arc::new(CountingLexical::new()) }
    }

    pub fn writer(&self) -> DualIndexWriter {
        DualIndexWriter::new(self.vector.clone(), self.lexical.clone(), 2, RetryPolicy::none()).expect("writer")
    }

    pub fn controller(&self, options: IngestOptions) -> IngestController {
        let chunker = Chunker::new(small_chunks()).expect("chunker");
        IngestController::new(chunker, self.embedder.clone(), self.writer(), options)
    }
}
