use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::types::{Chunk, EmbeddedChunk, ExtractedDocument, PointId, RetrievalHit, SearchFilter, VectorQuery};

/// Opaque embedding service.
///
/// Returns one L2-normalized vector per non-empty input text; empty or
/// whitespace-only inputs produce no vector.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Dense index keyed by [`PointId`], searched by cosine similarity.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Cheap round-trip used by readiness checks.
    async fn ping(&self) -> Result<()>;
    /// Create the collection with `dim` dimensions if it is missing. An
    /// existing collection is left untouched; if its dimension differs from
    /// `dim` this is an [`Error::Configuration`](crate::Error::Configuration).
    async fn ensure_ready(&self, dim: usize) -> Result<()>;
    async fn upsert(&self, points: &[EmbeddedChunk]) -> Result<()>;
    async fn delete_by_doc_id(&self, doc_id: &str) -> Result<()>;
    /// Remove every point, keeping the collection.
    async fn clear(&self) -> Result<()>;
    /// Hits ordered by descending similarity.
    async fn search(&self, query: &VectorQuery) -> Result<Vec<RetrievalHit>>;
    async fn ids_for_doc(&self, doc_id: &str) -> Result<Vec<PointId>>;
}

/// Full-text index with BM25 ranking. Scores are higher-is-better.
pub trait LexicalIndex: Send + Sync {
    /// Create tables if needed. Idempotent.
    fn init(&self) -> Result<()>;
    /// Write rows and postings for `chunks` in one transaction.
    fn upsert(&self, chunks: &[&Chunk]) -> Result<()>;
    /// Returns the number of removed rows.
    fn delete_by_doc_id(&self, doc_id: &str) -> Result<usize>;
    fn clear(&self) -> Result<()>;
    fn search(&self, query: &str, limit: usize, filter: &SearchFilter) -> Result<Vec<RetrievalHit>>;
    fn ids_for_doc(&self, doc_id: &str) -> Result<Vec<PointId>>;
}

/// Turns a file into text plus page provenance. One implementation per format
/// family.
pub trait DocumentReader: Send + Sync {
    fn name(&self) -> &'static str;
    fn read(&self, path: &Path) -> Result<ExtractedDocument>;
}
