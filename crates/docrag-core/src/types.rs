//! Domain types shared by the chunker, both indices and the retrieval stages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Numeric key used by both indices for a chunk.
pub type PointId = u64;

/// Loosely-typed metadata stored next to every point.
pub type Payload = Map<String, Value>;

/// Half-open character range `[start, end)` of one source page inside the
/// extracted document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpan {
    pub page: u32,
    pub start: usize,
    pub end: usize,
}

/// Identity and provenance attached to an extracted document.
///
/// `doc_id` is optional here because readers are external collaborators; the
/// chunker refuses documents without one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub doc_id: Option<String>,
    #[serde(default)]
    pub page_spans: Vec<PageSpan>,
    /// Everything else (`file_name`, `mime_type`, ...). Merged verbatim into
    /// every chunk payload.
    #[serde(flatten)]
    pub fields: Payload,
}

impl DocumentMeta {
    pub fn file_name(&self) -> Option<&str> {
        self.fields.get("file_name").and_then(Value::as_str)
    }
}

/// Output of a [`crate::traits::DocumentReader`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub text: String,
    pub meta: DocumentMeta,
}

/// A contiguous span of a document's normalized text, independently indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub point_id: PointId,
    pub chunk_id: String,
    pub doc_id: String,
    /// 1-based ordinal of the splitter part this chunk came from.
    pub chunk_index: usize,
    /// Character (not byte) offsets into the document text.
    pub char_start: usize,
    pub char_end: usize,
    pub page_start: Option<u32>,
    pub page_end: Option<u32>,
    pub text: String,
    /// Document metadata without `page_spans`.
    pub meta: Payload,
}

impl Chunk {
    pub fn file_name(&self) -> Option<&str> {
        self.meta.get("file_name").and_then(Value::as_str)
    }

    /// Metadata stored with the point in both indices. Always carries `text`
    /// and `chunk_id`.
    pub fn payload(&self) -> Payload {
        let mut payload = self.meta.clone();
        payload.insert("doc_id".into(), Value::from(self.doc_id.clone()));
        payload.insert("chunk_id".into(), Value::from(self.chunk_id.clone()));
        payload.insert("chunk_index".into(), Value::from(self.chunk_index));
        payload.insert("char_start".into(), Value::from(self.char_start));
        payload.insert("char_end".into(), Value::from(self.char_end));
        payload.insert("page_start".into(), self.page_start.map_or(Value::Null, Value::from));
        payload.insert("page_end".into(), self.page_end.map_or(Value::Null, Value::from));
        payload.insert("text".into(), Value::from(self.text.clone()));
        payload
    }

    /// Flattened row written to the JSONL export.
    pub fn export_row(&self) -> Payload {
        let mut row = Payload::new();
        row.insert("id".into(), Value::from(self.point_id));
        row.extend(self.payload());
        row
    }
}

/// A chunk paired with its embedding, ready for the vector index.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// One ranked result, produced by either retriever and by fusion.
///
/// `score` is engine-specific but higher is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub id: PointId,
    pub score: f32,
    pub payload: Payload,
}

impl RetrievalHit {
    pub fn text(&self) -> Option<&str> {
        self.payload.get("text").and_then(Value::as_str)
    }

    pub fn doc_id(&self) -> Option<&str> {
        self.payload.get("doc_id").and_then(Value::as_str)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.payload
            .get("file_name")
            .or_else(|| self.payload.get("source_file"))
            .and_then(Value::as_str)
    }

    pub fn page_start(&self) -> Option<u64> {
        self.payload.get("page_start").and_then(Value::as_u64)
    }

    pub fn page_end(&self) -> Option<u64> {
        self.payload.get("page_end").and_then(Value::as_u64)
    }

    /// Page range with a missing bound filled from the other one.
    pub fn page_range(&self) -> Option<(u64, u64)> {
        match (self.page_start(), self.page_end()) {
            (None, None) => None,
            (Some(s), None) => Some((s, s)),
            (None, Some(e)) => Some((e, e)),
            (Some(s), Some(e)) => Some((s, e)),
        }
    }
}

/// Optional equality filters scoping a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub file_name: Option<String>,
    pub doc_id: Option<String>,
}

impl SearchFilter {
    pub fn file_name(name: impl Into<String>) -> Self {
        Self { file_name: Some(name.into()), doc_id: None }
    }

    pub fn doc_id(doc_id: impl Into<String>) -> Self {
        Self { file_name: None, doc_id: Some(doc_id.into()) }
    }

    pub fn is_empty(&self) -> bool {
        self.file_name.is_none() && self.doc_id.is_none()
    }
}

/// Parameters of one nearest-neighbour query.
#[derive(Debug, Clone)]
pub struct VectorQuery {
    pub vector: Vec<f32>,
    pub limit: usize,
    pub filter: SearchFilter,
    /// Hits below this cosine similarity are discarded by the index.
    pub score_threshold: Option<f32>,
}
