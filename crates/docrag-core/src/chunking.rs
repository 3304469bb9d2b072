//! Fixed-size character chunking with overlap.
//!
//! Every retained passage gets a content-derived `chunk_id` and a numeric
//! `point_id`, so re-chunking identical text reproduces identical keys and a
//! re-upsert overwrites instead of duplicating. Page provenance is derived by
//! intersecting the passage's character range with the document page spans.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{Chunk, DocumentMeta, ExtractedDocument, PageSpan, PointId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub target_chars: usize,
    pub min_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { target_chars: 1800, min_chars: 300, overlap_chars: 200 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_chars == 0 {
            return Err(Error::Configuration("chunking.target_chars must be positive".into()));
        }
        if self.overlap_chars >= self.target_chars {
            return Err(Error::Configuration(format!(
                "chunking.overlap_chars ({}) must be smaller than chunking.target_chars ({})",
                self.overlap_chars, self.target_chars
            )));
        }
        Ok(())
    }
}

pub fn sha1_hex(s: &str) -> String {
    format!("{:x}", Sha1::digest(s.as_bytes()))
}

/// `sha1(doc_id | ordinal | sha1(text))`, hex encoded.
pub fn chunk_id_for(doc_id: &str, ordinal: usize, text: &str) -> String {
    sha1_hex(&format!("{doc_id}|{ordinal}|{}", sha1_hex(text)))
}

/// First 8 bytes of `sha1(chunk_id)`, big-endian.
pub fn point_id_for(chunk_id: &str) -> PointId {
    let digest = Sha1::digest(chunk_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// First and last page whose span overlaps `[start, end)`. Spans must be
/// ordered by position.
pub fn pages_for_range(spans: &[PageSpan], start: usize, end: usize) -> (Option<u32>, Option<u32>) {
    let mut first = None;
    let mut last = None;
    for span in spans {
        if span.end <= start {
            continue;
        }
        if span.start >= end {
            break;
        }
        first.get_or_insert(span.page);
        last = Some(span.page);
    }
    (first, last)
}

/// Character windows of `target` characters advancing by `target - overlap`.
/// The last window ends exactly at `len`.
fn windows(len: usize, target: usize, overlap: usize) -> Vec<(usize, usize)> {
    let step = target - overlap;
    let mut out = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + target).min(len);
        out.push((start, end));
        if end == len {
            break;
        }
        start += step;
    }
    out
}

/// Char index of the first occurrence of `needle` at or after `from_char`.
fn find_from(text: &str, bounds: &[usize], needle: &str, from_char: usize) -> Option<usize> {
    let from_byte = *bounds.get(from_char)?;
    let rel = text[from_byte..].find(needle)?;
    bounds.binary_search(&(from_byte + rel)).ok()
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn chunk_document(&self, doc: &ExtractedDocument) -> Result<Vec<Chunk>> {
        self.chunk(&doc.text, &doc.meta)
    }

    /// Split `text` into overlapping passages and locate each one in the text.
    ///
    /// Passages are located by a forward scan from a cursor that sits at the
    /// previous retained passage's end. A passage not found after the cursor
    /// (every overlapping one, since its head lies before the cursor) is placed
    /// at the cursor, so offsets and pages past the first passage are
    /// approximate and may run past the end of the text.
    pub fn chunk(&self, text: &str, meta: &DocumentMeta) -> Result<Vec<Chunk>> {
        let doc_id = meta
            .doc_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Configuration("document metadata must contain doc_id".into()))?;

        // Byte offset of every char boundary, plus the end of the text.
        let bounds: Vec<usize> = text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len())).collect();
        let n_chars = bounds.len() - 1;

        let mut chunks = Vec::new();
        let mut cursor = 0;

        for (i, (ws, we)) in windows(n_chars, self.config.target_chars, self.config.overlap_chars).into_iter().enumerate() {
            let ordinal = i + 1;
            let part = text[bounds[ws]..bounds[we]].trim();
            let len = part.chars().count();
            if len == 0 || len < self.config.min_chars {
                continue;
            }

            let start = find_from(text, &bounds, part, cursor).unwrap_or_else(|| {
                debug!(doc_id, ordinal, cursor, "passage not found after cursor, placing it at the cursor");
                cursor
            });
            let end = start + len;
            cursor = end;

            let chunk_id = chunk_id_for(doc_id, ordinal, part);
            let (page_start, page_end) = pages_for_range(&meta.page_spans, start, end);

            chunks.push(Chunk {
                point_id: point_id_for(&chunk_id),
                chunk_id,
                doc_id: doc_id.to_string(),
                chunk_index: ordinal,
                char_start: start,
                char_end: end,
                page_start,
                page_end,
                text: part.to_string(),
                meta: meta.fields.clone(),
            });
        }
        Ok(chunks)
    }
}
