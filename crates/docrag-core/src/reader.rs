//! Document readers: file discovery, text extraction and page provenance.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::debug;
use walkdir::WalkDir;

use crate::chunking::sha1_hex;
use crate::error::{Error, Result};
use crate::preprocess::{preprocess_doc_text, TableMode};
use crate::traits::DocumentReader;
use crate::types::{DocumentMeta, ExtractedDocument, PageSpan, Payload};

/// Pages inside `.pdftxt` / `.pages` files are separated by form feeds.
pub const PAGE_BREAK: char = '\x0c';
const PAGE_JOINER: &str = "\n\n";

/// Identity of a file version: `sha1(absolute_path | size | mtime)`.
pub fn doc_id_for(path: &Path) -> Result<String> {
    let md = fs::metadata(path)?;
    let abs = fs::canonicalize(path)?;
    Ok(sha1_hex(&format!("{}|{}|{}", abs.display(), md.len(), mtime_secs(&md))))
}

fn mtime_secs(md: &fs::Metadata) -> f64 {
    md.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

fn mime_type(suffix: &str) -> &'static str {
    match suffix {
        ".pdf" => "application/pdf",
        ".json" => "application/json",
        ".xml" => "application/xml",
        ".txt" | ".pdftxt" | ".pages" => "text/plain",
        ".md" => "text/markdown",
        _ => "application/octet-stream",
    }
}

fn text_stats(text: &str) -> Value {
    json!({ "chars": text.chars().count(), "lines": text.matches('\n').count() + 1 })
}

/// Metadata every reader attaches, before page information is known.
fn base_meta(path: &Path, source_type: &str) -> Result<DocumentMeta> {
    let md = fs::metadata(path)?;
    let suffix = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    let modified_at = md.modified().map(|t| DateTime::<Utc>::from(t).to_rfc3339()).ok();

    let mut fields = Payload::new();
    fields.insert("file_name".into(), json!(path.file_name().map(|n| n.to_string_lossy().into_owned())));
    fields.insert("file_path".into(), json!(path.display().to_string()));
    fields.insert("mime_type".into(), json!(mime_type(&suffix)));
    fields.insert("suffix".into(), json!(suffix));
    fields.insert("file_size_bytes".into(), json!(md.len()));
    fields.insert("modified_at".into(), json!(modified_at));
    fields.insert("source_type".into(), json!(source_type));

    Ok(DocumentMeta { doc_id: Some(doc_id_for(path)?), page_spans: Vec::new(), fields })
}

fn finish(text: String, mut meta: DocumentMeta, spans: Vec<PageSpan>) -> ExtractedDocument {
    meta.fields.insert("page_count".into(), json!(spans.len().max(1)));
    meta.fields.insert("stats".into(), text_stats(&text));
    meta.page_spans = spans;
    ExtractedDocument { text, meta }
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Pages of `lines_per_page` lines each, as character spans.
pub fn pseudo_page_spans(text: &str, lines_per_page: usize) -> Vec<PageSpan> {
    if text.is_empty() || lines_per_page == 0 {
        return Vec::new();
    }
    let mut line_starts = vec![0usize];
    let mut total = 0usize;
    for ch in text.chars() {
        total += 1;
        if ch == '\n' {
            line_starts.push(total);
        }
    }

    let mut spans = Vec::new();
    let mut line_idx = 0;
    let mut page = 1;
    while line_idx < line_starts.len() {
        let next = (line_idx + lines_per_page).min(line_starts.len());
        let end = line_starts.get(next).copied().unwrap_or(total);
        spans.push(PageSpan { page, start: line_starts[line_idx], end });
        page += 1;
        line_idx = next;
    }
    spans
}

/// Join `pages` with a blank line, the separator counted in the preceding page.
fn join_pages<S: AsRef<str>>(pages: &[S]) -> (String, Vec<PageSpan>) {
    let mut text = String::new();
    let mut spans = Vec::with_capacity(pages.len());
    let mut cursor = 0usize;
    for (i, page) in pages.iter().enumerate() {
        let start = cursor;
        text.push_str(page.as_ref());
        cursor += page.as_ref().chars().count();
        if i + 1 != pages.len() {
            text.push_str(PAGE_JOINER);
            cursor += PAGE_JOINER.len();
        }
        spans.push(PageSpan { page: (i + 1) as u32, start, end: cursor });
    }
    (text, spans)
}

/// `.txt`, `.md`, `.xml` and anything without a dedicated reader.
#[derive(Debug, Clone)]
pub struct PlainTextReader {
    pub lines_per_page: usize,
}

impl DocumentReader for PlainTextReader {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn read(&self, path: &Path) -> Result<ExtractedDocument> {
        let meta = base_meta(path, "file")?;
        let text = read_lossy(path)?;
        let spans = pseudo_page_spans(&text, self.lines_per_page);
        Ok(finish(text, meta, spans))
    }
}

/// Pretty-prints valid JSON; invalid files are indexed as raw text.
#[derive(Debug, Clone)]
pub struct JsonReader {
    pub lines_per_page: usize,
}

impl DocumentReader for JsonReader {
    fn name(&self) -> &'static str {
        "json"
    }

    fn read(&self, path: &Path) -> Result<ExtractedDocument> {
        let meta = base_meta(path, "file")?;
        let raw = read_lossy(path)?;
        let text = match serde_json::from_str::<Value>(&raw) {
            Ok(value) => serde_json::to_string_pretty(&value)?,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "invalid JSON, indexing raw text");
                raw
            }
        };
        let spans = pseudo_page_spans(&text, self.lines_per_page);
        Ok(finish(text, meta, spans))
    }
}

/// Text exported from paginated documents, one form feed between pages.
#[derive(Debug, Clone, Default)]
pub struct PagedTextReader;

impl DocumentReader for PagedTextReader {
    fn name(&self) -> &'static str {
        "paged"
    }

    fn read(&self, path: &Path) -> Result<ExtractedDocument> {
        let meta = base_meta(path, "pdf")?;
        let raw = read_lossy(path)?;
        let pages: Vec<&str> = raw.trim_end_matches(PAGE_BREAK).split(PAGE_BREAK).collect();
        let (text, spans) = join_pages(&pages);
        Ok(finish(text, meta, spans))
    }
}

/// Picks a reader by file extension, falling back to plain text.
#[derive(Clone)]
pub struct ReaderRegistry {
    plain: Arc<dyn DocumentReader>,
    json: Arc<dyn DocumentReader>,
    paged: Arc<dyn DocumentReader>,
}

impl ReaderRegistry {
    pub fn new(lines_per_page: usize) -> Self {
        Self {
            plain: Arc::new(PlainTextReader { lines_per_page }),
            json: Arc::new(JsonReader { lines_per_page }),
            paged: Arc::new(PagedTextReader),
        }
    }

    pub fn for_path(&self, path: &Path) -> Arc<dyn DocumentReader> {
        let ext = path.extension().map(|e| e.to_string_lossy().to_lowercase());
        match ext.as_deref() {
            Some("json") => self.json.clone(),
            Some("pdftxt") | Some("pages") => self.paged.clone(),
            _ => self.plain.clone(),
        }
    }

    pub fn read(&self, path: &Path) -> Result<ExtractedDocument> {
        self.for_path(path).read(path)
    }
}

/// Regular files under `dir`, hidden entries skipped, sorted by path.
pub fn discover_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::NotFound(format!("documents directory {}", dir.display())));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}

fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let byte_at = |n: usize| text.char_indices().nth(n).map(|(b, _)| b).unwrap_or(text.len());
    let (s, e) = (byte_at(start), byte_at(end.max(start)));
    &text[s..e]
}

/// Normalize each page separately and rebuild the spans so page provenance
/// stays exact after whitespace and table rewriting.
pub fn normalize_document(doc: ExtractedDocument, table_mode: TableMode) -> ExtractedDocument {
    let ExtractedDocument { text, mut meta } = doc;
    if meta.page_spans.is_empty() {
        let text = preprocess_doc_text(&text, table_mode);
        meta.fields.insert("stats".into(), text_stats(&text));
        return ExtractedDocument { text, meta };
    }

    let pages: Vec<String> = meta
        .page_spans
        .iter()
        .map(|span| preprocess_doc_text(char_slice(&text, span.start, span.end), table_mode))
        .collect();
    let (text, mut spans) = join_pages(&pages);
    for (span, original) in spans.iter_mut().zip(&meta.page_spans) {
        span.page = original.page;
    }
    meta.page_spans = spans;
    meta.fields.insert("stats".into(), text_stats(&text));
    ExtractedDocument { text, meta }
}
