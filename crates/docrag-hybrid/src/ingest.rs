//! Re-ingestion of a document directory into both indices.
//!
//! Each file moves through `Discovered -> Extracted -> Chunked -> Embedded ->
//! IndexReady`. Between `Embedded` and the upsert the document's previous
//! chunks are always deleted from both indices, so a re-run over unchanged
//! files converges to the same state. A failing document is recorded in the
//! report and the run continues with the next one.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use docrag_core::chunking::Chunker;
use docrag_core::config::Settings;
use docrag_core::export::{export_rows_jsonl_append, reset_export};
use docrag_core::preprocess::TableMode;
use docrag_core::reader::{discover_files, normalize_document, ReaderRegistry};
use docrag_core::traits::Embedder;
use docrag_core::types::{EmbeddedChunk, ExtractedDocument};
use docrag_core::{Error, Result};

use crate::writer::DualIndexWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Discovered,
    Extracted,
    Chunked,
    Embedded,
    IndexReady,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Discovered => "discovered",
            Self::Extracted => "extracted",
            Self::Chunked => "chunked",
            Self::Embedded => "embedded",
            Self::IndexReady => "index_ready",
        };
        f.write_str(s)
    }
}

/// A document-level failure. `stage` is the last stage the document reached.
#[derive(Debug, thiserror::Error)]
#[error("failed after stage {stage}: {source}")]
pub struct StageError {
    pub stage: IngestStage,
    #[source]
    pub source: Error,
}

fn at(stage: IngestStage) -> impl FnOnce(Error) -> StageError {
    move |source| StageError { stage, source }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    pub path: PathBuf,
    pub stage: IngestStage,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    Indexed { doc_id: String, chunks: usize },
    /// Nothing to index (empty text or every passage below the minimum size).
    Skipped { doc_id: String },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub files_seen: usize,
    pub documents_indexed: usize,
    pub chunks_written: usize,
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<IngestFailure>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Empty both indices before the run.
    pub wipe: bool,
    pub show_progress: bool,
    pub table_mode: TableMode,
    pub lines_per_page: usize,
    pub ready_timeout: Duration,
    /// JSONL audit export, recreated at the start of each run.
    pub export_path: Option<PathBuf>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            wipe: false,
            show_progress: false,
            table_mode: TableMode::default(),
            lines_per_page: 80,
            ready_timeout: Duration::from_secs(120),
            export_path: None,
        }
    }
}

impl From<&Settings> for IngestOptions {
    fn from(s: &Settings) -> Self {
        Self {
            wipe: s.ingest.wipe_collection,
            show_progress: true,
            table_mode: s.ingest.table_mode,
            lines_per_page: s.ingest.lines_per_page,
            ready_timeout: s.retry.ready_timeout(),
            export_path: Some(s.paths.export_path()),
        }
    }
}

pub struct IngestController {
    readers: ReaderRegistry,
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    writer: DualIndexWriter,
    options: IngestOptions,
}

impl IngestController {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>, writer: DualIndexWriter, options: IngestOptions) -> Self {
        Self { readers: ReaderRegistry::new(options.lines_per_page), chunker, embedder, writer, options }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Ingest every file under `dir`.
    ///
    /// Errors are returned only for run-level problems: a missing directory,
    /// an unreachable vector store or an unwritable export. Document failures
    /// end up in the report.
    pub async fn run(&self, dir: &Path) -> Result<IngestReport> {
        let files = discover_files(dir)?;
        let mut report = IngestReport { files_seen: files.len(), ..Default::default() };
        if files.is_empty() {
            warn!(dir = %dir.display(), "no files to ingest");
            return Ok(report);
        }
        info!(dir = %dir.display(), files = files.len(), "starting ingestion");

        self.writer.wait_ready(self.options.ready_timeout).await?;
        if self.options.wipe {
            self.writer.wipe().await?;
        }
        self.writer.ensure_ready(self.embedder.dim()).await?;
        if let Some(path) = &self.options.export_path {
            reset_export(path)?;
        }

        let pb = self.progress_bar(files.len() as u64);
        for path in &files {
            pb.set_message(path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
            match self.ingest_path(path).await {
                Ok(DocumentOutcome::Indexed { chunks, .. }) => {
                    report.documents_indexed += 1;
                    report.chunks_written += chunks;
                }
                Ok(DocumentOutcome::Skipped { doc_id }) => {
                    warn!(path = %path.display(), doc_id = %doc_id, "no chunks produced, skipping");
                    report.skipped.push(path.clone());
                }
                Err(e) => {
                    warn!(path = %path.display(), stage = %e.stage, error = %e.source, "document failed");
                    report.failures.push(IngestFailure { path: path.clone(), stage: e.stage, error: e.source.to_string() });
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        info!(
            files = report.files_seen,
            indexed = report.documents_indexed,
            chunks = report.chunks_written,
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "ingestion finished"
        );
        Ok(report)
    }

    /// Read, normalize and index one file.
    pub async fn ingest_path(&self, path: &Path) -> std::result::Result<DocumentOutcome, StageError> {
        let doc = self.readers.read(path).map_err(at(IngestStage::Discovered))?;
        let doc = normalize_document(doc, self.options.table_mode);
        self.ingest_document(&doc).await
    }

    /// Chunk, embed, replace and export one extracted document.
    pub async fn ingest_document(&self, doc: &ExtractedDocument) -> std::result::Result<DocumentOutcome, StageError> {
        let chunks = self.chunker.chunk_document(doc).map_err(at(IngestStage::Extracted))?;
        let doc_id = doc.meta.doc_id.clone().unwrap_or_default();
        if chunks.is_empty() {
            return Ok(DocumentOutcome::Skipped { doc_id });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embedder = self.embedder.clone();
        let vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
            .await
            .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))
            .and_then(|r| r)
            .map_err(at(IngestStage::Chunked))?;
        if vectors.len() != chunks.len() {
            return Err(StageError {
                stage: IngestStage::Chunked,
                source: Error::MalformedResponse(format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    chunks.len()
                )),
            });
        }
        let points: Vec<EmbeddedChunk> =
            chunks.into_iter().zip(vectors).map(|(chunk, vector)| EmbeddedChunk { chunk, vector }).collect();

        self.writer.delete_by_doc_id(&doc_id).await.map_err(at(IngestStage::Embedded))?;
        let written = self.writer.upsert(&points).await.map_err(at(IngestStage::Embedded))?;

        if let Some(path) = &self.options.export_path {
            let rows: Vec<_> = points.into_iter().map(|p| p.chunk).collect();
            export_rows_jsonl_append(&rows, path).map_err(at(IngestStage::IndexReady))?;
        }
        info!(doc_id = %doc_id, chunks = written, file = doc.meta.file_name().unwrap_or("?"), "document indexed");
        Ok(DocumentOutcome::Indexed { doc_id, chunks: written })
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        let style = ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }
}
