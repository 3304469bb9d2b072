use std::sync::Arc;
use tracing::info;

use docrag_core::chunking::Chunker;
use docrag_core::config::{expand_path, Settings};
use docrag_core::retry::RetryPolicy;
use docrag_core::traits::{Embedder, LexicalIndex, VectorIndex};
use docrag_core::Result;
use docrag_embed::get_default_embedder;
use docrag_text::FtsIndex;
use docrag_vector::LanceVectorIndex;

use crate::answer::{Answerer, TextCompletion};
use crate::ingest::{IngestController, IngestOptions};
use crate::search::{HybridSearcher, SearchOptions};
use crate::writer::DualIndexWriter;

/// Everything a process needs to ingest or answer, built once from
/// [`Settings`] and shared read-only behind an `Arc`.
pub struct RagContext {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    vector: Arc<dyn VectorIndex>,
    lexical: Arc<dyn LexicalIndex>,
    searcher: HybridSearcher,
}

impl RagContext {
    /// Load the embedder and open both indices.
    pub async fn open(settings: Settings) -> Result<Arc<Self>> {
        settings.validate()?;
        let embedder = get_default_embedder(&settings.embedding)?;
        let uri = expand_path(&settings.vector.uri);
        let vector = LanceVectorIndex::open(&uri.to_string_lossy(), &settings.vector.collection).await?;
        let lexical = FtsIndex::open(&settings.paths.fts_db_path())?;
        info!(
            vector_uri = %uri.display(),
            collection = %settings.vector.collection,
            fts = %settings.paths.fts_db_path().display(),
            dim = embedder.dim(),
            "context ready"
        );
        Ok(Arc::new(Self::from_parts(settings, embedder, Arc::new(vector), Arc::new(lexical))))
    }

    pub fn from_parts(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        vector: Arc<dyn VectorIndex>,
        lexical: Arc<dyn LexicalIndex>,
    ) -> Self {
        let searcher = HybridSearcher::from_indices(embedder.clone(), vector.clone(), lexical.clone());
        Self { settings, embedder, vector, lexical, searcher }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn searcher(&self) -> &HybridSearcher {
        &self.searcher
    }

    /// Search options from the `[search]` settings.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions::from(&self.settings.search)
    }

    pub fn writer(&self) -> Result<DualIndexWriter> {
        DualIndexWriter::new(
            self.vector.clone(),
            self.lexical.clone(),
            self.settings.ingest.upsert_batch_size,
            RetryPolicy::from(&self.settings.retry),
        )
    }

    pub fn ingest_controller(&self, options: IngestOptions) -> Result<IngestController> {
        let chunker = Chunker::new(self.settings.chunking)?;
        Ok(IngestController::new(chunker, self.embedder.clone(), self.writer()?, options))
    }

    pub fn answerer(&self, llm: Arc<dyn TextCompletion>) -> Answerer {
        Answerer::new(self.searcher.clone(), llm, self.settings.llm.max_context_chars)
    }
}
