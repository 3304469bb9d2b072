use std::sync::Arc;
use tracing::{debug, info};

use docrag_core::config::SearchSettings;
use docrag_core::traits::{Embedder, LexicalIndex, VectorIndex};
use docrag_core::types::{RetrievalHit, SearchFilter};
use docrag_core::Result;

use crate::dense::DenseRetriever;
use crate::fusion::{rrf_fuse, RRF_K};
use crate::lexical::LexicalRetriever;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub limit: usize,
    pub prefetch_dense: usize,
    pub prefetch_bm25: usize,
    /// Minimum cosine similarity for the dense leg. BM25 is never thresholded.
    pub score_threshold: Option<f32>,
    pub rrf_k: usize,
    /// Applied to both legs.
    pub filter: SearchFilter,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            prefetch_dense: 30,
            prefetch_bm25: 30,
            score_threshold: None,
            rrf_k: RRF_K,
            filter: SearchFilter::default(),
        }
    }
}

impl From<&SearchSettings> for SearchOptions {
    fn from(s: &SearchSettings) -> Self {
        Self {
            limit: s.top_k,
            prefetch_dense: s.prefetch_dense,
            prefetch_bm25: s.prefetch_bm25,
            score_threshold: s.score_threshold,
            rrf_k: s.rrf_k,
            filter: SearchFilter::default(),
        }
    }
}

impl SearchOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_threshold(mut self, threshold: Option<f32>) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Runs the dense and lexical legs concurrently and fuses them with RRF.
#[derive(Clone)]
pub struct HybridSearcher {
    dense: DenseRetriever,
    lexical: LexicalRetriever,
}

impl HybridSearcher {
    pub fn new(dense: DenseRetriever, lexical: LexicalRetriever) -> Self {
        Self { dense, lexical }
    }

    pub fn from_indices(embedder: Arc<dyn Embedder>, vector: Arc<dyn VectorIndex>, lexical: Arc<dyn LexicalIndex>) -> Self {
        Self::new(DenseRetriever::new(embedder, vector), LexicalRetriever::new(lexical))
    }

    pub fn dense(&self) -> &DenseRetriever {
        &self.dense
    }

    pub fn lexical(&self) -> &LexicalRetriever {
        &self.lexical
    }

    /// Fused hits, at most `opts.limit`. A failure in either leg fails the
    /// query.
    pub async fn search(&self, question: &str, opts: &SearchOptions) -> Result<Vec<RetrievalHit>> {
        if question.trim().is_empty() {
            return Ok(Vec::new());
        }

        let (dense, lexical) = tokio::join!(
            self.dense.search(question, opts.prefetch_dense, opts.score_threshold, &opts.filter),
            self.lexical.search_blocking(question.to_string(), opts.prefetch_bm25, opts.filter.clone()),
        );
        let dense = dense?;
        let lexical = lexical?;
        debug!(dense = dense.len(), lexical = lexical.len(), "fusing candidates");

        let fused = rrf_fuse(&dense, &lexical, opts.limit, opts.rrf_k);
        info!(hits = fused.len(), "hybrid search");
        Ok(fused)
    }
}
