use std::sync::Arc;
use tracing::debug;

use docrag_core::traits::LexicalIndex;
use docrag_core::types::{RetrievalHit, SearchFilter};
use docrag_core::{Error, Result};

/// BM25 retrieval over the full-text index. Scores are higher-is-better.
#[derive(Clone)]
pub struct LexicalRetriever {
    index: Arc<dyn LexicalIndex>,
}

impl LexicalRetriever {
    pub fn new(index: Arc<dyn LexicalIndex>) -> Self {
        Self { index }
    }

    /// Blank queries return nothing without touching the index.
    pub fn search(&self, query: &str, limit: usize, filter: &SearchFilter) -> Result<Vec<RetrievalHit>> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let hits = self.index.search(query, limit, filter)?;
        debug!(limit, hits = hits.len(), "lexical leg done");
        Ok(hits)
    }

    /// [`Self::search`] on the blocking pool.
    pub async fn search_blocking(&self, query: String, limit: usize, filter: SearchFilter) -> Result<Vec<RetrievalHit>> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.search(&query, limit, &filter))
            .await
            .map_err(|e| Error::Lexical(format!("search task failed: {e}")))?
    }
}
