use std::sync::Arc;
use tracing::debug;

use docrag_core::traits::{Embedder, VectorIndex};
use docrag_core::types::{RetrievalHit, SearchFilter, VectorQuery};
use docrag_core::{Error, Result};

/// Embeds the query with the ingestion embedder and runs a cosine
/// nearest-neighbour query against the vector index.
#[derive(Clone)]
pub struct DenseRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl DenseRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Embed `query` off the async runtime. A non-empty query that yields no
    /// vector is a [`Error::MalformedResponse`].
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let embedder = self.embedder.clone();
        let texts = vec![query.to_string()];
        let vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
            .await
            .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))??;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| Error::MalformedResponse("embedder returned no vector for a non-empty query".into()))
    }

    /// Hits ordered by descending similarity. With `score_threshold` set the
    /// index drops weaker hits, so the result may be empty.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        score_threshold: Option<f32>,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievalHit>> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embed_query(query).await?;
        let hits = self
            .index
            .search(&VectorQuery { vector, limit, filter: filter.clone(), score_threshold })
            .await?;
        debug!(limit, hits = hits.len(), "dense leg done");
        Ok(hits)
    }
}
