use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use docrag_core::retry::{retry_async, wait_ready, RetryPolicy, READY_POLL};
use docrag_core::traits::{LexicalIndex, VectorIndex};
use docrag_core::types::{Chunk, EmbeddedChunk};
use docrag_core::{Error, Result};

/// Keeps the vector and lexical indices in step.
///
/// Every call goes through bounded retry. Lexical calls run on the blocking
/// pool. Each lexical batch is one SQLite transaction, so a failure leaves the
/// pre-batch state.
#[derive(Clone)]
pub struct DualIndexWriter {
    vector: Arc<dyn VectorIndex>,
    lexical: Arc<dyn LexicalIndex>,
    batch_size: usize,
    retry: RetryPolicy,
}

impl DualIndexWriter {
    pub fn new(
        vector: Arc<dyn VectorIndex>,
        lexical: Arc<dyn LexicalIndex>,
        batch_size: usize,
        retry: RetryPolicy,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::Configuration("upsert batch size must be positive".into()));
        }
        Ok(Self { vector, lexical, batch_size, retry })
    }

    /// Poll the vector store until it answers.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        wait_ready("vector index", timeout, READY_POLL, || self.vector.ping()).await
    }

    /// Create the vector collection if missing and the lexical schema.
    pub async fn ensure_ready(&self, dim: usize) -> Result<()> {
        retry_async(&self.retry, "ensure vector collection", || self.vector.ensure_ready(dim)).await?;
        self.lexical_op("init lexical schema", |lexical| lexical.init()).await?;
        info!(dim, "indices ready");
        Ok(())
    }

    /// Remove every entry of `doc_id` from both indices.
    pub async fn delete_by_doc_id(&self, doc_id: &str) -> Result<()> {
        retry_async(&self.retry, "vector delete_by_doc_id", || self.vector.delete_by_doc_id(doc_id)).await?;
        let owned = doc_id.to_string();
        let removed =
            self.lexical_op("lexical delete_by_doc_id", move |lexical| lexical.delete_by_doc_id(&owned)).await?;
        debug!(doc_id, removed, "previous chunks deleted");
        Ok(())
    }

    /// Write `points` in batches: vector index first, then the lexical index.
    pub async fn upsert(&self, points: &[EmbeddedChunk]) -> Result<usize> {
        for (i, batch) in points.chunks(self.batch_size).enumerate() {
            retry_async(&self.retry, "vector upsert", || self.vector.upsert(batch)).await?;
            let rows: Arc<Vec<Chunk>> = Arc::new(batch.iter().map(|p| p.chunk.clone()).collect());
            self.lexical_op("lexical upsert", move |lexical| {
                let refs: Vec<&Chunk> = rows.iter().collect();
                lexical.upsert(&refs)
            })
            .await?;
            debug!(batch = i, size = batch.len(), "batch written");
        }
        Ok(points.len())
    }

    /// Empty both indices, keeping their schemas.
    pub async fn wipe(&self) -> Result<()> {
        retry_async(&self.retry, "vector clear", || self.vector.clear()).await?;
        self.lexical_op("lexical clear", |lexical| lexical.clear()).await?;
        info!("indices wiped");
        Ok(())
    }

    /// Run `op` against the lexical index on the blocking pool, retrying with
    /// the async sleep between attempts.
    async fn lexical_op<T, F>(&self, what: &str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: Fn(&dyn LexicalIndex) -> Result<T> + Clone + Send + Sync + 'static,
    {
        retry_async(&self.retry, what, || {
            let lexical = self.lexical.clone();
            let op = op.clone();
            async move {
                tokio::task::spawn_blocking(move || op(lexical.as_ref()))
                    .await
                    .map_err(|e| Error::Lexical(format!("lexical task failed: {e}")))?
            }
        })
        .await
    }
}
