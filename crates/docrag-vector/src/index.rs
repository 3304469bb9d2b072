use arrow_array::{Array, RecordBatch, RecordBatchIterator};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use tracing::{debug, info};

use docrag_core::traits::VectorIndex;
use docrag_core::types::{EmbeddedChunk, PointId, RetrievalHit, SearchFilter, VectorQuery};
use docrag_core::{Error, Result};

use crate::batch::{batch_to_hits, id_column, points_to_record_batch};
use crate::lance_err;
use crate::schema::{build_arrow_schema, vector_dim};
use crate::table::{ensure_table, open_db, sql_literal, table_exists};

/// One LanceDB table holding every point of a collection.
pub struct LanceVectorIndex {
    db: Connection,
    table_name: String,
}

impl LanceVectorIndex {
    pub async fn open(uri: &str, table_name: &str) -> Result<Self> {
        let db = open_db(uri).await?;
        Ok(Self { db, table_name: table_name.to_string() })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn table(&self) -> Result<Option<Table>> {
        if !table_exists(&self.db, &self.table_name).await? {
            return Ok(None);
        }
        let table = self.db.open_table(&self.table_name).execute().await.map_err(lance_err)?;
        Ok(Some(table))
    }

    async fn require_table(&self) -> Result<Table> {
        self.table()
            .await?
            .ok_or_else(|| Error::NotFound(format!("vector collection '{}'", self.table_name)))
    }

    async fn dim(table: &Table) -> Result<usize> {
        let schema = table.schema().await.map_err(lance_err)?;
        vector_dim(&schema).ok_or_else(|| Error::MalformedResponse("vector collection has no vector column".into()))
    }

    pub async fn count(&self) -> Result<usize> {
        match self.table().await? {
            Some(table) => table.count_rows(None).await.map_err(lance_err),
            None => Ok(0),
        }
    }

    async fn collect_ids(&self, table: &Table, filter: String) -> Result<Vec<PointId>> {
        let stream = table.query().only_if(filter).execute().await.map_err(lance_err)?;
        let batches: Vec<RecordBatch> = stream.try_collect().await.map_err(lance_err)?;
        let mut ids = Vec::new();
        for batch in &batches {
            let col = id_column(batch)?;
            ids.extend((0..col.len()).filter(|&i| !col.is_null(i)).map(|i| col.value(i)));
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

fn filter_expression(filter: &SearchFilter) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(file_name) = &filter.file_name {
        clauses.push(format!("file_name = {}", sql_literal(file_name)));
    }
    if let Some(doc_id) = &filter.doc_id {
        clauses.push(format!("doc_id = {}", sql_literal(doc_id)));
    }
    (!clauses.is_empty()).then(|| clauses.join(" AND "))
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    async fn ping(&self) -> Result<()> {
        self.db.table_names().execute().await.map_err(lance_err)?;
        Ok(())
    }

    async fn ensure_ready(&self, dim: usize) -> Result<()> {
        if let Some(table) = self.table().await? {
            let existing = Self::dim(&table).await?;
            if existing != dim {
                return Err(Error::Configuration(format!(
                    "vector collection '{}' has {existing} dimensions, embedder produces {dim}",
                    self.table_name
                )));
            }
            return Ok(());
        }
        ensure_table(&self.db, &self.table_name, build_arrow_schema(dim)).await?;
        info!(collection = %self.table_name, dim, "created vector collection");
        Ok(())
    }

    async fn upsert(&self, points: &[EmbeddedChunk]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let table = self.require_table().await?;
        let dim = Self::dim(&table).await?;
        let batch = points_to_record_batch(points, dim)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let mut mi = table.merge_insert(&["id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await.map_err(lance_err)?;
        debug!(points = points.len(), "vector upsert");
        Ok(())
    }

    async fn delete_by_doc_id(&self, doc_id: &str) -> Result<()> {
        let Some(table) = self.table().await? else { return Ok(()) };
        table.delete(&format!("doc_id = {}", sql_literal(doc_id))).await.map_err(lance_err)?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let Some(table) = self.table().await? else { return Ok(()) };
        table.delete("id IS NOT NULL").await.map_err(lance_err)?;
        info!(collection = %self.table_name, "cleared vector collection");
        Ok(())
    }

    async fn search(&self, query: &VectorQuery) -> Result<Vec<RetrievalHit>> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        let Some(table) = self.table().await? else { return Ok(Vec::new()) };

        let mut q = table.vector_search(query.vector.clone()).map_err(lance_err)?;
        if let Some(expr) = filter_expression(&query.filter) {
            q = q.only_if(expr);
        }
        let q = q.limit(query.limit).distance_type(DistanceType::Cosine);
        let stream = q.execute().await.map_err(lance_err)?;
        let batches: Vec<RecordBatch> = stream.try_collect().await.map_err(lance_err)?;

        let mut hits = Vec::new();
        for batch in &batches {
            hits.extend(batch_to_hits(batch)?);
        }
        if let Some(threshold) = query.score_threshold {
            hits.retain(|h| h.score >= threshold);
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(query.limit);
        Ok(hits)
    }

    async fn ids_for_doc(&self, doc_id: &str) -> Result<Vec<PointId>> {
        let Some(table) = self.table().await? else { return Ok(Vec::new()) };
        self.collect_ids(&table, format!("doc_id = {}", sql_literal(doc_id))).await
    }
}
