use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, StringArray, UInt64Array};
use serde_json::Value;
use std::sync::Arc;

use docrag_core::types::{EmbeddedChunk, Payload, PointId, RetrievalHit};
use docrag_core::{Error, Result};

use crate::lance_err;
use crate::schema::build_arrow_schema;

pub(crate) fn points_to_record_batch(points: &[EmbeddedChunk], dim: usize) -> Result<RecordBatch> {
    let mut ids = Vec::with_capacity(points.len());
    let mut doc_ids = Vec::with_capacity(points.len());
    let mut chunk_ids = Vec::with_capacity(points.len());
    let mut file_names = Vec::with_capacity(points.len());
    let mut texts = Vec::with_capacity(points.len());
    let mut payloads = Vec::with_capacity(points.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(points.len());

    for point in points {
        if point.vector.len() != dim {
            return Err(Error::MalformedResponse(format!(
                "embedding has {} dimensions, collection expects {dim}",
                point.vector.len()
            )));
        }
        let chunk = &point.chunk;
        ids.push(chunk.point_id);
        doc_ids.push(chunk.doc_id.clone());
        chunk_ids.push(chunk.chunk_id.clone());
        file_names.push(chunk.file_name().map(str::to_string));
        texts.push(chunk.text.clone());
        payloads.push(serde_json::to_string(&chunk.payload())?);
        vectors.push(Some(point.vector.iter().map(|&x| Some(x)).collect()));
    }

    RecordBatch::try_new(
        build_arrow_schema(dim),
        vec![
            Arc::new(UInt64Array::from(ids)),
            Arc::new(StringArray::from(doc_ids)),
            Arc::new(StringArray::from(chunk_ids)),
            Arc::new(StringArray::from(file_names)),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(payloads)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim as i32)),
        ],
    )
    .map_err(lance_err)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a StringArray> {
    batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<StringArray>())
}

pub(crate) fn id_column(batch: &RecordBatch) -> Result<&UInt64Array> {
    batch
        .column_by_name("id")
        .and_then(|c| c.as_any().downcast_ref::<UInt64Array>())
        .ok_or_else(|| Error::MalformedResponse("vector index: id column missing".into()))
}

/// Convert search results to hits. `score = 1 - cosine distance`; rows with a
/// null id are skipped.
pub(crate) fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<RetrievalHit>> {
    let ids = id_column(batch)?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| Error::MalformedResponse("vector index: _distance column missing".into()))?;
    let payloads = string_column(batch, "payload");
    let texts = string_column(batch, "text");
    let doc_ids = string_column(batch, "doc_id");
    let chunk_ids = string_column(batch, "chunk_id");

    let mut hits = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        if ids.is_null(i) {
            continue;
        }
        let mut payload: Payload = payloads
            .filter(|p| !p.is_null(i))
            .and_then(|p| serde_json::from_str(p.value(i)).ok())
            .unwrap_or_default();
        for (key, column) in [("text", texts), ("doc_id", doc_ids), ("chunk_id", chunk_ids)] {
            if let Some(col) = column.filter(|c| !c.is_null(i)) {
                payload.entry(key).or_insert_with(|| Value::from(col.value(i)));
            }
        }
        hits.push(RetrievalHit { id: ids.value(i) as PointId, score: 1.0 - distances.value(i), payload });
    }
    Ok(hits)
}
