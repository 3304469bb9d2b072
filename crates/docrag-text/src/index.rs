use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use docrag_core::traits::LexicalIndex;
use docrag_core::types::{Chunk, Payload, PointId, RetrievalHit, SearchFilter};
use docrag_core::{Error, Result};

use crate::query::fts_match_expression;
use crate::schema::{configure_connection, init_schema};

fn sql_err(e: rusqlite::Error) -> Error {
    Error::Lexical(e.to_string())
}

/// Rowids are the point ids reinterpreted as signed integers.
fn rowid(id: PointId) -> i64 {
    id as i64
}

pub struct FtsIndex {
    conn: Mutex<Connection>,
}

impl FtsIndex {
    /// Open (or create) the database file; parent directories are created.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(sql_err)?;
        configure_connection(&conn).map_err(sql_err)?;
        let index = Self { conn: Mutex::new(conn) };
        index.init()?;
        Ok(index)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        let index = Self { conn: Mutex::new(conn) };
        index.init()?;
        Ok(index)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::Lexical("connection lock poisoned".into()))
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0)).map_err(sql_err)?;
        Ok(n as usize)
    }

    /// Postings currently matching `query`, bypassing the content join.
    pub fn fts_match_count(&self, query: &str) -> Result<usize> {
        let Some(expr) = fts_match_expression(query) else { return Ok(0) };
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunks_fts WHERE chunks_fts MATCH ?1", [expr], |r| r.get(0))
            .map_err(sql_err)?;
        Ok(n as usize)
    }
}

fn upsert_rows(conn: &mut Connection, chunks: &[&Chunk]) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    for chunk in chunks {
        let id = rowid(chunk.point_id);
        let old: Option<String> = tx
            .query_row("SELECT text FROM chunks WHERE id = ?1", [id], |r| r.get(0))
            .optional()?;
        if let Some(old) = old {
            tx.execute("INSERT INTO chunks_fts(chunks_fts, rowid, text) VALUES('delete', ?1, ?2)", params![id, old])?;
        }
        let file_name = chunk
            .file_name()
            .or_else(|| chunk.meta.get("source_file").and_then(Value::as_str));
        tx.execute(
            "INSERT OR REPLACE INTO chunks
             (id, text, doc_id, file_name, chunk_id, chunk_index, page_start, page_end, char_start, char_end)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                chunk.text,
                chunk.doc_id,
                file_name,
                chunk.chunk_id,
                chunk.chunk_index as i64,
                chunk.page_start,
                chunk.page_end,
                chunk.char_start as i64,
                chunk.char_end as i64,
            ],
        )?;
        tx.execute("INSERT INTO chunks_fts(rowid, text) VALUES(?1, ?2)", params![id, chunk.text])?;
    }
    tx.commit()
}

fn delete_rows(conn: &mut Connection, doc_id: &str) -> rusqlite::Result<usize> {
    let tx = conn.transaction()?;
    let rows: Vec<(i64, String)> = {
        let mut stmt = tx.prepare("SELECT id, text FROM chunks WHERE doc_id = ?1")?;
        let rows = stmt
            .query_map([doc_id], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };
    for (id, text) in &rows {
        tx.execute("INSERT INTO chunks_fts(chunks_fts, rowid, text) VALUES('delete', ?1, ?2)", params![id, text])?;
        tx.execute("DELETE FROM chunks WHERE id = ?1", [id])?;
    }
    tx.commit()?;
    Ok(rows.len())
}

fn row_to_hit(row: &Row<'_>) -> rusqlite::Result<RetrievalHit> {
    let id: i64 = row.get("id")?;
    let bm25: f64 = row.get("bm25_score")?;
    let mut payload = Payload::new();
    payload.insert("text".into(), json!(row.get::<_, String>("text")?));
    payload.insert("doc_id".into(), json!(row.get::<_, Option<String>>("doc_id")?));
    payload.insert("file_name".into(), json!(row.get::<_, Option<String>>("file_name")?));
    payload.insert("chunk_id".into(), json!(row.get::<_, Option<String>>("chunk_id")?));
    for key in ["chunk_index", "page_start", "page_end", "char_start", "char_end"] {
        payload.insert(key.into(), json!(row.get::<_, Option<i64>>(key)?));
    }
    Ok(RetrievalHit { id: id as PointId, score: -bm25 as f32, payload })
}

impl LexicalIndex for FtsIndex {
    fn init(&self) -> Result<()> {
        let conn = self.lock()?;
        init_schema(&conn).map_err(sql_err)
    }

    fn upsert(&self, chunks: &[&Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock()?;
        upsert_rows(&mut conn, chunks).map_err(sql_err)?;
        debug!(rows = chunks.len(), "fts upsert");
        Ok(())
    }

    fn delete_by_doc_id(&self, doc_id: &str) -> Result<usize> {
        let mut conn = self.lock()?;
        let removed = delete_rows(&mut conn, doc_id).map_err(sql_err)?;
        debug!(doc_id, removed, "fts delete");
        Ok(removed)
    }

    fn clear(&self) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(sql_err)?;
        tx.execute_batch("DELETE FROM chunks; INSERT INTO chunks_fts(chunks_fts) VALUES('delete-all');")
            .map_err(sql_err)?;
        tx.commit().map_err(sql_err)
    }

    fn search(&self, query: &str, limit: usize, filter: &SearchFilter) -> Result<Vec<RetrievalHit>> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let Some(expr) = fts_match_expression(query) else { return Ok(Vec::new()) };

        let mut clauses = vec!["chunks_fts MATCH ?"];
        let mut args = vec![SqlValue::Text(expr)];
        if let Some(file_name) = &filter.file_name {
            clauses.push("c.file_name = ?");
            args.push(SqlValue::Text(file_name.clone()));
        }
        if let Some(doc_id) = &filter.doc_id {
            clauses.push("c.doc_id = ?");
            args.push(SqlValue::Text(doc_id.clone()));
        }
        args.push(SqlValue::Integer(limit as i64));

        let sql = format!(
            "SELECT c.id AS id, c.text AS text, c.doc_id AS doc_id, c.file_name AS file_name,
                    c.chunk_id AS chunk_id, c.chunk_index AS chunk_index,
                    c.page_start AS page_start, c.page_end AS page_end,
                    c.char_start AS char_start, c.char_end AS char_end,
                    bm25(chunks_fts) AS bm25_score
             FROM chunks_fts
             JOIN chunks c ON c.id = chunks_fts.rowid
             WHERE {}
             ORDER BY bm25_score ASC
             LIMIT ?",
            clauses.join(" AND ")
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
        let hits = stmt
            .query_map(params_from_iter(args.iter()), row_to_hit)
            .map_err(sql_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sql_err)?;
        Ok(hits)
    }

    fn ids_for_doc(&self, doc_id: &str) -> Result<Vec<PointId>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM chunks WHERE doc_id = ?1 ORDER BY id").map_err(sql_err)?;
        let ids = stmt
            .query_map([doc_id], |r| r.get::<_, i64>(0))
            .map_err(sql_err)?
            .map(|r| r.map(|id| id as PointId))
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sql_err)?;
        Ok(ids)
    }
}
