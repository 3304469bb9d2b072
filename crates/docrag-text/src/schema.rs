use rusqlite::Connection;

pub(crate) fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )
}

/// Content table plus an external-content FTS5 table over `text`. Both are
/// written together; `chunks_fts` never holds text of its own.
pub(crate) fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS chunks (
             id          INTEGER PRIMARY KEY,
             text        TEXT NOT NULL,
             doc_id      TEXT,
             file_name   TEXT,
             chunk_id    TEXT,
             chunk_index INTEGER,
             page_start  INTEGER,
             page_end    INTEGER,
             char_start  INTEGER,
             char_end    INTEGER
         );
         CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
             text,
             content = 'chunks',
             content_rowid = 'id',
             tokenize = 'unicode61'
         );
         CREATE INDEX IF NOT EXISTS idx_chunks_doc_id ON chunks(doc_id);
         CREATE INDEX IF NOT EXISTS idx_chunks_file_name ON chunks(file_name);",
    )
}
