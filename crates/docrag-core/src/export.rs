//! Newline-delimited JSON export of indexed chunks.
//!
//! The export is an audit artifact: retrieval never reads it back.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::types::Chunk;

/// Remove any previous export and create an empty file in its place.
pub fn reset_export(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    File::create(path)?;
    Ok(())
}

/// Append one JSON object per chunk (`id`, `text` and flattened metadata).
pub fn export_rows_jsonl_append(chunks: &[Chunk], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut out = BufWriter::new(file);
    for chunk in chunks {
        serde_json::to_writer(&mut out, &chunk.export_row())?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
