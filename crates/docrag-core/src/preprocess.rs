//! Text normalization applied to extracted documents before chunking.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static MULTI_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("Invalid spaces regex"));
static MANY_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("Invalid newlines regex"));
static BLANKISH_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]+\n").expect("Invalid blank line regex"));
static LEADERS_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.\x{00B7}]{5,}").expect("Invalid leader regex"));
static LEADERS_SPACED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\s*\.\s*){5,}").expect("Invalid leader regex"));
static DOUBLE_COLON: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*:\s*:\s*").expect("Invalid colon regex"));
static TABLE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s|:\-]+$").expect("Invalid separator regex"));

/// What to do with markdown tables found in extracted text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableMode {
    /// Rewrite each row as `header: value; ...`.
    #[default]
    Linearize,
    Drop,
}

fn is_table_row(line: &str) -> bool {
    let s = line.trim();
    s.starts_with('|') && s.ends_with('|') && s.matches('|').count() >= 2
}

fn split_row(line: &str) -> Vec<String> {
    line.trim().trim_matches('|').split('|').map(|c| c.trim().to_string()).collect()
}

/// Replace markdown tables (a `|...|` row followed by a `|---|` separator)
/// according to `mode`. Other lines pass through untouched.
pub fn tables_to_text(text: &str, mode: TableMode) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let header_line = lines[i];
        let starts_table = is_table_row(header_line)
            && lines.get(i + 1).is_some_and(|sep| is_table_row(sep) && TABLE_SEPARATOR.is_match(sep.trim()));
        if !starts_table {
            out.push(header_line.to_string());
            i += 1;
            continue;
        }

        let header = split_row(header_line);
        i += 2;
        let mut rows = Vec::new();
        while i < lines.len() && is_table_row(lines[i]) {
            rows.push(split_row(lines[i]));
            i += 1;
        }
        if mode == TableMode::Drop {
            continue;
        }

        out.push("TABLE:".to_string());
        for row in rows {
            let pairs: Vec<String> = (0..header.len().max(row.len()))
                .filter_map(|idx| {
                    let h = header.get(idx).cloned().unwrap_or_else(|| format!("col_{}", idx + 1));
                    let v = row.get(idx).map(String::as_str).unwrap_or("");
                    (!h.trim().is_empty() || !v.trim().is_empty()).then(|| format!("{h}: {v}").trim().to_string())
                })
                .collect();
            if !pairs.is_empty() {
                out.push(pairs.join("; "));
            }
        }
        out.push(String::new());
    }
    out.join("\n")
}

/// Collapse table-of-contents dot leaders into ` : `.
pub fn normalize_leaders(text: &str) -> String {
    let text = LEADERS_DOTS.replace_all(text, " : ");
    let text = LEADERS_SPACED.replace_all(&text, " : ");
    let text = DOUBLE_COLON.replace_all(&text, " : ");
    MULTI_SPACES.replace_all(&text, " ").into_owned()
}

pub fn clean_text(text: &str) -> String {
    let text = text.replace('\r', "\n");
    let text = MULTI_SPACES.replace_all(&text, " ");
    let text = MANY_NEWLINES.replace_all(&text, "\n\n");
    let text = text.lines().map(str::trim_end).collect::<Vec<_>>().join("\n");
    let text = BLANKISH_LINE.replace_all(&text, "\n\n");
    text.trim().to_string()
}

pub fn preprocess_doc_text(text: &str, table_mode: TableMode) -> String {
    let text = tables_to_text(text, table_mode);
    let text = normalize_leaders(&text);
    clean_text(&text)
}
