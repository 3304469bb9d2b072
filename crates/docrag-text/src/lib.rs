//! SQLite FTS5 lexical index with BM25 ranking.

mod index;
mod query;
mod schema;

pub use index::FtsIndex;
pub use query::fts_match_expression;
