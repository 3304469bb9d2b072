//! LanceDB-backed dense index.

mod batch;
mod index;
mod schema;
mod table;

pub use index::LanceVectorIndex;
pub use schema::build_arrow_schema;
pub use table::{ensure_table, open_db};

pub(crate) fn lance_err(e: impl std::fmt::Display) -> docrag_core::Error {
    docrag_core::Error::Vector(e.to_string())
}
