//! docrag-core
//!
//! Shared domain types, traits and plumbing for the docrag workspace: the
//! chunker, document readers and text normalization, configuration, retry
//! helpers and the JSONL chunk export.

pub mod chunking;
pub mod config;
pub mod error;
pub mod export;
pub mod preprocess;
pub mod reader;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
