//! docrag-hybrid
//!
//! Hybrid retrieval on top of the dense and lexical indices: both retrievers,
//! reciprocal rank fusion, the dual index writer, the re-ingestion
//! controller and answer assembly.

pub mod answer;
pub mod context;
pub mod dense;
pub mod fusion;
pub mod ingest;
pub mod lexical;
pub mod ollama;
pub mod search;
pub mod writer;

pub use answer::{build_prompt, format_sources, Answer, Answerer, TextCompletion, NO_INFORMATION};
pub use context::RagContext;
pub use dense::DenseRetriever;
pub use fusion::{rrf_fuse, RRF_K};
pub use ingest::{DocumentOutcome, IngestController, IngestFailure, IngestOptions, IngestReport, IngestStage, StageError};
pub use lexical::LexicalRetriever;
pub use ollama::OllamaClient;
pub use search::{HybridSearcher, SearchOptions};
pub use writer::DualIndexWriter;
