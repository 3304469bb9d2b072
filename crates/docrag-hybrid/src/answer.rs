//! Grounded answers: prompt assembly, source listing and the completion seam.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use docrag_core::types::RetrievalHit;
use docrag_core::Result;

use crate::search::{HybridSearcher, SearchOptions};

/// Returned instead of calling the model when retrieval finds nothing.
pub const NO_INFORMATION: &str = "No information on this question was found in the indexed documents.";

pub const DEFAULT_SYSTEM: &str =
    "You are an assistant for technical documentation. Answer from the provided passages and cite pages.";

/// Chat-style text generation.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

fn pages_suffix(hit: &RetrievalHit) -> String {
    hit.page_range().map(|(s, e)| format!(", pages={s}-{e}")).unwrap_or_default()
}

/// One citation line per hit: `[i] file, pages=a-b` or `[i] file`.
pub fn format_sources(hits: &[RetrievalHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, h)| format!("[{}] {}{}", i + 1, h.file_name().unwrap_or("unknown"), pages_suffix(h)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt with a metadata line for every hit and as many passages as fit in
/// `max_chars`. Passages are added in rank order and the first one that would
/// overflow ends the context.
pub fn build_prompt(question: &str, hits: &[RetrievalHit], max_chars: usize) -> String {
    let meta_block = hits
        .iter()
        .enumerate()
        .map(|(i, h)| format!("[{}] file={}{}", i + 1, h.file_name().unwrap_or("unknown"), pages_suffix(h)))
        .collect::<Vec<_>>()
        .join("\n");

    let mut context = String::new();
    let mut used = 0usize;
    for (i, hit) in hits.iter().enumerate() {
        let text = hit.text().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }
        let block = format!("\n=== SOURCE [{}] ===\n{}\n", i + 1, text);
        let len = block.chars().count();
        if used + len > max_chars {
            break;
        }
        context.push_str(&block);
        used += len;
    }

    format!(
        "Question: {question}

Source metadata (may be used as facts):
{meta_block}

Context (document excerpts):
{context}

Instructions:
1) Answer briefly and to the point.
2) Prefer facts from the Context.
3) After each statement cite its source as ([source number, p. X-Y]).
   If a fact comes from the metadata (for example the file name), cite ([source number, metadata]).
4) End with \"Sources:\" listing only files and pages.
",
        context = context.trim()
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    /// Output of [`format_sources`] for the hits used.
    pub sources: String,
    pub hits: Vec<RetrievalHit>,
}

/// Hybrid retrieval followed by a single completion call.
#[derive(Clone)]
pub struct Answerer {
    searcher: HybridSearcher,
    llm: Arc<dyn TextCompletion>,
    max_context_chars: usize,
}

impl Answerer {
    pub fn new(searcher: HybridSearcher, llm: Arc<dyn TextCompletion>, max_context_chars: usize) -> Self {
        Self { searcher, llm, max_context_chars }
    }

    /// Zero hits yield [`NO_INFORMATION`] without calling the model. Retrieval
    /// and completion errors propagate.
    pub async fn answer(&self, question: &str, opts: &SearchOptions) -> Result<Answer> {
        let hits = self.searcher.search(question, opts).await?;
        if hits.is_empty() {
            info!("no hits, skipping generation");
            return Ok(Answer { text: NO_INFORMATION.to_string(), sources: String::new(), hits });
        }
        let prompt = build_prompt(question, &hits, self.max_context_chars);
        let text = self.llm.complete(DEFAULT_SYSTEM, &prompt).await?;
        Ok(Answer { text: text.trim().to_string(), sources: format_sources(&hits), hits })
    }
}
