//! `docrag` command line: ingest a document directory, search it, or ask a
//! question answered by a local Ollama model.
//!
//! ```bash
//! docrag ingest ./documents --wipe
//! docrag search "relief valve torque" -n 5 --json
//! docrag ask "What is the relief valve torque?" --file manual.pdftxt
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use docrag_core::config::Settings;
use docrag_core::types::{RetrievalHit, SearchFilter};
use docrag_hybrid::{format_sources, IngestOptions, OllamaClient, RagContext, SearchOptions};

#[derive(Parser)]
#[command(name = "docrag", version, about = "Hybrid dense + BM25 retrieval over local documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index every file under DIR (default: paths.documents_dir).
    Ingest {
        dir: Option<PathBuf>,
        /// Empty both indices first.
        #[arg(long)]
        wipe: bool,
        #[arg(long)]
        no_progress: bool,
    },
    /// Print the fused hits for QUERY.
    Search {
        query: String,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Only search chunks of this file name.
        #[arg(long)]
        file: Option<String>,
        /// Minimum cosine similarity for the dense leg.
        #[arg(long)]
        threshold: Option<f32>,
        #[arg(long)]
        json: bool,
    },
    /// Answer QUESTION from the retrieved passages.
    Ask {
        question: String,
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
        #[arg(long)]
        json: bool,
    },
}

fn search_options(ctx: &RagContext, limit: Option<usize>, file: Option<String>, threshold: Option<f32>) -> SearchOptions {
    let mut opts = ctx.search_options();
    if let Some(limit) = limit {
        opts = opts.with_limit(limit);
    }
    if threshold.is_some() {
        opts = opts.with_threshold(threshold);
    }
    if let Some(file) = file {
        opts = opts.with_filter(SearchFilter::file_name(file));
    }
    opts
}

fn print_hits(hits: &[RetrievalHit]) {
    if hits.is_empty() {
        println!("No results.");
        return;
    }
    let sources = format_sources(hits);
    for (hit, source) in hits.iter().zip(sources.lines()) {
        println!("{source}  (score {:.4})", hit.score);
        let text = hit.text().unwrap_or("").replace('\n', " ");
        let preview: String = text.chars().take(240).collect();
        println!("    {preview}{}", if text.chars().count() > 240 { "..." } else { "" });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::load().context("loading configuration")?;
    let ctx = RagContext::open(settings).await.context("opening indices")?;

    match cli.command {
        Command::Ingest { dir, wipe, no_progress } => {
            let dir = dir.unwrap_or_else(|| ctx.settings().paths.documents_dir());
            let defaults = IngestOptions::from(ctx.settings());
            let options = IngestOptions { wipe: wipe || defaults.wipe, show_progress: !no_progress, ..defaults };
            let export = options.export_path.clone();
            let report = ctx
                .ingest_controller(options)?
                .run(&dir)
                .await
                .with_context(|| format!("ingesting {}", dir.display()))?;

            println!(
                "Ingested {} of {} files ({} chunks, {} skipped, {} failed)",
                report.documents_indexed,
                report.files_seen,
                report.chunks_written,
                report.skipped.len(),
                report.failures.len()
            );
            for failure in &report.failures {
                println!("  FAILED {} [{}]: {}", failure.path.display(), failure.stage, failure.error);
            }
            if let Some(export) = export {
                println!("Chunk export: {}", export.display());
            }
        }
        Command::Search { query, limit, file, threshold, json } => {
            let opts = search_options(&ctx, limit, file, threshold);
            let hits = ctx.searcher().search(&query, &opts).await.context("search failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                print_hits(&hits);
            }
        }
        Command::Ask { question, file, top_k, threshold, json } => {
            let opts = search_options(&ctx, top_k, file, threshold);
            let llm = Arc::new(OllamaClient::new(&ctx.settings().llm)?);
            let answer = ctx.answerer(llm).answer(&question, &opts).await.context("answering failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("{}", answer.text);
                if !answer.sources.is_empty() {
                    println!("\nSources:\n{}", answer.sources);
                }
            }
        }
    }
    Ok(())
}
