//! Layered configuration and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys are addressed in the environment with `__`, e.g.
//! `APP_CHUNKING__TARGET_CHARS=1200`. Every setting has a default, so an empty
//! figment yields a usable [`Settings`].

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::chunking::ChunkingConfig;
use crate::error::{Error, Result};
use crate::preprocess::TableMode;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self::from_figment(figment))
    }

    /// Wrap an already assembled figment (tests, embedding applications).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub vector: VectorSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingConfig,
    pub ingest: IngestSettings,
    pub retry: RetrySettings,
    pub search: SearchSettings,
    pub llm: LlmSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::load()?.settings()
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.ingest.upsert_batch_size == 0 {
            return Err(Error::Configuration("ingest.upsert_batch_size must be positive".into()));
        }
        if self.ingest.lines_per_page == 0 {
            return Err(Error::Configuration("ingest.lines_per_page must be positive".into()));
        }
        if self.search.rrf_k == 0 {
            return Err(Error::Configuration("search.rrf_k must be positive".into()));
        }
        if self.retry.retry_count == 0 {
            return Err(Error::Configuration("retry.retry_count must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub documents_dir: String,
    pub exports_dir: String,
    pub fts_db_path: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            documents_dir: "documents".into(),
            exports_dir: "exports".into(),
            fts_db_path: "exports/fts.sqlite3".into(),
        }
    }
}

impl PathSettings {
    pub fn documents_dir(&self) -> PathBuf {
        expand_path(&self.documents_dir)
    }

    pub fn exports_dir(&self) -> PathBuf {
        expand_path(&self.exports_dir)
    }

    pub fn fts_db_path(&self) -> PathBuf {
        expand_path(&self.fts_db_path)
    }

    /// JSONL audit export of every chunk written by the last ingestion run.
    pub fn export_path(&self) -> PathBuf {
        self.exports_dir().join("chunks.jsonl")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    pub uri: String,
    pub collection: String,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self { uri: "data/lancedb".into(), collection: "my_documents".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Directory holding `config.json`, `tokenizer.json` and weights.
    pub model_dir: Option<String>,
    pub batch_size: usize,
    pub max_len: usize,
    /// Use the deterministic hashing embedder instead of a model.
    pub use_fake: bool,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model_dir: None, batch_size: 32, max_len: 256, use_fake: false, fake_dim: 384 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub upsert_batch_size: usize,
    pub wipe_collection: bool,
    pub lines_per_page: usize,
    pub table_mode: TableMode,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self { upsert_batch_size: 128, wipe_collection: false, lines_per_page: 80, table_mode: TableMode::Linearize }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub ready_timeout_s: u64,
    pub retry_count: u32,
    pub retry_sleep_s: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { ready_timeout_s: 120, retry_count: 15, retry_sleep_s: 2.0 }
    }
}

impl RetrySettings {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_s)
    }

    pub fn retry_sleep(&self) -> Duration {
        Duration::from_secs_f64(self.retry_sleep_s.max(0.0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub top_k: usize,
    pub prefetch_dense: usize,
    pub prefetch_bm25: usize,
    pub rrf_k: usize,
    /// Minimum cosine similarity for dense candidates. Never applied to BM25.
    pub score_threshold: Option<f32>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { top_k: 3, prefetch_dense: 30, prefetch_bm25: 30, rrf_k: 60, score_threshold: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub max_context_chars: usize,
    pub timeout_s: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".into(),
            model: "llama3:8b".into(),
            max_context_chars: 12_000,
            timeout_s: 120,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
