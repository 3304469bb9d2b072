//! Text embedding backends: a candle XLM-RoBERTa encoder and a deterministic
//! hashing embedder.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use docrag_core::config::{expand_path, EmbeddingSettings};
use docrag_core::traits::Embedder;
use docrag_core::{Error, Result};

mod device;
mod hash;
mod model;
mod pool;
mod tokenize;

pub use device::select_device;
pub use hash::HashEmbedder;
pub use model::EmbeddingModel;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch;

pub(crate) fn candle_err(e: candle_core::Error) -> Error {
    Error::Embedding(e.to_string())
}

/// Build the embedder selected by `settings`.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.use_fake {
        info!(dim = settings.fake_dim, "using hash embedder");
        return Ok(Arc::new(HashEmbedder::new(settings.fake_dim)));
    }
    let dir = resolve_model_dir(settings.model_dir.as_deref())?;
    Ok(Arc::new(EmbeddingModel::load(&dir, settings.max_len, settings.batch_size)?))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = expand_path(dir);
        if p.exists() {
            return Ok(p);
        }
        return Err(Error::Configuration(format!("embedding.model_dir {} does not exist", p.display())));
    }
    if let Ok(dir) = std::env::var("MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            return Ok(p);
        }
    }
    let local = Path::new("models/bge-m3");
    if local.exists() {
        return Ok(local.to_path_buf());
    }
    Err(Error::Configuration("could not locate an embedding model directory; set embedding.model_dir".into()))
}
