use candle_core::{Device, Tensor};
use docrag_core::{Error, Result};
use tokenizers::Tokenizer;

use crate::candle_err;

/// XLM-RoBERTa `<pad>` token id.
pub const PAD_ID: u32 = 1;

/// Encode `texts` into `[B, max_len]` input ids and attention mask, truncating
/// or padding every sequence to `max_len`.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[&str], max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let mut ids = Vec::with_capacity(texts.len() * max_len);
    let mut mask = Vec::with_capacity(texts.len() * max_len);
    for text in texts {
        let enc = tokenizer
            .encode(*text, true)
            .map_err(|e| Error::Embedding(format!("tokenization failed: {e}")))?;
        let n = enc.get_ids().len().min(max_len);
        ids.extend_from_slice(&enc.get_ids()[..n]);
        mask.extend_from_slice(&enc.get_attention_mask()[..n]);
        ids.extend(std::iter::repeat(PAD_ID).take(max_len - n));
        mask.extend(std::iter::repeat(0).take(max_len - n));
    }
    let shape = (texts.len(), max_len);
    let input_ids = Tensor::from_vec(ids, shape, device).map_err(candle_err)?;
    let attention_mask = Tensor::from_vec(mask, shape, device).map_err(candle_err)?;
    Ok((input_ids, attention_mask))
}
