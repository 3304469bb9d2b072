use candle_core::{DType, Tensor};
use docrag_core::{Error, Result};

use crate::candle_err;

/// Mean over unmasked tokens followed by L2 normalization: `[B,T,H] -> [B,H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let dims = hidden.dims();
    if dims.len() != 3 {
        return Err(Error::MalformedResponse(format!("encoder output shape {dims:?}, expected [B,T,H]")));
    }
    let (batch, hidden_dim) = (dims[0], dims[2]);

    let mask = attention_mask
        .to_device(hidden.device())
        .and_then(|m| m.to_dtype(hidden.dtype()))
        .map_err(candle_err)?;
    let pooled = (|| -> candle_core::Result<Tensor> {
        let mask_3d = mask.unsqueeze(2)?;
        let mask_broadcast = mask_3d.broadcast_as(hidden.shape()).or_else(|_| mask_3d.repeat((1, 1, hidden_dim)))?;
        let sum = (hidden * &mask_broadcast)?.sum(1)?;
        let lengths = mask.sum(1)?.unsqueeze(1)?.to_dtype(sum.dtype())?;
        let mean = sum.broadcast_div(&lengths)?;
        let eps_val = match hidden.dtype() { DType::F16 => 1e-6f32, _ => 1e-12f32 };
        let eps = Tensor::new(&[eps_val], hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(0)?;
        let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.broadcast_add(&eps)?;
        mean.broadcast_div(&norm)
    })()
    .map_err(candle_err)?;

    if pooled.dims() != [batch, hidden_dim].as_slice() {
        return Err(Error::MalformedResponse(format!("pooled shape {:?}", pooled.dims())));
    }
    Ok(pooled)
}
