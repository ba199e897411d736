use anyhow::{ensure, Result};
use candle_core::{DType, Tensor};

/// Average the hidden states of `[B, T, H]` over positions where the mask is
/// set, then scale each of the `B` rows to unit length.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, width) = match hidden.dims() {
        &[b, _, h] => (b, h),
        other => anyhow::bail!("expected hidden states of rank 3, got {:?}", other),
    };
    let dtype = hidden.dtype();
    let device = hidden.device();

    let mask = attention_mask.to_device(device)?.to_dtype(dtype)?;
    let weights = mask.unsqueeze(2)?.broadcast_as(hidden.shape())?;
    let summed = (hidden * weights)?.sum(1)?;
    let counts = mask.sum_keepdim(1)?;
    let mean = summed.broadcast_div(&counts)?;

    let floor = if dtype == DType::F16 { 1e-6 } else { 1e-12 };
    let norms = mean.sqr()?.sum_keepdim(1)?.sqrt()?.affine(1.0, floor)?;
    let pooled = mean.broadcast_div(&norms)?;
    ensure!(pooled.dims() == [batch, width], "pooled shape {:?}, expected [{batch}, {width}]", pooled.dims());
    Ok(pooled)
}
