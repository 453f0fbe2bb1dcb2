use candle_core::{DType, Device, Result, Tensor, D};

/// Rotary frequency table of shape `(seq_len, head_dim / 2, 2)`; the last axis holds `(cos, sin)`.
pub fn precompute_freqs_cis(head_dim: usize, seq_len: usize, device: &Device) -> Result<Tensor> {
    let theta: f32 = 10000.0;
    let half_dim = head_dim / 2;
    let freqs: Vec<f32> = (0..half_dim)
        .map(|i| 1.0 / theta.powf((2 * i) as f32 / head_dim as f32))
        .collect();
    let freqs = Tensor::from_vec(freqs, half_dim, device)?;
    let t = Tensor::arange(0u32, seq_len as u32, device)?.to_dtype(DType::F32)?;
    // outer product: (seq_len, half_dim)
    let freqs = t.unsqueeze(1)?.matmul(&freqs.unsqueeze(0)?)?;
    Tensor::stack(&[freqs.cos()?, freqs.sin()?], D::Minus1)
}

/// Rotate query and key heads, treating adjacent pairs in the head dimension as complex numbers.
///
/// `xq`, `xk`: `(batch, seq_len, heads, head_dim)`
pub fn apply_rotary_emb(xq: &Tensor, xk: &Tensor, freqs_cis: &Tensor) -> Result<(Tensor, Tensor)> {
    let (b_sz, seq_len, h, head_dim) = xq.dims4()?;
    let half_dim = head_dim / 2;
    let freqs_cis = freqs_cis.narrow(0, 0, seq_len)?;
    let cos = freqs_cis
        .narrow(D::Minus1, 0, 1)?
        .reshape((1, seq_len, 1, half_dim))?;
    let sin = freqs_cis
        .narrow(D::Minus1, 1, 1)?
        .reshape((1, seq_len, 1, half_dim))?;

    let rotate = |x: &Tensor| -> Result<Tensor> {
        let x = x.reshape((b_sz, seq_len, h, half_dim, 2))?;
        let real = x.narrow(4, 0, 1)?.squeeze(4)?;
        let imag = x.narrow(4, 1, 1)?.squeeze(4)?;
        let out_real = (real.broadcast_mul(&cos)? - imag.broadcast_mul(&sin)?)?;
        let out_imag = (real.broadcast_mul(&sin)? + imag.broadcast_mul(&cos)?)?;
        Tensor::stack(&[out_real, out_imag], 4)?.reshape((b_sz, seq_len, h, head_dim))
    };

    Ok((rotate(xq)?, rotate(xk)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freqs_shape_and_origin() -> Result<()> {
        let freqs = precompute_freqs_cis(8, 16, &Device::Cpu)?;
        assert_eq!(freqs.dims3()?, (16, 4, 2));
        // position 0 is the identity rotation
        let first: Vec<Vec<f32>> = freqs.get(0)?.to_vec2()?;
        for pair in first {
            assert!((pair[0] - 1.0).abs() < 1e-6);
            assert!(pair[1].abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_rotation_preserves_norm() -> Result<()> {
        let device = Device::Cpu;
        let freqs = precompute_freqs_cis(4, 6, &device)?;
        let xq = Tensor::randn(0f32, 1.0, (1, 6, 2, 4), &device)?;
        let (rq, rk) = apply_rotary_emb(&xq, &xq, &freqs)?;
        assert_eq!(rq.dims4()?, (1, 6, 2, 4));
        let before = xq.sqr()?.sum_all()?.to_scalar::<f32>()?;
        let after = rq.sqr()?.sum_all()?.to_scalar::<f32>()?;
        assert!((before - after).abs() < 1e-3);
        let diff = (rq - rk)?.abs()?.sum_all()?.to_scalar::<f32>()?;
        assert!(diff < 1e-6);
        Ok(())
    }
}
