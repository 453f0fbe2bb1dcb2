use super::config::AMPLIFYConfig;
use super::rotary::apply_rotary_emb;
use candle_core::{Module, Result, Tensor, D};
use candle_nn::{linear_b, ops::softmax_last_dim, rms_norm, Linear, RmsNorm, VarBuilder};

/// Amplify EncoderBlock
///
/// Pre-norm attention with rotary embeddings followed by a SwiGLU feed forward block.
///
/// - [T5](https://github.com/huggingface/candle/blob/e2b6b367fa852ed30ac532f8d77cd8479c7ed092/candle-transformers/src/models/t5.rs#L331)
/// - [SwiGLu Implementation](https://github.com/facebookresearch/xformers/blob/main/xformers/ops/swiglu_op.py#L462)
#[derive(Debug)]
pub struct EncoderBlock {
    q: Linear,
    k: Linear,
    v: Linear,
    wo: Linear,
    w12: Linear,
    w3: Linear,
    attention_norm: RmsNorm,
    ffn_norm: RmsNorm,
    num_heads: usize,
    d_head: usize,
}

impl EncoderBlock {
    pub fn load(vb: VarBuilder, config: &AMPLIFYConfig, layer: usize) -> Result<Self> {
        let hidden = config.hidden_size;
        let intermediate_size = config.swiglu_hidden_size();
        let vb = vb.pp(layer);
        let q = linear_b(hidden, hidden, config.att_bias, vb.pp("q"))?;
        let k = linear_b(hidden, hidden, config.att_bias, vb.pp("k"))?;
        let v = linear_b(hidden, hidden, config.att_bias, vb.pp("v"))?;
        let wo = linear_b(hidden, hidden, config.att_bias, vb.pp("wo"))?;
        let w12 = linear_b(
            hidden,
            intermediate_size * 2,
            config.ffn_bias,
            vb.pp("ffn.w12"),
        )?;
        let w3 = linear_b(intermediate_size, hidden, config.ffn_bias, vb.pp("ffn.w3"))?;
        let attention_norm = rms_norm(hidden, config.norm_eps, vb.pp("attention_norm"))?;
        let ffn_norm = rms_norm(hidden, config.norm_eps, vb.pp("ffn_norm"))?;

        Ok(Self {
            q,
            k,
            v,
            wo,
            w12,
            w3,
            attention_norm,
            ffn_norm,
            num_heads: config.num_attention_heads,
            d_head: config.head_dim(),
        })
    }

    pub fn forward(&self, x: &Tensor, freqs_cis: &Tensor) -> Result<Tensor> {
        let normed = self.attention_norm.forward(x)?;
        let x = x.add(&self.attention_block(&normed, freqs_cis)?)?;
        let normed = self.ffn_norm.forward(&x)?;
        x.add(&self.ffn_forward(&normed)?)
    }

    // silu(x1) * x2 over the packed w12 projection
    fn ffn_forward(&self, x: &Tensor) -> Result<Tensor> {
        let w12_out = self.w12.forward(x)?;
        let chunks = w12_out.chunk(2, D::Minus1)?;
        let hidden = chunks[0].silu()?.mul(&chunks[1])?.contiguous()?;
        self.w3.forward(&hidden)
    }

    fn attention_block(&self, x: &Tensor, freqs_cis: &Tensor) -> Result<Tensor> {
        let (batch_size, seq_len, _) = x.dims3()?;
        let shape = (batch_size, seq_len, self.num_heads, self.d_head);
        let xq = self.q.forward(x)?.reshape(shape)?;
        let xk = self.k.forward(x)?.reshape(shape)?;
        let xv = self.v.forward(x)?.reshape(shape)?;
        let (xq, xk) = apply_rotary_emb(&xq, &xk, freqs_cis)?;

        // `[batch, seq_len, heads, head_dim]` -> `[batch, heads, seq_len, head_dim]`
        let q = xq.transpose(1, 2)?.contiguous()?;
        let k = xk.transpose(1, 2)?.contiguous()?;
        let v = xv.transpose(1, 2)?.contiguous()?;

        let scaling = 1.0 / (self.d_head as f64).sqrt();
        let scores = (q.matmul(&k.t()?.contiguous()?)? * scaling)?;
        let attn = softmax_last_dim(&scores)?.matmul(&v)?;

        let attn = attn
            .transpose(1, 2)?
            .reshape((batch_size, seq_len, self.num_heads * self.d_head))?;
        self.wo.forward(&attn)
    }
}
