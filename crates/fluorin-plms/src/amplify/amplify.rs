//! AMPLIFY is an optimized transformer model focused on optimizing the context of sequence models
//! while maintaining computational efficiency.
//!
//! Key features:
//! - Rotary positional embeddings
//! - RMSNorm for improved training stability
//! - SwiGLU activation function
//!
//! Only the encoder stack is built here; the masked-LM decoder is never loaded.
use super::config::AMPLIFYConfig;
use super::encoder::EncoderBlock;
use super::rotary::precompute_freqs_cis;
use candle_core::{Device, Module, Result, Tensor};
use candle_nn::{embedding, Embedding, VarBuilder};

/// The AMPLIFY model
///
/// - [GH PythonModel](https://github.com/chandar-lab/AMPLIFY/blob/rc-0.1/src/amplify/model/amplify.py)
/// - [paper](https://www.biorxiv.org/content/10.1101/2024.09.23.614603v1)
/// - [HF](https://huggingface.co/chandar-lab/AMPLIFY_120M)
///
#[derive(Debug)]
pub struct AMPLIFY {
    encoder: Embedding,
    transformer_encoder: Vec<EncoderBlock>,
    freqs_cis: Tensor,
    config: AMPLIFYConfig,
}

impl AMPLIFY {
    /// Run token ids `(batch, seq_len)` through the encoder stack.
    pub fn forward(&self, src: &Tensor, output_hidden_states: bool) -> Result<ModelOutput> {
        let seq_len = src.dim(1)?;
        if seq_len > self.config.max_length {
            candle_core::bail!(
                "sequence length {seq_len} above maximum sequence length of {}",
                self.config.max_length
            )
        }
        let mut hidden_states = vec![];
        let freqs_cis = self.freqs_cis.narrow(0, 0, seq_len)?;
        let mut x = self.encoder.forward(src)?.contiguous()?;
        for layer in self.transformer_encoder.iter() {
            x = layer.forward(&x, &freqs_cis)?;
            if output_hidden_states {
                hidden_states.push(x.clone());
            }
        }
        Ok(ModelOutput {
            last_hidden_state: x,
            hidden_states: if output_hidden_states {
                Some(hidden_states)
            } else {
                None
            },
        })
    }
    pub fn load(vb: VarBuilder, cfg: &AMPLIFYConfig) -> Result<Self> {
        let mut transformer_encoder = Vec::with_capacity(cfg.num_hidden_layers);
        for i in 0..cfg.num_hidden_layers {
            transformer_encoder.push(EncoderBlock::load(vb.pp("transformer_encoder"), cfg, i)?);
        }
        let encoder = embedding(cfg.vocab_size, cfg.hidden_size, vb.pp("encoder"))?;
        let freqs_cis = precompute_freqs_cis(cfg.head_dim(), cfg.max_length, vb.device())?;

        Ok(Self {
            encoder,
            transformer_encoder,
            freqs_cis,
            config: cfg.clone(),
        })
    }
    pub fn get_device(&self) -> &Device {
        self.freqs_cis.device()
    }
    pub fn config(&self) -> &AMPLIFYConfig {
        &self.config
    }
}

/// Amplify Model Output
///
///  last_hidden_state -> `(batch, seq_len, hidden_size)` output of the final encoder block.
///  hidden_states -> the output of every block, when requested.
#[derive(Debug)]
pub struct ModelOutput {
    pub last_hidden_state: Tensor,
    pub hidden_states: Option<Vec<Tensor>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    fn tiny_config() -> AMPLIFYConfig {
        AMPLIFYConfig {
            hidden_size: 16,
            num_hidden_layers: 2,
            num_attention_heads: 2,
            intermediate_size: 24,
            max_length: 32,
            ..AMPLIFYConfig::default()
        }
    }

    #[test]
    fn test_random_init_forward_shapes() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let config = tiny_config();
        let model = AMPLIFY::load(vb, &config)?;

        let src = Tensor::new(&[[3u32, 5, 6, 7, 8, 4]], &device)?;
        let output = model.forward(&src, true)?;
        assert_eq!(output.last_hidden_state.dims3()?, (1, 6, 16));
        assert_eq!(output.hidden_states.map(|h| h.len()), Some(2));
        Ok(())
    }

    #[test]
    fn test_rejects_overlong_input() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = AMPLIFY::load(vb, &tiny_config())?;
        let src = Tensor::zeros((1, 33), DType::U32, &device)?;
        assert!(model.forward(&src, false).is_err());
        Ok(())
    }
}
