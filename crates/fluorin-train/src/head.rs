//! Light-attention regression head.
//!
//! Pools a variable-length `(L, D)` embedding into a fixed `2D` vector with a
//! learned attention distribution over residues, then regresses a scalar.
use bon::Builder;
use candle_core::{Module, ModuleT, Result, Tensor, D};
use candle_nn::{self as nn, Conv1d, Conv1dConfig, Dropout, Linear, VarBuilder};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HeadConfig {
    #[builder(default = 9)]
    #[validate(range(min = 1), custom(function = "odd_kernel"))]
    pub kernel_size: usize,
    #[builder(default = 32)]
    #[validate(range(min = 1))]
    pub hidden_dim: usize,
    #[builder(default = 0.25)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub dropout: f32,
    #[builder(default = 0.25)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub conv_dropout: f32,
}

impl Default for HeadConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn odd_kernel(kernel_size: usize) -> std::result::Result<(), ValidationError> {
    if kernel_size % 2 == 1 {
        Ok(())
    } else {
        Err(ValidationError::new("kernel_size must be odd"))
    }
}

/// Variables live under `feature_conv`, `attention_conv`, `linear` and `output`.
#[derive(Debug)]
pub struct LightAttentionHead {
    feature_conv: Conv1d,
    attention_conv: Conv1d,
    conv_dropout: Dropout,
    linear: Linear,
    dropout: Dropout,
    output: Linear,
}

impl LightAttentionHead {
    pub fn new(embed_dim: usize, config: &HeadConfig, vb: VarBuilder) -> Result<Self> {
        let HeadConfig {
            kernel_size,
            hidden_dim,
            dropout,
            conv_dropout,
        } = *config;
        if kernel_size % 2 == 0 {
            candle_core::bail!("kernel_size must be odd, got {kernel_size}")
        }
        let conv_cfg = Conv1dConfig {
            padding: kernel_size / 2,
            ..Default::default()
        };
        let feature_conv = nn::conv1d(
            embed_dim,
            embed_dim,
            kernel_size,
            conv_cfg,
            vb.pp("feature_conv"),
        )?;
        let attention_conv = nn::conv1d(
            embed_dim,
            embed_dim,
            kernel_size,
            conv_cfg,
            vb.pp("attention_conv"),
        )?;
        let linear = nn::linear(2 * embed_dim, hidden_dim, vb.pp("linear"))?;
        let output = nn::linear(hidden_dim, 1, vb.pp("output"))?;
        Ok(Self {
            feature_conv,
            attention_conv,
            conv_dropout: Dropout::new(conv_dropout),
            linear,
            dropout: Dropout::new(dropout),
            output,
        })
    }

    /// `x` is `(L, D)` or `(B, L, D)`; returns `(B,)`.
    pub fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let x = match x.rank() {
            2 => x.unsqueeze(0)?,
            3 => x.clone(),
            rank => candle_core::bail!("expected (L, D) or (B, L, D) input, got rank {rank}"),
        };
        // (B, D, L)
        let x = x.transpose(1, 2)?.contiguous()?;
        let features = self.feature_conv.forward(&x)?;
        let features = self.conv_dropout.forward(&features, train)?;
        let attention = self.attention_conv.forward(&x)?;
        let weights = nn::ops::softmax(&attention, D::Minus1)?;

        let attended = (&features * &weights)?.sum(D::Minus1)?;
        let max_pooled = features.max(D::Minus1)?;
        let pooled = Tensor::cat(&[attended, max_pooled], D::Minus1)?;

        let hidden = self.linear.forward(&pooled)?.relu()?;
        let hidden = self.dropout.forward(&hidden, train)?;
        self.output.forward(&hidden)?.squeeze(D::Minus1)
    }
}

impl ModuleT for LightAttentionHead {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        LightAttentionHead::forward_t(self, xs, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn head(embed_dim: usize) -> (VarMap, LightAttentionHead) {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let config = HeadConfig::builder().hidden_dim(8).build();
        let head = LightAttentionHead::new(embed_dim, &config, vb).unwrap();
        (varmap, head)
    }

    #[test]
    fn test_config_defaults() {
        let config = HeadConfig::default();
        assert_eq!(config.kernel_size, 9);
        assert_eq!(config.hidden_dim, 32);
        assert!(config.validate().is_ok());
        assert!(HeadConfig::builder().kernel_size(8).build().validate().is_err());
    }

    #[test]
    fn test_even_kernel_rejected_at_construction() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let config = HeadConfig::builder().kernel_size(4).build();
        assert!(LightAttentionHead::new(6, &config, vb).is_err());
    }

    #[test]
    fn test_output_shapes() -> Result<()> {
        let (_, head) = head(6);
        // shorter than the kernel still works thanks to padding
        for len in [1, 5, 23] {
            let x = Tensor::randn(0f32, 1.0, (len, 6), &Device::Cpu)?;
            assert_eq!(head.forward_t(&x, false)?.dims(), &[1]);
        }
        let batch = Tensor::randn(0f32, 1.0, (3, 11, 6), &Device::Cpu)?;
        assert_eq!(head.forward_t(&batch, true)?.dims(), &[3]);
        Ok(())
    }

    #[test]
    fn test_eval_is_deterministic() -> Result<()> {
        let (_, head) = head(4);
        let x = Tensor::randn(0f32, 1.0, (10, 4), &Device::Cpu)?;
        let a = head.forward_t(&x, false)?.to_vec1::<f32>()?;
        let b = head.forward_t(&x, false)?.to_vec1::<f32>()?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_variables_are_registered() {
        let (varmap, _) = head(4);
        let names: Vec<String> = varmap.data().lock().unwrap().keys().cloned().collect();
        for name in [
            "feature_conv.weight",
            "attention_conv.bias",
            "linear.weight",
            "output.bias",
        ] {
            assert!(names.iter().any(|n| n == name), "missing {name}");
        }
        assert_eq!(names.len(), 8);
    }
}
