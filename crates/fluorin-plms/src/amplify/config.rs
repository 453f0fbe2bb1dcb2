use candle_nn::Activation;
use serde::Deserialize;

/// AMPLIFY hyperparameters as published in the hub `config.json`.
///
/// Keys that only matter for pretraining (init ranges, decoder) are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AMPLIFYConfig {
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    pub dropout_prob: f64,
    pub rms_norm: bool,
    pub norm_eps: f64,
    pub hidden_act: Activation,
    pub layer_norm_after_embedding: bool,
    pub layer_norm_before_last_layer: bool,
    pub vocab_size: usize,
    pub ffn_bias: bool,
    pub att_bias: bool,
    pub pad_token_id: usize,
    pub max_length: usize,
}

impl Default for AMPLIFYConfig {
    fn default() -> Self {
        Self {
            hidden_size: 960,
            num_hidden_layers: 32,
            num_attention_heads: 15,
            intermediate_size: 3840,
            dropout_prob: 0.0,
            rms_norm: true,
            norm_eps: 1e-5,
            hidden_act: Activation::Swiglu,
            layer_norm_after_embedding: false,
            layer_norm_before_last_layer: true,
            vocab_size: 27,
            ffn_bias: false,
            att_bias: false,
            pad_token_id: 0,
            max_length: 2048,
        }
    }
}

impl AMPLIFYConfig {
    pub fn amp_120m() -> Self {
        Self {
            hidden_size: 640,
            num_hidden_layers: 24,
            num_attention_heads: 10,
            intermediate_size: 2560,
            ..Self::default()
        }
    }
    pub fn amp_350m() -> Self {
        Self::default()
    }
    /// Parse a hub `config.json`. The published files spell the activation
    /// `SwiGLU`, which candle only accepts lowercased.
    pub fn from_json_str(config_str: &str) -> serde_json::Result<Self> {
        let config_str = config_str
            .replace("SwiGLU", "swiglu")
            .replace("Swiglu", "swiglu");
        serde_json::from_str(&config_str)
    }
    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }
    /// SwiGLU hidden width: 2/3 of `intermediate_size`, rounded up to a multiple of 8.
    pub fn swiglu_hidden_size(&self) -> usize {
        let multiple_of = 8;
        let intermediate_size = (self.intermediate_size * 2) / 3;
        intermediate_size.div_ceil(multiple_of) * multiple_of
    }
}
