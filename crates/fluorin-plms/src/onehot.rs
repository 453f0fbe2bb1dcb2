//! One-hot residue encoder.
//!
//! A weight-free baseline with the same contract as the pretrained encoders.
use crate::encoder::ResidueEncoder;
use candle_core::{Device, Result, Tensor};
use fluorin_core::{aa1to_int, ALPHABET};

#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    device: Device,
}

impl OneHotEncoder {
    pub fn new(device: Device) -> Self {
        Self { device }
    }
}

impl ResidueEncoder for OneHotEncoder {
    fn name(&self) -> &str {
        "one-hot"
    }
    fn embed_dim(&self) -> usize {
        ALPHABET.len()
    }
    fn device(&self) -> &Device {
        &self.device
    }
    fn embed(&self, residues: &[char]) -> Result<Tensor> {
        let width = self.embed_dim();
        let mut data = vec![0f32; residues.len() * width];
        for (row, aa) in residues.iter().enumerate() {
            data[row * width + aa1to_int(*aa) as usize] = 1.0;
        }
        Tensor::from_vec(data, (residues.len(), width), &self.device)
    }
}
