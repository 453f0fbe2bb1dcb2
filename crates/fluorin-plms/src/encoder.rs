//! Encoder selection and the per-residue embedding contract.
use crate::amplify::amplify_runner::{AmplifyModels, AmplifyRunner};
use crate::onehot::OneHotEncoder;
use candle_core::{Device, Result, Tensor};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A frozen model mapping a residue list to a `(residues.len(), embed_dim)` `F32` tensor.
///
/// Special tokens the model adds internally are trimmed before returning, so row `i`
/// always corresponds to `residues[i]`.
pub trait ResidueEncoder {
    fn name(&self) -> &str;
    fn embed_dim(&self) -> usize;
    fn device(&self) -> &Device;
    fn embed(&self, residues: &[char]) -> Result<Tensor>;
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
pub enum EncoderKind {
    #[strum(serialize = "amplify-120m")]
    #[serde(rename = "amplify-120m")]
    #[value(name = "amplify-120m")]
    Amplify120M,
    #[strum(serialize = "amplify-350m")]
    #[serde(rename = "amplify-350m")]
    #[value(name = "amplify-350m")]
    Amplify350M,
    #[strum(serialize = "one-hot")]
    #[serde(rename = "one-hot")]
    #[value(name = "one-hot")]
    OneHot,
}

impl EncoderKind {
    pub fn load(&self, device: &Device) -> anyhow::Result<Box<dyn ResidueEncoder>> {
        let encoder: Box<dyn ResidueEncoder> = match self {
            EncoderKind::Amplify120M => {
                Box::new(AmplifyRunner::load_model(AmplifyModels::AMP120M, device)?)
            }
            EncoderKind::Amplify350M => {
                Box::new(AmplifyRunner::load_model(AmplifyModels::AMP350M, device)?)
            }
            EncoderKind::OneHot => Box::new(OneHotEncoder::new(device.clone())),
        };
        tracing::info!(encoder = encoder.name(), embed_dim = encoder.embed_dim(), "encoder ready");
        Ok(encoder)
    }
}
