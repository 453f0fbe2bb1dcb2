//! Amplify Runner
//!
//! Loads AMPLIFY weights and tokenizer and exposes the model as a [`ResidueEncoder`].
use super::amplify::AMPLIFY;
use super::config::AMPLIFYConfig;
use crate::encoder::ResidueEncoder;
use anyhow::{anyhow, Error as E, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::path::Path;
use tokenizers::Tokenizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmplifyModels {
    AMP120M,
    AMP350M,
}

impl AmplifyModels {
    pub fn get_model_files(&self) -> (&'static str, &'static str) {
        match self {
            AmplifyModels::AMP120M => ("chandar-lab/AMPLIFY_120M", "main"),
            AmplifyModels::AMP350M => ("chandar-lab/AMPLIFY_350M", "main"),
        }
    }
}

pub struct AmplifyRunner {
    model: AMPLIFY,
    tokenizer: Tokenizer,
    name: String,
    bos_token_id: u32,
    eos_token_id: u32,
    unk_token_id: u32,
}

impl AmplifyRunner {
    /// Download (or reuse the hub cache for) `config.json`, `tokenizer.json` and `model.safetensors`.
    pub fn load_model(modeltype: AmplifyModels, device: &Device) -> Result<AmplifyRunner> {
        let (model_id, revision) = modeltype.get_model_files();
        tracing::info!(model_id, revision, "fetching AMPLIFY weights");
        let repo = Repo::with_revision(model_id.to_string(), RepoType::Model, revision.to_string());
        let (config_filename, tokenizer_filename, weights_filename) = {
            let api = Api::new()?;
            let api = api.repo(repo);
            let config = api.get("config.json")?;
            let tokenizer = api.get("tokenizer.json")?;
            let weights = api.get("model.safetensors")?;
            (config, tokenizer, weights)
        };
        let mut runner =
            Self::from_files(&config_filename, &tokenizer_filename, &weights_filename, device)?;
        runner.name = model_id.to_string();
        Ok(runner)
    }

    /// Build from local files laid out like the hub repository.
    pub fn from_files(
        config_filename: &Path,
        tokenizer_filename: &Path,
        weights_filename: &Path,
        device: &Device,
    ) -> Result<AmplifyRunner> {
        let config_str = std::fs::read_to_string(config_filename)?;
        let config = AMPLIFYConfig::from_json_str(&config_str)?;
        let tokenizer = Tokenizer::from_file(tokenizer_filename).map_err(E::msg)?;
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_filename], DType::F32, device)?
        };
        let model = AMPLIFY::load(vb, &config)?;
        Self::new(model, tokenizer, weights_filename.display().to_string())
    }

    pub fn new(model: AMPLIFY, tokenizer: Tokenizer, name: String) -> Result<AmplifyRunner> {
        let special = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| anyhow!("Missing {token} token"))
        };
        let bos_token_id = special("<bos>")?;
        let eos_token_id = special("<eos>")?;
        let unk_token_id = special("<unk>")?;
        Ok(AmplifyRunner {
            model,
            tokenizer,
            name,
            bos_token_id,
            eos_token_id,
            unk_token_id,
        })
    }

    /// `<bos>`, one id per residue, `<eos>`.
    ///
    /// Residues are looked up one by one so the id count is always `residues.len() + 2`.
    pub fn token_ids(&self, residues: &[char]) -> Vec<u32> {
        let mut ids = Vec::with_capacity(residues.len() + 2);
        ids.push(self.bos_token_id);
        let mut buf = [0u8; 4];
        ids.extend(residues.iter().map(|aa| {
            self.tokenizer
                .token_to_id(aa.encode_utf8(&mut buf))
                .unwrap_or(self.unk_token_id)
        }));
        ids.push(self.eos_token_id);
        ids
    }
}

impl ResidueEncoder for AmplifyRunner {
    fn name(&self) -> &str {
        &self.name
    }
    fn embed_dim(&self) -> usize {
        self.model.config().hidden_size
    }
    fn device(&self) -> &Device {
        self.model.get_device()
    }
    fn embed(&self, residues: &[char]) -> candle_core::Result<Tensor> {
        let tokens = self.token_ids(residues);
        let token_ids = Tensor::new(&tokens[..], self.device())?.unsqueeze(0)?;
        let output = self.model.forward(&token_ids, false)?;
        // drop the batch axis and the <bos>/<eos> rows
        output
            .last_hidden_state
            .squeeze(0)?
            .narrow(0, 1, residues.len())?
            .detach()
            .contiguous()
    }
}
