use anyhow::Result;
use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use fluorin_core::to_residue_list;
use fluorin_plms::{AMPLIFYConfig, AmplifyModels, AmplifyRunner, ResidueEncoder, AMPLIFY};
use std::str::FromStr;
use tokenizers::Tokenizer;

const GFP_PREFIX: &str = "MSKGEELFTGVVPILVELDGDVNGHKFSVSGEGEGDATYG";

fn tiny_tokenizer() -> Result<Tokenizer> {
    let tokens = [
        "<pad>", "<unk>", "<mask>", "<bos>", "<eos>", "|", "L", "A", "G", "E", "S", "V", "R", "K",
        "D", "T", "I", "P", "N", "F", "Q", "Y", "H", "M", "C", "W", "X",
    ];
    let vocab = tokens
        .iter()
        .enumerate()
        .map(|(i, t)| format!("\"{t}\": {i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let json = format!(
        r#"{{
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": null,
            "post_processor": null,
            "decoder": null,
            "model": {{ "type": "WordLevel", "vocab": {{ {vocab} }}, "unk_token": "<unk>" }}
        }}"#
    );
    Tokenizer::from_str(&json).map_err(anyhow::Error::msg)
}

fn tiny_runner(device: &Device) -> Result<AmplifyRunner> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    let config = AMPLIFYConfig {
        hidden_size: 16,
        num_hidden_layers: 2,
        num_attention_heads: 2,
        intermediate_size: 24,
        max_length: 128,
        ..AMPLIFYConfig::default()
    };
    let model = AMPLIFY::load(vb, &config)?;
    AmplifyRunner::new(model, tiny_tokenizer()?, "tiny-amplify".to_string())
}

#[test]
fn test_token_ids_wrap_residues() -> Result<()> {
    let runner = tiny_runner(&Device::Cpu)?;
    let ids = runner.token_ids(&['M', 'S', 'B']);
    // <bos> M S <unk> <eos>
    assert_eq!(ids, vec![3, 23, 10, 1, 4]);
    Ok(())
}

#[test]
fn test_embedding_rows_match_truncated_length() -> Result<()> {
    let runner = tiny_runner(&Device::Cpu)?;
    for max_len in [1, 7, 40, 100] {
        let residues = to_residue_list(GFP_PREFIX, max_len);
        let embedding = runner.embed(&residues)?;
        assert_eq!(embedding.dims2()?, (residues.len(), runner.embed_dim()));
    }
    Ok(())
}

#[test]
#[ignore = "downloads model weights (>100MB) from HuggingFace"]
fn test_amplify_120m_embedding() -> Result<()> {
    let device = fluorin_plms::device(false)?;
    let runner = AmplifyRunner::load_model(AmplifyModels::AMP120M, &device)?;
    let residues = to_residue_list(GFP_PREFIX, 32);
    let embedding = runner.embed(&residues)?;
    assert_eq!(embedding.dims2()?, (32, 640));
    Ok(())
}
