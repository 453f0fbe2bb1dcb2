//! Frozen-encoder embedding extraction.
//!
//! Each sequence is normalized, truncated to `max_len` residues and embedded on
//! its own; no padding is ever introduced.
use crate::config::DataConfig;
use crate::dataset::EmbeddingDataset;
use crate::error::DataError;
use crate::loader::LabeledSequence;
use crate::splits::{SplitName, Splits};
use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use fluorin_core::{normalize, to_residue_list};
use fluorin_plms::ResidueEncoder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

const PROGRESS_EVERY: usize = 1000;

/// Embed every sequence of one split. The result has exactly one embedding per label.
pub fn extract_split(
    encoder: &dyn ResidueEncoder,
    records: &[LabeledSequence],
    max_len: usize,
) -> Result<EmbeddingDataset, DataError> {
    let start = Instant::now();
    let mut embeddings = Vec::with_capacity(records.len());
    let mut labels = Vec::with_capacity(records.len());
    for (row, record) in records.iter().enumerate() {
        let residues = to_residue_list(&normalize(&record.sequence), max_len);
        if residues.is_empty() {
            return Err(DataError::EmptySequence { row });
        }
        let embedding = encoder.embed(&residues)?;
        let found = embedding.dim(0)?;
        if found != residues.len() {
            return Err(DataError::RowCountMismatch {
                row,
                expected: residues.len(),
                found,
            });
        }
        embeddings.push(embedding);
        labels.push(record.label);
        if (row + 1) % PROGRESS_EVERY == 0 {
            tracing::info!(
                done = row + 1,
                total = records.len(),
                elapsed_s = start.elapsed().as_secs_f32(),
                "embedding"
            );
        }
    }
    tracing::debug!(
        sequences = records.len(),
        elapsed_s = start.elapsed().as_secs_f32(),
        "split embedded"
    );
    EmbeddingDataset::new(embeddings, labels)
}

pub fn extract_splits(
    encoder: &dyn ResidueEncoder,
    splits: &Splits<Vec<LabeledSequence>>,
    max_len: usize,
) -> Result<Splits<EmbeddingDataset>> {
    Splits {
        train: splits.train.as_slice(),
        validation: splits.validation.as_slice(),
        test: splits.test.as_slice(),
    }
    .try_map(|split, records| {
        tracing::info!(%split, sequences = records.len(), encoder = encoder.name(), "extracting");
        extract_split(encoder, records, max_len).with_context(|| format!("embedding {split} split"))
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CacheMeta {
    encoder: String,
    max_length: usize,
    data: DataConfig,
}

/// On-disk embeddings, one safetensors file per split plus a `meta.json` naming the
/// encoder, truncation length and dataset that produced them.
///
/// Each split file holds `embedding.{i}` tensors and a `labels` vector.
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    dir: PathBuf,
    meta: CacheMeta,
}

impl EmbeddingCache {
    pub fn new(
        dir: impl Into<PathBuf>,
        encoder: &str,
        max_length: usize,
        data: &DataConfig,
    ) -> Self {
        Self {
            dir: dir.into(),
            meta: CacheMeta {
                encoder: encoder.to_string(),
                max_length,
                data: data.clone(),
            },
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn meta_path(&self) -> PathBuf {
        self.dir.join("meta.json")
    }

    pub fn split_path(&self, split: SplitName) -> PathBuf {
        self.dir.join(format!("{split}.safetensors"))
    }

    /// `None` when the cache is absent or was written for a different encoder, length,
    /// dataset source or column pair.
    pub fn load(&self, device: &Device) -> Result<Option<Splits<EmbeddingDataset>>> {
        let Ok(raw) = std::fs::read_to_string(self.meta_path()) else {
            return Ok(None);
        };
        let Ok(stored) = serde_json::from_str::<CacheMeta>(&raw) else {
            tracing::warn!(
                dir = %self.dir.display(),
                "unreadable embedding cache metadata, re-extracting"
            );
            return Ok(None);
        };
        if stored != self.meta {
            tracing::warn!(
                dir = %self.dir.display(),
                cached = %stored.encoder,
                cached_max_length = stored.max_length,
                "embedding cache is stale, re-extracting"
            );
            return Ok(None);
        }
        let files = Splits {
            train: self.split_path(SplitName::Train),
            validation: self.split_path(SplitName::Validation),
            test: self.split_path(SplitName::Test),
        };
        if files.iter().any(|(_, path)| !path.exists()) {
            return Ok(None);
        }
        let splits = files.try_map(|_, path| Self::read_dataset(&path, device))?;
        tracing::info!(dir = %self.dir.display(), train = splits.train.len(), "loaded cached embeddings");
        Ok(Some(splits))
    }

    pub fn store(&self, splits: &Splits<EmbeddingDataset>) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        for (split, dataset) in splits.iter() {
            Self::write_dataset(dataset, &self.split_path(split))?;
        }
        // meta last, so a partially written cache never validates
        std::fs::write(self.meta_path(), serde_json::to_string_pretty(&self.meta)?)?;
        tracing::info!(dir = %self.dir.display(), "stored embeddings");
        Ok(())
    }

    fn write_dataset(dataset: &EmbeddingDataset, path: &Path) -> Result<(), DataError> {
        let mut tensors: HashMap<String, Tensor> = dataset
            .embeddings()
            .iter()
            .enumerate()
            .map(|(i, t)| -> candle_core::Result<(String, Tensor)> {
                Ok((format!("embedding.{i}"), t.to_device(&Device::Cpu)?))
            })
            .collect::<candle_core::Result<_>>()?;
        tensors.insert(
            "labels".to_string(),
            Tensor::from_slice(dataset.labels(), dataset.len(), &Device::Cpu)?,
        );
        candle_core::safetensors::save(&tensors, path)?;
        Ok(())
    }

    fn read_dataset(path: &Path, device: &Device) -> Result<EmbeddingDataset, DataError> {
        let mut tensors = candle_core::safetensors::load(path, device)?;
        let missing = |key: &str| DataError::CacheEntry {
            key: key.to_string(),
            path: path.to_path_buf(),
        };
        let labels = tensors
            .remove("labels")
            .ok_or_else(|| missing("labels"))?
            .to_vec1::<f32>()?;
        let embeddings = (0..labels.len())
            .map(|i| {
                let key = format!("embedding.{i}");
                tensors.remove(&key).ok_or_else(|| missing(&key))
            })
            .collect::<Result<Vec<_>, _>>()?;
        EmbeddingDataset::new(embeddings, labels)
    }
}
