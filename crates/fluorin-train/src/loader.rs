//! Labeled sequence loading.
//!
//! Splits come either from a Hugging Face dataset repository or from local
//! files. Each file holds one split with a sequence column (`primary`) and a
//! label column (`log_fluorescence`). A label column stored as one-element
//! lists is flattened to scalars.
use crate::config::DataConfig;
use crate::error::DataError;
use crate::splits::Splits;
use anyhow::{Context, Result};
use hf_hub::{api::sync::Api, Repo, RepoType};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

pub const DEFAULT_HUB_DATASET: &str = "proteinea/fluorescence";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSequence {
    pub sequence: String,
    pub label: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DatasetSource {
    /// Files inside a hub dataset repository.
    Hub {
        repo: String,
        revision: String,
        files: Splits<String>,
    },
    Local { files: Splits<PathBuf> },
}

impl Default for DatasetSource {
    fn default() -> Self {
        DatasetSource::hub(DEFAULT_HUB_DATASET)
    }
}

impl DatasetSource {
    /// `train`, `valid` and `test` files in `dir`, preferring `.parquet` over `.csv`.
    pub fn local_dir(dir: &Path) -> Self {
        let pick = |stem: &str| {
            let parquet = dir.join(format!("{stem}.parquet"));
            if parquet.exists() {
                parquet
            } else {
                dir.join(format!("{stem}.csv"))
            }
        };
        DatasetSource::Local {
            files: Splits {
                train: pick("train"),
                validation: pick("valid"),
                test: pick("test"),
            },
        }
    }

    /// `repo` at `main` with the default split file names.
    pub fn hub(repo: &str) -> Self {
        DatasetSource::Hub {
            repo: repo.to_string(),
            revision: "main".to_string(),
            files: Splits {
                train: "train.csv".to_string(),
                validation: "valid.csv".to_string(),
                test: "test.csv".to_string(),
            },
        }
    }

    /// Resolve every split to a local path, downloading from the hub if needed.
    pub fn fetch(&self) -> Result<Splits<PathBuf>> {
        match self {
            DatasetSource::Local { files } => Ok(files.clone()),
            DatasetSource::Hub {
                repo,
                revision,
                files,
            } => {
                tracing::info!(%repo, %revision, "fetching dataset splits");
                let api = Api::new()?;
                let api = api.repo(Repo::with_revision(
                    repo.clone(),
                    RepoType::Dataset,
                    revision.clone(),
                ));
                files.clone().try_map(|split, file| {
                    api.get(&file)
                        .with_context(|| format!("downloading {split} split `{file}` from {repo}"))
                })
            }
        }
    }
}

/// Load all three splits described by `config`.
pub fn load_splits(config: &DataConfig) -> Result<Splits<Vec<LabeledSequence>>> {
    let paths = config.source.fetch()?;
    paths.try_map(|split, path| {
        let records = read_split(&path, &config.sequence_column, &config.label_column)
            .with_context(|| format!("reading {split} split from {}", path.display()))?;
        tracing::info!(%split, rows = records.len(), "loaded split");
        Ok(records)
    })
}

fn read_frame(path: &Path) -> Result<DataFrame, DataError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => Ok(CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?),
        Some("parquet") => {
            let file = File::open(path).map_err(PolarsError::from)?;
            Ok(ParquetReader::new(file).finish()?)
        }
        _ => Err(DataError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Read one split file into `(sequence, label)` records.
pub fn read_split(
    path: &Path,
    sequence_column: &str,
    label_column: &str,
) -> Result<Vec<LabeledSequence>, DataError> {
    let df = read_frame(path)?;
    let column = |name: &str| {
        df.column(name)
            .map(|c| c.as_materialized_series().clone())
            .map_err(|_| DataError::MissingColumn {
                column: name.to_string(),
                path: path.to_path_buf(),
            })
    };
    let sequences = column(sequence_column)?;
    let labels = column(label_column)?;
    let labels = if matches!(labels.dtype(), DataType::List(_)) {
        labels.list()?.get_inner()
    } else {
        labels
    };
    let labels = labels.cast(&DataType::Float32)?;
    if labels.len() != sequences.len() {
        return Err(DataError::LabelShape {
            path: path.to_path_buf(),
            sequences: sequences.len(),
            labels: labels.len(),
        });
    }

    let null = |column: &str, row: usize| DataError::NullValue {
        column: column.to_string(),
        row,
        path: path.to_path_buf(),
    };
    let records = sequences
        .str()?
        .into_iter()
        .zip(labels.f32()?.into_iter())
        .enumerate()
        .map(|(row, (sequence, label))| {
            Ok(LabeledSequence {
                sequence: sequence.ok_or_else(|| null(sequence_column, row))?.to_string(),
                label: label.ok_or_else(|| null(label_column, row))?,
            })
        })
        .collect::<Result<Vec<_>, DataError>>()?;

    if records.is_empty() {
        return Err(DataError::EmptySplit(path.to_path_buf()));
    }
    Ok(records)
}
