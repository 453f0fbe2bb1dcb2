use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures in the data plumbing between the dataset files and the trainer.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("column `{column}` not found in {}", .path.display())]
    MissingColumn { column: String, path: PathBuf },
    #[error("null `{column}` at row {row} in {}", .path.display())]
    NullValue {
        column: String,
        row: usize,
        path: PathBuf,
    },
    #[error("{} has {sequences} sequences but {labels} labels", .path.display())]
    LabelShape {
        path: PathBuf,
        sequences: usize,
        labels: usize,
    },
    #[error("{embeddings} embeddings but {labels} labels")]
    LengthMismatch { embeddings: usize, labels: usize },
    #[error("embedding {index} has shape {found:?}, expected (_, {expected})")]
    EmbedDimMismatch {
        index: usize,
        expected: usize,
        found: Vec<usize>,
    },
    #[error("sequence {row} produced {found} embedding rows, expected {expected}")]
    RowCountMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("sequence {row} is empty")]
    EmptySequence { row: usize },
    #[error("unsupported dataset file {}, expected .csv or .parquet", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("split file {} has no rows", .0.display())]
    EmptySplit(PathBuf),
    #[error("embedding cache {} is missing `{key}`", .path.display())]
    CacheEntry { key: String, path: PathBuf },
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Candle(#[from] candle_core::Error),
}
