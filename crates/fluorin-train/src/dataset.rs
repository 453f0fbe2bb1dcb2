//! Dataset adapter over precomputed embeddings.
//!
//! Embeddings are produced once by [`crate::extract`] and owned here; training and
//! evaluation only ever see borrowed [`Sample`]s.
use crate::error::DataError;
use candle_core::Tensor;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;

/// One `(embedding, label)` pair. `embedding` is `(residues, embed_dim)`.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    pub embedding: &'a Tensor,
    pub label: f32,
}

#[derive(Debug, Clone)]
pub struct EmbeddingDataset {
    embeddings: Vec<Tensor>,
    labels: Vec<f32>,
    embed_dim: usize,
}

impl EmbeddingDataset {
    /// Every embedding must be rank 2 with the same width, and there must be one label per embedding.
    pub fn new(embeddings: Vec<Tensor>, labels: Vec<f32>) -> Result<Self, DataError> {
        if embeddings.len() != labels.len() {
            return Err(DataError::LengthMismatch {
                embeddings: embeddings.len(),
                labels: labels.len(),
            });
        }
        let embed_dim = embeddings
            .first()
            .and_then(|t| t.dims().get(1).copied())
            .unwrap_or(0);
        for (index, embedding) in embeddings.iter().enumerate() {
            let dims = embedding.dims();
            if dims.len() != 2 || dims[1] != embed_dim {
                return Err(DataError::EmbedDimMismatch {
                    index,
                    expected: embed_dim,
                    found: dims.to_vec(),
                });
            }
        }
        Ok(Self {
            embeddings,
            labels,
            embed_dim,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn embed_dim(&self) -> usize {
        self.embed_dim
    }

    pub fn get(&self, index: usize) -> Option<Sample<'_>> {
        Some(Sample {
            embedding: self.embeddings.get(index)?,
            label: *self.labels.get(index)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Sample<'_>> {
        self.embeddings
            .iter()
            .zip(self.labels.iter())
            .map(|(embedding, &label)| Sample { embedding, label })
    }

    pub fn labels(&self) -> &[f32] {
        &self.labels
    }

    pub fn embeddings(&self) -> &[Tensor] {
        &self.embeddings
    }

    /// Index batches in dataset order. The last batch may be short.
    pub fn batches(&self, batch_size: usize) -> Vec<Vec<usize>> {
        Self::chunk_indices((0..self.len()).collect(), batch_size)
    }

    /// Index batches over a fresh permutation drawn from `rng`.
    pub fn shuffled_batches<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> Vec<Vec<usize>> {
        let mut indices = (0..self.len()).collect_vec();
        indices.shuffle(rng);
        Self::chunk_indices(indices, batch_size)
    }

    fn chunk_indices(indices: Vec<usize>, batch_size: usize) -> Vec<Vec<usize>> {
        indices
            .chunks(batch_size.max(1))
            .map(<[usize]>::to_vec)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn embedding(rows: usize, width: usize) -> Tensor {
        Tensor::zeros((rows, width), DType::F32, &Device::Cpu).unwrap()
    }

    #[test]
    fn test_rejects_label_mismatch() {
        let err = EmbeddingDataset::new(vec![embedding(3, 4)], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            DataError::LengthMismatch {
                embeddings: 1,
                labels: 2
            }
        ));
    }

    #[test]
    fn test_rejects_ragged_width() {
        let err = EmbeddingDataset::new(vec![embedding(3, 4), embedding(5, 3)], vec![1.0, 2.0])
            .unwrap_err();
        assert!(matches!(err, DataError::EmbedDimMismatch { index: 1, .. }));
    }

    #[test]
    fn test_indexed_access() {
        let dataset = EmbeddingDataset::new(
            vec![embedding(3, 4), embedding(7, 4), embedding(1, 4)],
            vec![0.5, 1.5, 2.5],
        )
        .unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.embed_dim(), 4);
        let sample = dataset.get(1).unwrap();
        assert_eq!(sample.label, 1.5);
        assert_eq!(sample.embedding.dims(), &[7, 4]);
        assert!(dataset.get(3).is_none());
        assert_eq!(dataset.iter().map(|s| s.label).collect_vec(), vec![0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_batches_cover_every_index_once() {
        let dataset =
            EmbeddingDataset::new((0..7).map(|_| embedding(2, 2)).collect(), vec![0.0; 7])
                .unwrap();
        assert_eq!(
            dataset.batches(3),
            vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]
        );
        let mut rng = StdRng::seed_from_u64(1);
        let shuffled = dataset.shuffled_batches(2, &mut rng);
        assert_eq!(shuffled.len(), 4);
        let flat = shuffled.into_iter().flatten().sorted().collect_vec();
        assert_eq!(flat, (0..7).collect_vec());
    }
}
