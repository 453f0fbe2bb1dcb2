//! Evaluation metrics.
//!
//! Model selection uses the Spearman rank correlation between predictions and
//! labels; the mean squared error is reported alongside as the eval loss.
use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub loss: f64,
    /// `None` when the correlation is undefined (fewer than two samples or constant input).
    pub spearman: Option<f64>,
    pub num_samples: usize,
}

impl EvalMetrics {
    pub fn from_predictions(predictions: &[f32], labels: &[f32]) -> Self {
        Self {
            loss: mse(predictions, labels),
            spearman: spearman(predictions, labels),
            num_samples: labels.len(),
        }
    }
}

pub fn mse(predictions: &[f32], labels: &[f32]) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    let sum: f64 = predictions
        .iter()
        .zip(labels)
        .map(|(p, l)| (*p as f64 - *l as f64).powi(2))
        .sum();
    sum / predictions.len() as f64
}

/// 1-based ranks; tied values share the mean of the ranks they span.
pub fn average_ranks(values: &[f32]) -> Vec<f64> {
    let order = (0..values.len())
        .sorted_by(|&a, &b| values[a].total_cmp(&values[b]))
        .collect_vec();
    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    for (_, group) in &order.iter().chunk_by(|&&idx| values[idx].to_bits()) {
        let members = group.copied().collect_vec();
        let end = start + members.len();
        // mean of ranks start+1 ..= end
        let rank = (start + 1 + end) as f64 / 2.0;
        for idx in members {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let (cov, var_a, var_b) = a
        .iter()
        .zip(b)
        .fold((0.0, 0.0, 0.0), |(cov, va, vb), (x, y)| {
            let (dx, dy) = (x - mean_a, y - mean_b);
            (cov + dx * dy, va + dx * dx, vb + dy * dy)
        });
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some(cov / (var_a.sqrt() * var_b.sqrt()))
}

/// Spearman rank correlation.
///
/// Returns `None` for mismatched lengths, fewer than two points, constant input or NaNs.
pub fn spearman(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    if a.iter().chain(b).any(|v| v.is_nan()) {
        return None;
    }
    pearson(&average_ranks(a), &average_ranks(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_monotone_relationships() {
        let x = [0.1, 0.5, 0.2, 3.0, 1.1];
        let up: Vec<f32> = x.iter().map(|v: &f32| v.exp()).collect();
        let down: Vec<f32> = x.iter().map(|v| -v * 2.0).collect();
        assert!(close(spearman(&x, &up).unwrap(), 1.0));
        assert!(close(spearman(&x, &down).unwrap(), -1.0));
    }

    #[test]
    fn test_ties_share_ranks() {
        assert_eq!(average_ranks(&[10.0, 20.0, 10.0, 30.0]), vec![1.5, 3.0, 1.5, 4.0]);
        // scipy.stats.spearmanr([1, 2, 2, 3], [1, 3, 2, 4]) == 0.9486832980505138
        let rho = spearman(&[1.0, 2.0, 2.0, 3.0], &[1.0, 3.0, 2.0, 4.0]).unwrap();
        assert!((rho - 0.948_683_298_050_513_8).abs() < 1e-9);
    }

    #[test]
    fn test_undefined_cases() {
        assert_eq!(spearman(&[1.0], &[2.0]), None);
        assert_eq!(spearman(&[1.0, 2.0], &[2.0]), None);
        assert_eq!(spearman(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
        assert_eq!(spearman(&[1.0, f32::NAN], &[1.0, 2.0]), None);
    }

    #[test]
    fn test_mse() {
        assert!(close(mse(&[1.0, 2.0], &[1.0, 4.0]), 2.0));
        assert!(close(mse(&[], &[]), 0.0));
        let metrics = EvalMetrics::from_predictions(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(metrics.num_samples, 3);
        assert!(close(metrics.loss, 0.0));
        assert!(close(metrics.spearman.unwrap(), 1.0));
    }
}
