//! Training loop for the regression head.
//!
//! The encoder is never part of the graph: embeddings arrive precomputed, so the
//! only trainable variables are the head's, held in one [`VarMap`].
use crate::config::{RunPaths, TrainingArgs};
use crate::dataset::EmbeddingDataset;
use crate::head::{HeadConfig, LightAttentionHead};
use crate::logger::TrainingLogger;
use crate::metrics::EvalMetrics;
use crate::splits::Splits;
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{loss, AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metrics of one finished epoch, as written to `metrics.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub elapsed_seconds: f64,
    pub learning_rate: f64,
    pub train_loss: f64,
    pub eval_loss: f64,
    pub eval_spearman: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub started_at: String,
    pub finished_at: String,
    pub best_epoch: usize,
    pub best_checkpoint: PathBuf,
    pub epochs: Vec<EpochRecord>,
    pub validation: EvalMetrics,
    pub test: EvalMetrics,
}

impl TrainingReport {
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// The epoch with the highest validation Spearman. An undefined correlation ranks
/// below every defined one and ties go to the earlier epoch.
pub fn select_best(records: &[EpochRecord]) -> Option<&EpochRecord> {
    records.iter().fold(None, |best, record| match best {
        Some(current) if !improves(record.eval_spearman, current.eval_spearman) => Some(current),
        _ => Some(record),
    })
}

fn improves(candidate: Option<f64>, current: Option<f64>) -> bool {
    candidate.unwrap_or(f64::NEG_INFINITY) > current.unwrap_or(f64::NEG_INFINITY)
}

/// Linear decay to zero over `total_steps`, after an optional linear warmup.
#[derive(Debug, Clone, Copy)]
pub struct LinearSchedule {
    base_lr: f64,
    warmup_steps: usize,
    total_steps: usize,
}

impl LinearSchedule {
    pub fn new(base_lr: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self {
            base_lr,
            warmup_steps,
            total_steps,
        }
    }

    pub fn at(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            return self.base_lr * step as f64 / self.warmup_steps as f64;
        }
        let remaining = self.total_steps.saturating_sub(step) as f64;
        let span = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;
        self.base_lr * (remaining / span).max(0.0)
    }
}

pub struct Trainer {
    head: LightAttentionHead,
    varmap: VarMap,
    args: TrainingArgs,
    paths: RunPaths,
}

impl Trainer {
    pub fn new(
        head: LightAttentionHead,
        varmap: VarMap,
        args: TrainingArgs,
        paths: RunPaths,
    ) -> Self {
        Self {
            head,
            varmap,
            args,
            paths,
        }
    }

    /// Fresh head with randomly initialized weights on `device`.
    pub fn init(
        embed_dim: usize,
        head_config: &HeadConfig,
        args: TrainingArgs,
        paths: RunPaths,
        device: &Device,
    ) -> candle_core::Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let head = LightAttentionHead::new(embed_dim, head_config, vb)?;
        Ok(Self::new(head, varmap, args, paths))
    }

    /// Head restored from a `model.safetensors` written by [`Trainer::train`].
    pub fn from_checkpoint(
        checkpoint: &Path,
        embed_dim: usize,
        head_config: &HeadConfig,
        args: TrainingArgs,
        paths: RunPaths,
        device: &Device,
    ) -> candle_core::Result<Self> {
        let mut trainer = Self::init(embed_dim, head_config, args, paths, device)?;
        trainer.varmap.load(checkpoint)?;
        Ok(trainer)
    }

    pub fn predict(&self, dataset: &EmbeddingDataset) -> candle_core::Result<Vec<f32>> {
        dataset
            .iter()
            .map(|sample| {
                let prediction = self.head.forward_t(sample.embedding, false)?;
                prediction.to_dtype(DType::F32)?.to_vec1::<f32>().map(|v| v[0])
            })
            .collect()
    }

    pub fn evaluate(&self, dataset: &EmbeddingDataset) -> candle_core::Result<EvalMetrics> {
        let predictions = self.predict(dataset)?;
        Ok(EvalMetrics::from_predictions(&predictions, dataset.labels()))
    }

    /// Mean squared error of the samples at `indices`, kept in the graph.
    fn batch_loss(&self, dataset: &EmbeddingDataset, indices: &[usize]) -> candle_core::Result<Tensor> {
        let losses = indices
            .iter()
            .filter_map(|&i| dataset.get(i))
            .map(|sample| {
                let prediction = self.head.forward_t(sample.embedding, true)?;
                let target = Tensor::new(&[sample.label], prediction.device())?;
                loss::mse(&prediction, &target)
            })
            .collect::<candle_core::Result<Vec<_>>>()?;
        Tensor::stack(&losses, 0)?.mean_all()
    }

    fn save_checkpoint(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.varmap
            .save(path)
            .with_context(|| format!("saving checkpoint {}", path.display()))
    }

    /// Drop the oldest epoch checkpoints beyond `save_total_limit`, skipping `best`.
    fn rotate_checkpoints(&self, saved: &mut Vec<usize>, best: usize) -> Result<()> {
        let Some(limit) = self.args.save_total_limit else {
            return Ok(());
        };
        while saved.len() > limit.max(1) {
            let Some(position) = saved.iter().position(|&epoch| epoch != best) else {
                break;
            };
            let epoch = saved.remove(position);
            if let Some(dir) = self.paths.epoch_checkpoint(epoch).parent() {
                tracing::debug!(epoch, dir = %dir.display(), "removing checkpoint");
                std::fs::remove_dir_all(dir)?;
            }
        }
        Ok(())
    }

    /// Load the selected epoch's weights back into the varmap and copy them to
    /// `checkpoints/best/model.safetensors`. Returns the selected epoch.
    fn restore_best(&mut self, records: &[EpochRecord]) -> Result<usize> {
        let best = select_best(records)
            .map(|r| r.epoch)
            .context("no epochs were run")?;
        let best_path = self.paths.epoch_checkpoint(best);
        self.varmap
            .load(&best_path)
            .with_context(|| format!("reloading best checkpoint {}", best_path.display()))?;
        let best_checkpoint = self.paths.best_checkpoint();
        if let Some(parent) = best_checkpoint.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&best_path, &best_checkpoint)?;
        tracing::info!(
            best_epoch = best,
            checkpoint = %best_checkpoint.display(),
            "loaded best checkpoint"
        );
        Ok(best)
    }

    /// Fit on `train`, select on `validation`, report on `test`.
    ///
    /// On return the varmap holds the best epoch's weights, which are also copied to
    /// `checkpoints/best/model.safetensors`.
    pub fn train(&mut self, splits: &Splits<EmbeddingDataset>) -> Result<TrainingReport> {
        let started_at = Utc::now().to_rfc3339();
        self.paths.create()?;
        let mut logger = TrainingLogger::new(&self.paths.metrics_csv())?;

        let args = self.args.clone();
        let batch_size = args.batch_size.max(1);
        let logging_steps = args.logging_steps.max(1);
        let steps_per_epoch = splits.train.len().div_ceil(batch_size);
        let schedule = LinearSchedule::new(
            args.learning_rate,
            args.warmup_steps,
            steps_per_epoch * args.num_epochs,
        );
        let params = ParamsAdamW {
            lr: schedule.at(0),
            weight_decay: args.weight_decay,
            ..Default::default()
        };
        let mut optimizer = AdamW::new(self.varmap.all_vars(), params)?;
        let mut rng = StdRng::seed_from_u64(args.seed);

        tracing::info!(
            train = splits.train.len(),
            validation = splits.validation.len(),
            epochs = args.num_epochs,
            steps_per_epoch,
            "starting training"
        );

        let mut records: Vec<EpochRecord> = Vec::with_capacity(args.num_epochs);
        let mut saved: Vec<usize> = Vec::new();
        let mut best_epoch = 1;
        let mut step = 0;
        for epoch in 1..=args.num_epochs {
            let mut running_loss = 0.0;
            let batches = splits.train.shuffled_batches(batch_size, &mut rng);
            for batch in &batches {
                optimizer.set_learning_rate(schedule.at(step));
                let loss = self.batch_loss(&splits.train, batch)?;
                optimizer.backward_step(&loss)?;
                let loss = loss.to_scalar::<f32>()? as f64;
                running_loss += loss;
                step += 1;
                if step % logging_steps == 0 {
                    tracing::info!(epoch, step, loss, lr = optimizer.learning_rate(), "train");
                }
            }

            let eval = self.evaluate(&splits.validation)?;
            self.save_checkpoint(&self.paths.epoch_checkpoint(epoch))?;
            saved.push(epoch);

            let record = EpochRecord {
                epoch,
                elapsed_seconds: logger.elapsed_seconds(),
                learning_rate: optimizer.learning_rate(),
                train_loss: running_loss / batches.len().max(1) as f64,
                eval_loss: eval.loss,
                eval_spearman: eval.spearman,
            };
            logger.log(&record)?;
            if let Some(current) = records.iter().find(|r| r.epoch == best_epoch) {
                if improves(record.eval_spearman, current.eval_spearman) {
                    best_epoch = epoch;
                }
            }
            records.push(record);
            self.rotate_checkpoints(&mut saved, best_epoch)?;
        }

        let best = self.restore_best(&records)?;
        debug_assert_eq!(best, best_epoch);
        let best_checkpoint = self.paths.best_checkpoint();

        let validation = self.evaluate(&splits.validation)?;
        let test = self.evaluate(&splits.test)?;
        tracing::info!(
            loss = test.loss,
            spearman = ?test.spearman,
            samples = test.num_samples,
            "test metrics"
        );

        let report = TrainingReport {
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            best_epoch: best,
            best_checkpoint,
            epochs: records,
            validation,
            test,
        };
        report.save(&self.paths.report_json())?;
        Ok(report)
    }
}
