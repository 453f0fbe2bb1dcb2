//! Per-epoch metrics log.
//!
//! `logs/metrics.csv` columns:
//!
//! ```text
//! epoch,elapsed_seconds,learning_rate,train_loss,eval_loss,eval_spearman
//! ```
//!
//! `eval_spearman` is left empty when the correlation is undefined.
use crate::trainer::EpochRecord;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

pub const METRICS_HEADER: &str =
    "epoch,elapsed_seconds,learning_rate,train_loss,eval_loss,eval_spearman";

pub struct TrainingLogger {
    log_file: File,
    start_time: Instant,
    last_log_time: Instant,
}

impl TrainingLogger {
    pub fn new(log_path: &Path) -> std::io::Result<Self> {
        let mut log_file = File::create(log_path)?;
        writeln!(log_file, "{METRICS_HEADER}")?;
        let now = Instant::now();
        Ok(Self {
            log_file,
            start_time: now,
            last_log_time: now,
        })
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Append one row and flush, then echo the epoch through `tracing`.
    pub fn log(&mut self, record: &EpochRecord) -> std::io::Result<()> {
        let spearman = record
            .eval_spearman
            .map(|s| format!("{s:.6}"))
            .unwrap_or_default();
        writeln!(
            self.log_file,
            "{},{:.2},{:.6e},{:.6},{:.6},{}",
            record.epoch,
            record.elapsed_seconds,
            record.learning_rate,
            record.train_loss,
            record.eval_loss,
            spearman
        )?;
        self.log_file.flush()?;

        let epoch_time = self.last_log_time.elapsed().as_secs_f32();
        tracing::info!(
            epoch = record.epoch,
            epoch_s = %format!("{epoch_time:.1}"),
            lr = record.learning_rate,
            train_loss = %format!("{:.4}", record.train_loss),
            eval_loss = %format!("{:.4}", record.eval_loss),
            eval_spearman = ?record.eval_spearman,
            "epoch finished"
        );
        self.last_log_time = Instant::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_follow_header() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("metrics.csv");
        let mut logger = TrainingLogger::new(&path)?;
        for (epoch, spearman) in [(1, Some(0.5)), (2, None)] {
            logger.log(&EpochRecord {
                epoch,
                elapsed_seconds: 1.5,
                learning_rate: 1e-3,
                train_loss: 0.25,
                eval_loss: 0.5,
                eval_spearman: spearman,
            })?;
        }
        let text = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], METRICS_HEADER);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,1.50,"));
        assert!(lines[1].ends_with(",0.250000,0.500000,0.500000"));
        assert!(lines[2].ends_with(",0.500000,"));
        assert_eq!(lines[2].split(',').count(), 6);
        Ok(())
    }
}
