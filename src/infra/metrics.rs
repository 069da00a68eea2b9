// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per training epoch.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: mean cross entropy over training batches
//   - bleu:       validation BLEU (0-100) from beam search
//
// Output file: checkpoints/metrics.csv
//
//   epoch,train_loss,bleu
//   1,4.812300,9.450000
//   2,4.102200,13.120000
//
// A resumed run appends to the same file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,

    /// Mean cross-entropy loss over all training batches
    pub train_loss: f64,

    /// Validation BLEU × 100
    pub bleu: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, bleu: f64) -> Self {
        Self { epoch, train_loss, bleu }
    }

    /// Ties count as improvements, so the latest of equally good
    /// epochs becomes the best checkpoint.
    pub fn is_improvement(&self, best_bleu: Option<f64>) -> bool {
        best_bleu.map_or(true, |best| self.bleu >= best)
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,bleu")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{},{:.6},{:.6}", m.epoch, m.train_loss, m.bleu)?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, bleu={:.2}",
            m.epoch,
            m.train_loss,
            m.bleu,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
