// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder,
// plus the JSON files needed to rebuild and resume a run.
//
// File layout:
//   checkpoints/
//     model_epoch_{n}.*     ← weights after epoch n
//     model_best.*          ← weights of the best validation BLEU
//     model_final.*         ← weights when training finished
//     optim_epoch_{n}.*     ← optimizer state after epoch n
//     history.json          ← epochs done, losses, scores, best
//     train_config.json     ← hyperparameters (rebuilds the model)
//     tokenizer.{lang}.json ← written by the TokenizerStore
//
// The recorder picks the file extension itself, so weights are
// always addressed by name without one.
//
// A resumed run restores model_epoch_{n} and optim_epoch_{n} for
// the last finished epoch, so Adam keeps its moment estimates.

use anyhow::{Context, Result};
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::infra::metrics::EpochMetrics;
use crate::ml::model::Seq2SeqModel;

pub const BEST_MODEL: &str = "model_best";
pub const FINAL_MODEL: &str = "model_final";

pub fn epoch_model(epoch: usize) -> String {
    format!("model_epoch_{epoch}")
}

pub fn epoch_optimizer(epoch: usize) -> String {
    format!("optim_epoch_{epoch}")
}

// ─── TrainingHistory ──────────────────────────────────────────────────────────
/// Everything needed to continue a run where it stopped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Epochs completed so far
    pub epoch:      usize,
    pub losses:     Vec<f64>,
    pub scores:     Vec<f64>,
    pub best_epoch: Option<usize>,
    pub best_score: Option<f64>,
}

impl TrainingHistory {
    /// Record a finished epoch. Returns true when it is the new best.
    pub fn record(&mut self, m: &EpochMetrics) -> bool {
        self.epoch = m.epoch;
        self.losses.push(m.train_loss);
        self.scores.push(m.bleu);

        let improved = m.is_improvement(self.best_score);
        if improved {
            self.best_epoch = Some(m.epoch);
            self.best_score = Some(m.bleu);
        }
        improved
    }
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Save model weights as `{dir}/{name}`.
    pub fn save_model<B: Backend>(&self, model: &Seq2SeqModel<B>, name: &str) -> Result<()> {
        let path = self.dir.join(name);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint '{}'", name);
        Ok(())
    }

    /// Load the weights saved under `name` into `model`.
    ///
    /// The model must have the architecture the weights were saved
    /// with, which is why the training config is stored too.
    pub fn load_model<B: Backend>(
        &self,
        model:  Seq2SeqModel<B>,
        name:   &str,
        device: &B::Device,
    ) -> Result<Seq2SeqModel<B>> {
        let path = self.dir.join(name);
        tracing::info!("Loading checkpoint '{}'", path.display());

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display()
                )
            })?;
        Ok(model.load_record(record))
    }

    /// Save the optimizer state (e.g. Adam moments) as `{dir}/{name}`.
    pub fn save_optimizer<B, M, O>(&self, optim: &O, name: &str) -> Result<()>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let path = self.dir.join(name);
        let recorder = CompactRecorder::new();
        Recorder::<B>::record(&recorder, optim.to_record(), path.clone())
            .with_context(|| format!("Failed to save optimizer state to '{}'", path.display()))?;

        tracing::debug!("Saved optimizer state '{}'", name);
        Ok(())
    }

    pub fn load_optimizer<B, M, O>(&self, optim: O, name: &str, device: &B::Device) -> Result<O>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let path = self.dir.join(name);
        tracing::info!("Loading optimizer state '{}'", path.display());

        let recorder = CompactRecorder::new();
        let record = Recorder::<B>::load(&recorder, path.clone(), device)
            .with_context(|| format!("Cannot load optimizer state '{}'", path.display()))?;
        Ok(optim.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' first.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    pub fn save_history(&self, history: &TrainingHistory) -> Result<()> {
        let path = self.dir.join("history.json");
        fs::write(&path, serde_json::to_string_pretty(history)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        Ok(())
    }

    /// `Ok(None)` when no run has finished an epoch here yet.
    pub fn load_history(&self) -> Result<Option<TrainingHistory>> {
        let path = self.dir.join("history.json");
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        let history = serde_json::from_str(&json)
            .with_context(|| format!("Malformed history '{}'", path.display()))?;
        Ok(Some(history))
    }
}
