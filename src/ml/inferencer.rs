// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds a trained model from its checkpoint directory:
//
//   train_config.json → architecture (Seq2SeqConfig)
//   {name}.mpk        → weights
//
// and decodes single, already-framed source sentences.
use anyhow::{anyhow, Result};
use burn::prelude::*;

use crate::domain::tokens::{SpecialTokens, TokenId};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::backend::InferBackend;
use crate::ml::generation::{generate, DecodeStrategy};
use crate::ml::model::Seq2SeqModel;
use crate::search::CompletedHypothesis;

pub struct Inferencer<B: Backend = InferBackend> {
    model:  Seq2SeqModel<B>,
    device: B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: Seq2SeqModel<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Vocabulary sizes come from the saved tokenizers; everything
    /// else comes from the saved training config.
    pub fn from_checkpoint(
        ckpt:           &CheckpointManager,
        name:           &str,
        src_vocab_size: usize,
        trg_vocab_size: usize,
        device:         B::Device,
    ) -> Result<Self> {
        let cfg   = ckpt.load_config()?;
        let model = cfg.model_config(src_vocab_size, trg_vocab_size).init::<B>(&device);
        let model = ckpt.load_model(model, name, &device)?;
        tracing::info!("Model '{}' loaded from '{}'", name, ckpt.dir().display());
        Ok(Self { model, device })
    }

    pub fn model(&self) -> &Seq2SeqModel<B> {
        &self.model
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Ranked hypotheses for one source sentence, `<sos> … <eos>` framed.
    pub fn translate_ids(
        &self,
        src_ids:  &[TokenId],
        strategy: &DecodeStrategy,
        special:  SpecialTokens,
    ) -> Result<Vec<CompletedHypothesis>> {
        let ids: Vec<i32> = src_ids.iter().map(|&t| t as i32).collect();
        let src = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &self.device)
            .reshape([1, ids.len()]);

        let mut ranked = generate(&self.model, src, strategy, special, &self.device)?;
        ranked.pop().ok_or_else(|| anyhow!("Decoder returned no output for the sentence"))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::infra::checkpoint::BEST_MODEL;
    use crate::search::BeamSearchConfig;
    use burn::backend::NdArray;

    #[test]
    fn test_from_checkpoint_decodes_ranked_hypotheses() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg = TrainConfig { emb_dim: 8, hidden_dim: 8, num_layers: 1, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();

        let device = Default::default();
        let model = cfg.model_config(9, 10).init::<NdArray>(&device);
        ckpt.save_model(&model, BEST_MODEL).unwrap();

        let inferencer = Inferencer::<NdArray>::from_checkpoint(&ckpt, BEST_MODEL, 9, 10, device).unwrap();
        let strategy = DecodeStrategy::Beam(BeamSearchConfig::new(3, 2, 6));
        let hyps = inferencer
            .translate_ids(&[2, 5, 4, 3], &strategy, SpecialTokens::default())
            .unwrap();

        assert_eq!(hyps.len(), 2);
        assert!(hyps[0].score >= hyps[1].score);
        assert!(hyps.iter().all(|h| h.tokens.len() <= 6));
    }

    #[test]
    fn test_missing_weights_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg = TrainConfig { emb_dim: 4, hidden_dim: 4, num_layers: 1, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        let result = Inferencer::<NdArray>::from_checkpoint(&ckpt, "model_epoch_7", 5, 5, Default::default());
        assert!(result.is_err());
    }
}
