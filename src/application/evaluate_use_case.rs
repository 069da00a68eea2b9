// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a saved checkpoint on one split of the corpus:
//
//   Step 1: Reload train_config.json and both tokenizers
//   Step 2: Rebuild the model and load the named weights
//   Step 3: Load the split (val derived exactly as in training)
//   Step 4: Decode every sentence and report mean BLEU × 100

use anyhow::Result;
use burn::data::dataloader::DataLoaderBuilder;
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::Corpus;
use crate::data::{
    batcher::TranslationBatcher,
    dataset::{encode_pairs, TranslationDataset},
    loader::ParallelCorpusLoader,
};
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::backend::{select_device, InferBackend};
use crate::ml::evaluator::{evaluate, EvalOptions};
use crate::ml::generation::DecodeStrategy;
use crate::ml::inferencer::Inferencer;
use crate::search::BeamSearchConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Overrides the data directory stored with the checkpoint
    pub data_dir:       Option<String>,
    pub checkpoint_dir: String,
    /// Weights to load, e.g. model_best or model_epoch_3
    pub checkpoint:     String,
    pub split:          String,
    pub beam_width:     usize,
    pub n_sen:          usize,
    /// Fixed decode length; default is each batch's target length
    pub max_length:     Option<usize>,
    pub greedy:         bool,
    pub cpu:            bool,
    pub verbose:        u8,
}

impl EvalConfig {
    pub fn strategy(&self) -> Result<DecodeStrategy> {
        // Placeholder length; replaced per batch by the evaluator
        let max_length = self.max_length.unwrap_or(1);
        if self.greedy {
            return Ok(DecodeStrategy::Greedy { max_length });
        }
        let cfg = BeamSearchConfig::new(self.beam_width, self.n_sen, max_length);
        cfg.validate()?;
        Ok(DecodeStrategy::Beam(cfg))
    }
}

pub struct EvaluateUseCase {
    config: EvalConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    /// Returns the BLEU score (0-100) of the split.
    pub fn execute(&self) -> Result<f64> {
        let cfg      = &self.config;
        let strategy = cfg.strategy()?;

        // ── Step 1: Saved run settings ────────────────────────────────────────
        let ckpt  = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let train = ckpt.load_config()?;
        let store = TokenizerStore::new(&cfg.checkpoint_dir);
        let src_vocab = store.load(&train.src_lang)?;
        let trg_vocab = store.load(&train.trg_lang)?;

        // ── Step 2: Model ─────────────────────────────────────────────────────
        let inferencer = Inferencer::<InferBackend>::from_checkpoint(
            &ckpt,
            &cfg.checkpoint,
            src_vocab.len(),
            trg_vocab.len(),
            select_device(cfg.cpu),
        )?;

        // ── Step 3: Split ─────────────────────────────────────────────────────
        let data_dir = cfg.data_dir.as_deref().unwrap_or(&train.data_dir);
        let loader = ParallelCorpusLoader::new(data_dir, &train.src_lang, &train.trg_lang);
        let corpus = Corpus::load(&loader, train.seed)?;
        let pairs  = corpus.split(&cfg.split)?;
        tracing::info!("Evaluating '{}' on {} pairs of split '{}'", cfg.checkpoint, pairs.len(), cfg.split);

        let samples = encode_pairs(pairs, &src_vocab, &trg_vocab, train.reverse_source)?;
        let pad = trg_vocab.special_tokens().pad;
        let data_loader = DataLoaderBuilder::new(TranslationBatcher::<InferBackend>::new(inferencer.device().clone(), pad))
            .batch_size(train.batch_size)
            .num_workers(1)
            .build(TranslationDataset::new(samples));

        // ── Step 4: Score ─────────────────────────────────────────────────────
        let options = EvalOptions {
            strategy:      &strategy,
            max_length:    cfg.max_length,
            print_example: cfg.verbose >= 1,
        };
        evaluate(inferencer.model(), &*data_loader, &trg_vocab, &options, inferencer.device())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EvalConfig {
        EvalConfig {
            data_dir:       None,
            checkpoint_dir: "checkpoints".to_string(),
            checkpoint:     "model_best".to_string(),
            split:          "test".to_string(),
            beam_width:     3,
            n_sen:          2,
            max_length:     None,
            greedy:         false,
            cpu:            true,
            verbose:        0,
        }
    }

    #[test]
    fn test_beam_strategy_from_flags() {
        let strategy = config().strategy().unwrap();
        assert_eq!(strategy, DecodeStrategy::Beam(BeamSearchConfig::new(3, 2, 1)));
    }

    #[test]
    fn test_greedy_flag_ignores_beam_settings() {
        let cfg = EvalConfig { greedy: true, n_sen: 9, max_length: Some(20), ..config() };
        assert_eq!(cfg.strategy().unwrap(), DecodeStrategy::Greedy { max_length: 20 });
    }

    #[test]
    fn test_invalid_beam_settings_are_rejected() {
        let cfg = EvalConfig { beam_width: 1, n_sen: 2, ..config() };
        assert!(cfg.strategy().is_err());
    }
}
