// ============================================================
// Layer 2 — TranslateUseCase
// ============================================================
// One sentence in, ranked translations out:
//
//   clean → tokenize → (reverse) → <sos> … <eos>
//         → beam search / greedy → detokenize
//
// The source goes through exactly the preprocessing the model
// was trained with; reverse_source is read from the saved config.

use anyhow::Result;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{dataset::frame, preprocessor::Preprocessor};
use crate::domain::traits::Translator;
use crate::infra::{
    checkpoint::CheckpointManager,
    tokenizer_store::{TokenizerStore, Vocabulary},
};
use crate::ml::backend::{select_device, InferBackend};
use crate::ml::generation::DecodeStrategy;
use crate::ml::inferencer::Inferencer;
use crate::search::{BeamSearchConfig, LengthNormalization};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    pub checkpoint_dir: String,
    pub checkpoint:     String,
    pub beam_width:     usize,
    pub n_sen:          usize,
    pub max_length:     usize,
    /// GNMT length penalty alpha; raw scores when absent
    pub length_penalty: Option<f32>,
    pub greedy:         bool,
    pub cpu:            bool,
}

impl TranslateConfig {
    pub fn strategy(&self) -> Result<DecodeStrategy> {
        if self.greedy {
            return Ok(DecodeStrategy::Greedy { max_length: self.max_length });
        }
        let norm = self
            .length_penalty
            .map_or(LengthNormalization::None, |alpha| LengthNormalization::Gnmt { alpha });
        let cfg = BeamSearchConfig::new(self.beam_width, self.n_sen, self.max_length)
            .with_length_normalization(norm);
        cfg.validate()?;
        Ok(DecodeStrategy::Beam(cfg))
    }
}

pub struct TranslateUseCase<B: Backend = InferBackend> {
    src_vocab:      Vocabulary,
    trg_vocab:      Vocabulary,
    preprocessor:   Preprocessor,
    reverse_source: bool,
    strategy:       DecodeStrategy,
    inferencer:     Inferencer<B>,
}

impl TranslateUseCase<InferBackend> {
    pub fn new(config: &TranslateConfig) -> Result<Self> {
        let strategy = config.strategy()?;
        let ckpt  = CheckpointManager::new(&config.checkpoint_dir)?;
        let train = ckpt.load_config()?;
        let store = TokenizerStore::new(&config.checkpoint_dir);
        let src_vocab = store.load(&train.src_lang)?;
        let trg_vocab = store.load(&train.trg_lang)?;

        let inferencer = Inferencer::from_checkpoint(
            &ckpt,
            &config.checkpoint,
            src_vocab.len(),
            trg_vocab.len(),
            select_device(config.cpu),
        )?;
        Ok(Self::from_parts(src_vocab, trg_vocab, train.reverse_source, strategy, inferencer))
    }
}

impl<B: Backend> TranslateUseCase<B> {
    pub fn from_parts(
        src_vocab:      Vocabulary,
        trg_vocab:      Vocabulary,
        reverse_source: bool,
        strategy:       DecodeStrategy,
        inferencer:     Inferencer<B>,
    ) -> Self {
        Self {
            src_vocab,
            trg_vocab,
            preprocessor: Preprocessor::new(),
            reverse_source,
            strategy,
            inferencer,
        }
    }

    /// Framed source ids exactly as the model saw them in training
    pub fn source_ids(&self, sentence: &str) -> Result<Vec<u32>> {
        let mut ids = self.src_vocab.encode(&self.preprocessor.clean(sentence))?;
        if self.reverse_source {
            ids.reverse();
        }
        Ok(frame(ids, self.src_vocab.special_tokens()))
    }
}

impl<B: Backend> Translator for TranslateUseCase<B> {
    fn translate(&self, sentence: &str) -> Result<Vec<(String, f32)>> {
        let src = self.source_ids(sentence)?;
        tracing::debug!("Source ids: {:?}", src);

        let hyps = self
            .inferencer
            .translate_ids(&src, &self.strategy, self.trg_vocab.special_tokens())?;
        Ok(hyps
            .iter()
            .map(|h| (self.trg_vocab.decode(&h.tokens), h.score))
            .collect())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{RnnType, Seq2SeqConfig};
    use burn::backend::NdArray;

    fn config() -> TranslateConfig {
        TranslateConfig {
            checkpoint_dir: "checkpoints".to_string(),
            checkpoint:     "model_best".to_string(),
            beam_width:     4,
            n_sen:          3,
            max_length:     8,
            length_penalty: None,
            greedy:         false,
            cpu:            true,
        }
    }

    fn use_case(dir: &std::path::Path, reverse_source: bool) -> TranslateUseCase<NdArray> {
        let store = TokenizerStore::new(dir);
        let de = store.load_or_build("de", &["ein hund läuft .", "eine katze schläft ."], 1).unwrap();
        let en = store.load_or_build("en", &["a dog runs .", "a cat sleeps ."], 1).unwrap();

        let device = Default::default();
        let model = Seq2SeqConfig::new(de.len(), en.len(), 8, 8, 1, RnnType::Gru).init::<NdArray>(&device);
        let strategy = config().strategy().unwrap();
        TranslateUseCase::from_parts(de, en, reverse_source, strategy, Inferencer::new(model, device))
    }

    #[test]
    fn test_length_penalty_selects_gnmt() {
        let cfg = TranslateConfig { length_penalty: Some(0.6), ..config() };
        match cfg.strategy().unwrap() {
            DecodeStrategy::Beam(beam) => {
                assert_eq!(beam.length_normalization, LengthNormalization::Gnmt { alpha: 0.6 })
            }
            other => panic!("expected beam search, got {other:?}"),
        }
    }

    #[test]
    fn test_source_is_cleaned_reversed_and_framed() {
        let dir = tempfile::tempdir().unwrap();
        let forward = use_case(dir.path(), false);
        let ids = forward.source_ids("  Ein   Hund ").unwrap();
        let words = forward.src_vocab.decode_words(&ids);
        assert_eq!(ids.first(), Some(&2));
        assert_eq!(ids.last(), Some(&3));
        assert_eq!(words, vec!["ein", "hund"]);

        let reversed = use_case(dir.path(), true);
        let ids = reversed.source_ids("Ein Hund").unwrap();
        assert_eq!(reversed.src_vocab.decode_words(&ids), vec!["hund", "ein"]);
    }

    #[test]
    fn test_translate_returns_n_sen_ranked_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let translator = use_case(dir.path(), true);
        let out = translator.translate("Ein Hund läuft.").unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.windows(2).all(|w| w[0].1 >= w[1].1));
        for (text, _) in &out {
            assert!(!text.contains("<sos>"));
            assert!(!text.contains("<eos>"));
        }
    }
}
