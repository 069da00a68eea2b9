// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load train/val/test pairs    (Layer 4 - data)
//   Step 2: Build or load vocabularies   (Layer 6 - infra)
//   Step 3: Encode samples               (Layer 4 - data)
//   Step 4: Save config                  (Layer 6 - infra)
//   Step 5: Run training loop            (Layer 5 - ml)
//
// When the corpus has no validation split, 10% of the training
// pairs are held out with the run's seed. Evaluation rebuilds the
// same split the same way.
//
// Reference: Burn Book §5 (Training)

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{encode_pairs, TranslationDataset},
    loader::ParallelCorpusLoader,
    splitter::split_train_val,
};
use crate::domain::{sentence_pair::SentencePair, traits::CorpusSource};
use crate::infra::{
    checkpoint::{CheckpointManager, TrainingHistory},
    tokenizer_store::{TokenizerStore, Vocabulary},
};
use crate::ml::model::{RnnType, Seq2SeqConfig};
use crate::ml::trainer::{run_training, OptimizerKind, TrainingData, Vocabs};
use crate::search::BeamSearchConfig;

/// Share of the training split kept when validation is derived
const DERIVED_TRAIN_FRACTION: f64 = 0.9;

// ─── Training Configuration ──────────────────────────────────────────────────
// Saved as train_config.json so evaluate/translate can rebuild
// the exact architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:       String,
    pub src_lang:       String,
    pub trg_lang:       String,
    pub checkpoint_dir: String,
    pub seed:           u64,
    pub batch_size:     usize,
    pub num_layers:     usize,
    pub emb_dim:        usize,
    pub hidden_dim:     usize,
    /// Feed source sentences back to front
    pub reverse_source: bool,
    pub lr:             f64,
    pub rnn_type:       RnnType,
    pub optimizer:      OptimizerKind,
    pub epochs:         usize,
    pub dropout:        f64,
    /// Words seen fewer times map to <unk>
    pub min_freq:       usize,
    pub resume:         bool,
    pub cpu:            bool,
    pub verbose:        u8,
    /// Search used for validation and test scoring
    pub search:         BeamSearchConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:       "data/multi30k".to_string(),
            src_lang:       "de".to_string(),
            trg_lang:       "en".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            seed:           9,
            batch_size:     128,
            num_layers:     4,
            emb_dim:        256,
            hidden_dim:     512,
            reverse_source: true,
            lr:             1e-3,
            rnn_type:       RnnType::Lstm,
            optimizer:      OptimizerKind::Sgd,
            epochs:         10,
            dropout:        0.5,
            min_freq:       2,
            resume:         false,
            cpu:            false,
            verbose:        1,
            search:         BeamSearchConfig::default(),
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self, src_vocab_size: usize, trg_vocab_size: usize) -> Seq2SeqConfig {
        Seq2SeqConfig::new(
            src_vocab_size,
            trg_vocab_size,
            self.emb_dim,
            self.hidden_dim,
            self.num_layers,
            self.rnn_type,
        )
        .with_dropout(self.dropout)
    }
}

// ─── Corpus ───────────────────────────────────────────────────────────────────
/// The three splits of a parallel corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    pub train: Vec<SentencePair>,
    pub val:   Vec<SentencePair>,
    pub test:  Vec<SentencePair>,
}

impl Corpus {
    /// `train` is required. A missing `val` is carved out of `train`.
    pub fn load(source: &dyn CorpusSource, seed: u64) -> Result<Self> {
        let train = source
            .load_split("train")?
            .ok_or_else(|| anyhow!("The corpus has no 'train' split"))?;

        let (train, val) = match source.load_split("val")? {
            Some(val) => (train, val),
            None => {
                tracing::info!("No 'val' split found; holding out part of 'train'");
                split_train_val(train, DERIVED_TRAIN_FRACTION, seed)
            }
        };

        let test = source.load_split("test")?.unwrap_or_else(|| {
            tracing::warn!("No 'test' split found; test scoring will be skipped");
            Vec::new()
        });

        Ok(Self { train, val, test })
    }

    pub fn split(&self, name: &str) -> Result<&[SentencePair]> {
        match name {
            "train" => Ok(&self.train),
            "val"   => Ok(&self.val),
            "test"  => Ok(&self.test),
            other   => bail!("Unknown split '{other}' (expected train, val or test)"),
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingHistory> {
        let cfg = &self.config;
        cfg.search.validate()?;

        // ── Step 1: Load sentence pairs ───────────────────────────────────────
        tracing::info!("Loading corpus from '{}'", cfg.data_dir);
        let loader = ParallelCorpusLoader::new(&cfg.data_dir, &cfg.src_lang, &cfg.trg_lang);
        let corpus = Corpus::load(&loader, cfg.seed)?;
        tracing::info!(
            "Split: {} train, {} validation, {} test",
            corpus.train.len(),
            corpus.val.len(),
            corpus.test.len(),
        );

        // ── Step 2: Vocabularies from the training split only ─────────────────
        let tok_store = TokenizerStore::new(&cfg.checkpoint_dir);
        let (src_vocab, trg_vocab) = build_vocabs(&tok_store, cfg, &corpus.train)?;
        tracing::info!(
            "Vocabulary sizes: {}={}, {}={}",
            cfg.src_lang, src_vocab.len(), cfg.trg_lang, trg_vocab.len(),
        );

        // ── Step 3: Encode ────────────────────────────────────────────────────
        let encode = |pairs: &[SentencePair]| -> Result<TranslationDataset> {
            let samples = encode_pairs(pairs, &src_vocab, &trg_vocab, cfg.reverse_source)?;
            Ok(TranslationDataset::new(samples))
        };
        let data = TrainingData {
            train: encode(&corpus.train)?,
            val:   encode(&corpus.val)?,
            test:  encode(&corpus.test)?,
        };

        // ── Step 4: Save config for evaluate / translate ──────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;

        // ── Step 5: Training loop (Layer 5) ───────────────────────────────────
        let vocabs = Vocabs { src: &src_vocab, trg: &trg_vocab };
        run_training(cfg, data, vocabs, &ckpt)
    }
}

fn build_vocabs(
    store: &TokenizerStore,
    cfg:   &TrainConfig,
    train: &[SentencePair],
) -> Result<(Vocabulary, Vocabulary)> {
    let sources: Vec<&str> = train.iter().map(|p| p.source.as_str()).collect();
    let targets: Vec<&str> = train.iter().map(|p| p.target.as_str()).collect();
    let src = store.load_or_build(&cfg.src_lang, &sources, cfg.min_freq)?;
    let trg = store.load_or_build(&cfg.trg_lang, &targets, cfg.min_freq)?;
    Ok((src, trg))
}
