// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `evaluate` and
// `translate`, and all their configurable flags.
//
// Each *Args struct converts into the matching application-layer
// config via From, so nothing below this layer sees clap types.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{
    evaluate_use_case::EvalConfig,
    train_use_case::TrainConfig,
    translate_use_case::TranslateConfig,
};
use crate::ml::{model::RnnType, trainer::OptimizerKind};
use crate::search::BeamSearchConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the translation model on a parallel corpus
    Train(TrainArgs),

    /// Score a trained checkpoint on a corpus split (BLEU)
    Evaluate(EvaluateArgs),

    /// Translate one sentence with a trained checkpoint
    Translate(TranslateArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RnnArg {
    Lstm,
    Gru,
}

impl From<RnnArg> for RnnType {
    fn from(a: RnnArg) -> Self {
        match a {
            RnnArg::Lstm => RnnType::Lstm,
            RnnArg::Gru  => RnnType::Gru,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptimizerArg {
    Sgd,
    Adam,
}

impl From<OptimizerArg> for OptimizerKind {
    fn from(a: OptimizerArg) -> Self {
        match a {
            OptimizerArg::Sgd  => OptimizerKind::Sgd,
            OptimizerArg::Adam => OptimizerKind::Adam,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding {split}.{lang} files (train, val, test)
    #[arg(long, default_value = "data/multi30k")]
    pub data_dir: String,

    #[arg(long, default_value = "de")]
    pub src_lang: String,

    #[arg(long, default_value = "en")]
    pub trg_lang: String,

    /// Where weights, tokenizers, config and metrics are written
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value_t = 9)]
    pub seed: u64,

    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    /// Stacked recurrent layers in encoder and decoder
    #[arg(long, default_value_t = 4)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 256)]
    pub emb_dim: usize,

    #[arg(long, default_value_t = 512)]
    pub hidden_dim: usize,

    /// Keep the source word order instead of reversing it
    #[arg(long)]
    pub no_reverse: bool,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    #[arg(long, value_enum, default_value_t = RnnArg::Lstm)]
    pub rnn_type: RnnArg,

    #[arg(long = "opt", value_enum, default_value_t = OptimizerArg::Sgd)]
    pub optimizer: OptimizerArg,

    /// Epochs to run (on top of finished ones with --resume)
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    /// Words seen fewer times in training become <unk>
    #[arg(long, default_value_t = 2)]
    pub min_freq: usize,

    /// Continue from the last finished epoch in --checkpoint-dir
    #[arg(long)]
    pub resume: bool,

    /// Run on the CPU adapter instead of the default GPU
    #[arg(long)]
    pub cpu: bool,

    /// 0 = quiet, 1 = test examples, 2 = validation examples too
    #[arg(long, default_value_t = 1)]
    pub verbose: u8,

    /// Beam width for validation and test scoring
    #[arg(long, default_value_t = 2)]
    pub beam_width: usize,

    /// Hypotheses kept per sentence when scoring
    #[arg(long, default_value_t = 1)]
    pub n_sen: usize,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let defaults = TrainConfig::default();
        TrainConfig {
            data_dir:       a.data_dir,
            src_lang:       a.src_lang,
            trg_lang:       a.trg_lang,
            checkpoint_dir: a.checkpoint_dir,
            seed:           a.seed,
            batch_size:     a.batch_size,
            num_layers:     a.num_layers,
            emb_dim:        a.emb_dim,
            hidden_dim:     a.hidden_dim,
            reverse_source: !a.no_reverse,
            lr:             a.lr,
            rnn_type:       a.rnn_type.into(),
            optimizer:      a.optimizer.into(),
            epochs:         a.epochs,
            dropout:        a.dropout,
            min_freq:       a.min_freq,
            resume:         a.resume,
            cpu:            a.cpu,
            verbose:        a.verbose,
            search:         BeamSearchConfig::new(a.beam_width, a.n_sen, defaults.search.max_length),
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Defaults to the data directory the model was trained on
    #[arg(long)]
    pub data_dir: Option<String>,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Saved weights to score (model_best, model_final, model_epoch_N)
    #[arg(long, default_value = "model_best")]
    pub checkpoint: String,

    /// train, val or test
    #[arg(long, default_value = "test")]
    pub split: String,

    #[arg(long, default_value_t = 2)]
    pub beam_width: usize,

    #[arg(long, default_value_t = 1)]
    pub n_sen: usize,

    /// Decoder steps; defaults to each batch's target length
    #[arg(long)]
    pub max_length: Option<usize>,

    /// Arg-max decoding instead of beam search
    #[arg(long)]
    pub greedy: bool,

    #[arg(long)]
    pub cpu: bool,

    #[arg(long, default_value_t = 1)]
    pub verbose: u8,
}

impl From<EvaluateArgs> for EvalConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvalConfig {
            data_dir:       a.data_dir,
            checkpoint_dir: a.checkpoint_dir,
            checkpoint:     a.checkpoint,
            split:          a.split,
            beam_width:     a.beam_width,
            n_sen:          a.n_sen,
            max_length:     a.max_length,
            greedy:         a.greedy,
            cpu:            a.cpu,
            verbose:        a.verbose,
        }
    }
}

/// All arguments for the `translate` command
#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// The source-language sentence to translate
    #[arg(long)]
    pub sentence: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value = "model_best")]
    pub checkpoint: String,

    #[arg(long, default_value_t = 2)]
    pub beam_width: usize,

    /// Number of translations to print
    #[arg(long, default_value_t = 1)]
    pub n_sen: usize,

    #[arg(long, default_value_t = 50)]
    pub max_length: usize,

    /// GNMT length penalty alpha (e.g. 0.6)
    #[arg(long)]
    pub length_penalty: Option<f32>,

    #[arg(long)]
    pub greedy: bool,

    #[arg(long)]
    pub cpu: bool,
}

impl From<TranslateArgs> for TranslateConfig {
    fn from(a: TranslateArgs) -> Self {
        TranslateConfig {
            checkpoint_dir: a.checkpoint_dir,
            checkpoint:     a.checkpoint,
            beam_width:     a.beam_width,
            n_sen:          a.n_sen,
            max_length:     a.max_length,
            length_penalty: a.length_penalty,
            greedy:         a.greedy,
            cpu:            a.cpu,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["seq2seq-nmt", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        let defaults = TrainConfig::default();
        assert_eq!(cfg.seed, defaults.seed);
        assert_eq!(cfg.hidden_dim, defaults.hidden_dim);
        assert_eq!(cfg.reverse_source, defaults.reverse_source);
        assert_eq!(cfg.optimizer, defaults.optimizer);
        assert_eq!(cfg.search, defaults.search);
    }

    #[test]
    fn test_train_flags() {
        let cli = Cli::try_parse_from([
            "seq2seq-nmt", "train", "--no-reverse", "--rnn-type", "gru", "--opt", "adam",
            "--beam-width", "5", "--n-sen", "3",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert!(!cfg.reverse_source);
        assert_eq!(cfg.rnn_type, RnnType::Gru);
        assert_eq!(cfg.optimizer, OptimizerKind::Adam);
        assert_eq!((cfg.search.beam_width, cfg.search.n_sen), (5, 3));
    }

    #[test]
    fn test_translate_requires_sentence() {
        assert!(Cli::try_parse_from(["seq2seq-nmt", "translate"]).is_err());
        let cli = Cli::try_parse_from([
            "seq2seq-nmt", "translate", "--sentence", "ein hund", "--length-penalty", "0.6",
        ])
        .unwrap();
        let Commands::Translate(args) = cli.command else { panic!("expected translate") };
        let cfg: TranslateConfig = args.into();
        assert_eq!(cfg.checkpoint, "model_best");
        assert_eq!(cfg.max_length, 50);
        assert_eq!(cfg.length_penalty, Some(0.6));
    }
}
