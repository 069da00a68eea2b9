// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All work is delegated to Layer 2 (application).
//
//   1. `train`     — trains the model on a parallel corpus
//   2. `evaluate`  — BLEU of a checkpoint on one split
//   3. `translate` — ranked translations of one sentence
//
// Reference: Rust Book §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs, TranslateArgs};

use crate::domain::traits::Translator;

#[derive(Parser, Debug)]
#[command(
    name = "seq2seq-nmt",
    version,
    about = "Train a recurrent encoder-decoder translator and decode it with beam search."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. Only routing happens here.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => run_train(args),
            Commands::Evaluate(args)  => run_evaluate(args),
            Commands::Translate(args) => run_translate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on corpus in: {}", args.data_dir);
    let history = TrainUseCase::new(args.into()).execute()?;

    match (history.best_epoch, history.best_score) {
        (Some(epoch), Some(score)) => {
            println!("Training complete. Best BLEU {:.2} at epoch {}.", score, epoch)
        }
        _ => println!("Training complete."),
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let split = args.split.clone();
    let bleu = EvaluateUseCase::new(args.into()).execute()?;
    println!("BLEU score on '{}': {:.2}", split, bleu);
    Ok(())
}

fn run_translate(args: TranslateArgs) -> Result<()> {
    use crate::application::translate_use_case::TranslateUseCase;

    let sentence = args.sentence.clone();
    let use_case = TranslateUseCase::new(&args.into())?;

    let translations = use_case.translate(&sentence)?;
    for (rank, (text, score)) in translations.iter().enumerate() {
        println!("{}. {} ({:.4})", rank + 1, text, score);
    }
    Ok(())
}
