// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Scores a model on a data split:
//
//   for each batch
//     generate  → ranked token sequences per sentence (beam/greedy)
//     detokenize hypotheses and gold targets (specials dropped)
//     sentence BLEU, hypotheses as references and the gold
//       sentence as the candidate
//   BLEU = mean sentence BLEU × 100
//
// Unless a fixed max_length is given, each batch decodes for as
// many steps as its padded target length.

use anyhow::Result;
use burn::{data::dataloader::DataLoader, prelude::*};

use crate::data::batcher::TranslationBatch;
use crate::infra::bleu::sentence_bleu;
use crate::infra::tokenizer_store::Vocabulary;
use crate::ml::generation::{generate_tokens, DecodeStrategy};
use crate::ml::model::Seq2SeqModel;

pub struct EvalOptions<'a> {
    pub strategy:      &'a DecodeStrategy,
    /// Overrides the per-batch target length
    pub max_length:    Option<usize>,
    /// Print the first sentence of every batch
    pub print_example: bool,
}

pub fn evaluate<B: Backend>(
    model:   &Seq2SeqModel<B>,
    loader:  &dyn DataLoader<TranslationBatch<B>>,
    vocab:   &Vocabulary,
    options: &EvalOptions<'_>,
    device:  &B::Device,
) -> Result<f64> {
    let special = vocab.special_tokens();
    let mut bleu_sum  = 0.0f64;
    let mut sentences = 0usize;

    for (index, batch) in loader.iter().enumerate() {
        let [_, trg_len] = batch.trg.dims();
        let strategy = options
            .strategy
            .with_max_length(options.max_length.unwrap_or(trg_len));

        let ranked = generate_tokens(model, batch.src, &strategy, special, device)?;

        let targets: Vec<Vec<String>> = batch
            .trg_ids
            .iter()
            .map(|ids| vocab.decode_words(ids))
            .collect();
        let outputs: Vec<Vec<Vec<String>>> = ranked
            .iter()
            .map(|hyps| hyps.iter().map(|tokens| vocab.decode_words(tokens)).collect())
            .collect();

        if options.print_example {
            if let (Some(target), Some(hyps)) = (targets.first(), outputs.first()) {
                let hyps: Vec<String> = hyps.iter().map(|h| h.join(" ")).collect();
                println!("Target sentence: \"{}\"", target.join(" "));
                println!("Hypothesis sentences: \"{}\"\n", hyps.join("\" , \""));
            }
        }

        for (hyps, target) in outputs.iter().zip(&targets) {
            bleu_sum  += sentence_bleu(hyps, target);
            sentences += 1;
        }
        tracing::debug!("Evaluated batch {} ({} sentences so far)", index + 1, sentences);
    }

    if sentences == 0 {
        tracing::warn!("Evaluation split is empty");
        return Ok(0.0);
    }
    Ok(bleu_sum * 100.0 / sentences as f64)
}
