// ============================================================
// Layer 5 — Generation
// ============================================================
// Connects the burn decoder to the search layer:
//
//   BurnStepDecoder — implements StepDecoder. Every call stacks
//                     the per-hypothesis states into one batch,
//                     runs a single decoder step on the device,
//                     and splits the result back per row.
//   generate()      — encode a source batch, then beam search or
//                     greedy decode it.
//   generate_tokens() — the same, ranked token sequences only.

use anyhow::{anyhow, Result};
use burn::prelude::*;

use crate::domain::tokens::{SpecialTokens, TokenId};
use crate::domain::traits::{SequenceEncoder, StepDecoder, StepOutput};
use crate::ml::model::{Decoder, RecurrentState, Seq2SeqModel};
use crate::search::{greedy_decode, BeamSearchConfig, BeamSearchDecoder, CompletedHypothesis};

pub struct BurnStepDecoder<'a, B: Backend> {
    decoder: &'a Decoder<B>,
    device:  B::Device,
}

impl<'a, B: Backend> BurnStepDecoder<'a, B> {
    pub fn new(model: &'a Seq2SeqModel<B>, device: B::Device) -> Self {
        Self { decoder: &model.decoder, device }
    }
}

impl<B: Backend> StepDecoder for BurnStepDecoder<'_, B> {
    type State = RecurrentState<B>;

    fn vocab_size(&self) -> usize {
        self.decoder.vocab_size
    }

    fn step(
        &self,
        tokens: &[TokenId],
        states: &[&RecurrentState<B>],
    ) -> Result<Vec<StepOutput<RecurrentState<B>>>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = tokens.iter().map(|&t| t as i32).collect();
        let input = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &self.device);
        let state = RecurrentState::stack(states)?;

        let (log_probs, next) = self.decoder.step(input, state);
        let rows: Vec<f32> = log_probs
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow!("Cannot read decoder output: {e:?}"))?;

        Ok(rows
            .chunks(self.vocab_size())
            .zip(next.split())
            .map(|(row, state)| StepOutput { log_probs: row.to_vec(), state })
            .collect())
    }
}

/// How output sentences are produced.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeStrategy {
    Beam(BeamSearchConfig),
    Greedy { max_length: usize },
}

impl DecodeStrategy {
    pub fn with_max_length(&self, max_length: usize) -> Self {
        match self {
            DecodeStrategy::Beam(cfg) => DecodeStrategy::Beam(cfg.clone().with_max_length(max_length)),
            DecodeStrategy::Greedy { .. } => DecodeStrategy::Greedy { max_length },
        }
    }
}

/// Ranked hypotheses for every row of `src` ([batch, src_len]).
/// Greedy decoding yields exactly one hypothesis per row.
pub fn generate<B: Backend>(
    model:    &Seq2SeqModel<B>,
    src:      Tensor<B, 2, Int>,
    strategy: &DecodeStrategy,
    special:  SpecialTokens,
    device:   &B::Device,
) -> Result<Vec<Vec<CompletedHypothesis>>> {
    let hidden = model.encode(src)?;
    let step = BurnStepDecoder::new(model, device.clone());

    let ranked = match strategy {
        DecodeStrategy::Beam(cfg) => BeamSearchDecoder::new(cfg.clone(), special)?
            .decode_hypotheses(&step, hidden)?,
        DecodeStrategy::Greedy { max_length } => greedy_decode(&step, hidden, *max_length, special)?
            .into_iter()
            .map(|h| vec![h])
            .collect(),
    };
    Ok(ranked)
}

/// `result[row][rank]` = emitted tokens, `<eos>` kept if emitted.
pub fn generate_tokens<B: Backend>(
    model:    &Seq2SeqModel<B>,
    src:      Tensor<B, 2, Int>,
    strategy: &DecodeStrategy,
    special:  SpecialTokens,
    device:   &B::Device,
) -> Result<Vec<Vec<Vec<TokenId>>>> {
    let hidden = model.encode(src)?;
    let step = BurnStepDecoder::new(model, device.clone());

    let ranked = match strategy {
        DecodeStrategy::Beam(cfg) => BeamSearchDecoder::new(cfg.clone(), special)?.decode(&step, hidden)?,
        DecodeStrategy::Greedy { max_length } => greedy_decode(&step, hidden, *max_length, special)?
            .into_iter()
            .map(|h| vec![h.tokens])
            .collect(),
    };
    Ok(ranked)
}
