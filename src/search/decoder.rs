// ============================================================
// Layer 3b — Beam Search Decoder
// ============================================================
// Drives a StepDecoder over a whole batch:
//
//   seed      one <sos> hypothesis per element, score 0
//   loop      one batched step() over every active hypothesis
//             → validate rows → score candidates → prune
//   stop      all beams finished, or max_length steps taken
//   extract   top n_sen finished hypotheses per element,
//             topped up with the best active ones if short
//
// Scores are plain sums of natural-log probabilities unless a
// LengthNormalization is configured.

use crate::domain::tokens::{SpecialTokens, TokenId};
use crate::domain::traits::{StepDecoder, StepOutput};
use crate::search::beam::{BatchBeamState, Candidate, Segment};
use crate::search::config::BeamSearchConfig;
use crate::search::error::{Result, SearchError};
use crate::search::hypothesis::CompletedHypothesis;

/// Log-probabilities above this are rejected as invalid
const LOG_PROB_TOLERANCE: f32 = 1e-4;

pub struct BeamSearchDecoder {
    config:  BeamSearchConfig,
    special: SpecialTokens,
}

impl BeamSearchDecoder {
    pub fn new(config: BeamSearchConfig, special: SpecialTokens) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, special })
    }

    /// Ranked token sequences per batch element:
    /// `result[element][rank] = tokens` (no <sos>, <eos> kept if emitted).
    pub fn decode<D: StepDecoder>(
        &self,
        decoder: &D,
        hidden:  Vec<D::State>,
    ) -> Result<Vec<Vec<Vec<TokenId>>>> {
        let ranked = self.decode_hypotheses(decoder, hidden)?;
        Ok(ranked
            .into_iter()
            .map(|hyps| hyps.into_iter().map(|h| h.tokens).collect())
            .collect())
    }

    /// Same as `decode` but keeps scores and termination reasons.
    pub fn decode_hypotheses<D: StepDecoder>(
        &self,
        decoder: &D,
        hidden:  Vec<D::State>,
    ) -> Result<Vec<Vec<CompletedHypothesis>>> {
        let cfg = &self.config;
        let mut beams = BatchBeamState::new(hidden, self.special.sos, cfg.beam_width, cfg.n_sen);
        if beams.is_empty() {
            return Ok(Vec::new());
        }
        beams.ensure_seeded()?;

        let vocab_size = decoder.vocab_size();
        let mut steps = 0usize;

        while steps < cfg.max_length && !beams.all_finished() {
            let (segments, outputs) = {
                let pending = beams.pending();
                let outputs = decoder.step(&pending.tokens, &pending.states)?;
                if outputs.len() != pending.tokens.len() {
                    return Err(SearchError::DecoderOutputMismatch {
                        expected: pending.tokens.len(),
                        actual:   outputs.len(),
                    });
                }
                tracing::trace!(step = steps, rows = outputs.len(), "beam step");
                (pending.segments, outputs)
            };

            self.prune(&mut beams, &segments, outputs, vocab_size)?;
            steps += 1;
        }

        tracing::debug!(
            "Beam search finished after {} steps ({} of {} elements terminated early)",
            steps,
            beams.beams().iter().filter(|b| b.is_finished()).count(),
            beams.len(),
        );

        Ok(beams.into_results(cfg.n_sen, cfg.length_normalization))
    }

    /// Hand each element its slice of the step outputs and prune.
    fn prune<S: Clone>(
        &self,
        beams:      &mut BatchBeamState<S>,
        segments:   &[Segment],
        outputs:    Vec<StepOutput<S>>,
        vocab_size: usize,
    ) -> Result<()> {
        let mut rows = outputs.into_iter();

        for seg in segments {
            let beam  = beams.beam_mut(seg.beam);
            let limit = beam.candidate_limit();

            let mut candidates  = Vec::with_capacity(seg.len * limit);
            let mut next_states = Vec::with_capacity(seg.len);

            for (parent, row) in rows.by_ref().take(seg.len).enumerate() {
                validate_log_probs(seg.beam, &row.log_probs, vocab_size)?;
                let base = beam.active()[parent].score();
                Candidate::collect_top(parent, base, &row.log_probs, limit, &mut candidates);
                next_states.push(row.state);
            }

            beam.advance(candidates, &next_states, self.special.eos);
        }
        Ok(())
    }
}

/// A row must be a vocabulary-sized vector of log-probabilities.
/// `-inf` is allowed (the token is impossible) as long as some token
/// is possible; NaN and `+inf` are not.
pub(crate) fn validate_log_probs(batch_index: usize, row: &[f32], vocab_size: usize) -> Result<()> {
    if row.len() != vocab_size {
        return Err(SearchError::InvalidLogProbs {
            batch_index,
            reason: format!("expected {vocab_size} entries, got {}", row.len()),
        });
    }
    if let Some((token, value)) = row
        .iter()
        .enumerate()
        .find(|(_, v)| v.is_nan() || **v > LOG_PROB_TOLERANCE)
    {
        return Err(SearchError::InvalidLogProbs {
            batch_index,
            reason: format!("token {token} has value {value}"),
        });
    }
    if row.iter().all(|v| *v == f32::NEG_INFINITY) {
        return Err(SearchError::InvalidLogProbs {
            batch_index,
            reason: "every token has probability zero".to_string(),
        });
    }
    Ok(())
}
