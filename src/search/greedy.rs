use crate::domain::tokens::{SpecialTokens, TokenId};
use crate::domain::traits::StepDecoder;
use crate::search::decoder::validate_log_probs;
use crate::search::error::{Result, SearchError};
use crate::search::hypothesis::{CompletedHypothesis, Hypothesis, Termination};

/// Arg-max decoding, one hypothesis per batch element.
///
/// Each step picks the token with the highest extended score (ties → lower
/// token id), which is exactly what a beam of width 1 keeps. Elements stop
/// independently on `<eos>`; finished elements are not stepped again.
pub fn greedy_decode<D: StepDecoder>(
    decoder:    &D,
    hidden:     Vec<D::State>,
    max_length: usize,
    special:    SpecialTokens,
) -> Result<Vec<CompletedHypothesis>> {
    if max_length < 1 {
        return Err(SearchError::InvalidConfig(
            "max_length must be at least 1".to_string(),
        ));
    }

    let vocab_size = decoder.vocab_size();
    let mut slots: Vec<Slot<D::State>> = hidden
        .into_iter()
        .map(|state| Slot::Running(Hypothesis::seed(special.sos, state)))
        .collect();

    for _ in 0..max_length {
        let live: Vec<usize> = (0..slots.len())
            .filter(|&i| matches!(slots[i], Slot::Running(_)))
            .collect();
        if live.is_empty() {
            break;
        }

        let outputs = {
            let hyps: Vec<&Hypothesis<D::State>> = live
                .iter()
                .filter_map(|&i| match &slots[i] {
                    Slot::Running(h) => Some(h),
                    Slot::Done(_) => None,
                })
                .collect();
            let tokens: Vec<_> = hyps.iter().map(|h| h.last_token()).collect();
            let states: Vec<_> = hyps.iter().map(|h| h.state()).collect();
            decoder.step(&tokens, &states)?
        };
        if outputs.len() != live.len() {
            return Err(SearchError::DecoderOutputMismatch {
                expected: live.len(),
                actual:   outputs.len(),
            });
        }

        for (&index, out) in live.iter().zip(outputs) {
            validate_log_probs(index, &out.log_probs, vocab_size)?;
            let Slot::Running(hyp) = &slots[index] else { continue };

            let base = hyp.score();
            let mut best_token = 0usize;
            let mut best_score = f32::NEG_INFINITY;
            for (token, &lp) in out.log_probs.iter().enumerate() {
                let score = base + lp;
                if score > best_score {
                    best_token = token;
                    best_score = score;
                }
            }

            let token = best_token as TokenId;
            let next = if token == special.eos {
                Slot::Done(hyp.complete_with(token, best_score, Termination::EndOfSequence))
            } else {
                Slot::Running(hyp.extend(token, best_score, out.state))
            };
            slots[index] = next;
        }
    }

    Ok(slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Done(done) => done,
            Slot::Running(hyp) => hyp.finish(Termination::MaxLength),
        })
        .collect())
}

enum Slot<S> {
    Running(Hypothesis<S>),
    Done(CompletedHypothesis),
}
