// ============================================================
// Layer 3b — Beam State
// ============================================================
// Book-keeping for beam search, one Beam per batch element:
//
//   active     — at most `width` hypotheses still being expanded,
//                kept in rank order
//   completed  — at most `target` finished hypotheses, in the
//                order they finished
//
// Candidate ranking is a total order:
//   1. cumulative score, higher first
//   2. token id, lower first
//   3. parent insertion index, lower first
// so the same inputs always prune to the same beam.

use std::cmp::Ordering;

use crate::domain::tokens::TokenId;
use crate::search::config::LengthNormalization;
use crate::search::error::{Result, SearchError};
use crate::search::hypothesis::{CompletedHypothesis, Hypothesis, Termination};

// ─── Candidate ────────────────────────────────────────────────────────────────
/// One possible continuation: parent hypothesis `parent` extended by `token`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub score: f32,
    pub token: TokenId,
    pub parent: usize,
}

impl Candidate {
    /// Total order used for pruning; `Less` means "ranks first".
    pub fn rank(a: &Candidate, b: &Candidate) -> Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.token.cmp(&b.token))
            .then_with(|| a.parent.cmp(&b.parent))
    }

    /// Push the best `limit` continuations of one parent onto `out`.
    ///
    /// The global top-`limit` can never contain more than `limit` entries
    /// from a single parent, so pre-pruning per parent with the same order
    /// is exact.
    pub fn collect_top(
        parent:     usize,
        base_score: f32,
        log_probs:  &[f32],
        limit:      usize,
        out:        &mut Vec<Candidate>,
    ) {
        if limit == 0 {
            return;
        }
        let mut row: Vec<Candidate> = log_probs
            .iter()
            .enumerate()
            .map(|(token, &lp)| Candidate {
                score: base_score + lp,
                token: token as TokenId,
                parent,
            })
            .collect();
        if row.len() > limit {
            row.select_nth_unstable_by(limit - 1, Candidate::rank);
            row.truncate(limit);
        }
        out.extend(row);
    }
}

// ─── Beam ─────────────────────────────────────────────────────────────────────
/// Search state of a single batch element.
#[derive(Debug, Clone)]
pub struct Beam<S> {
    width:     usize,
    target:    usize,
    active:    Vec<Hypothesis<S>>,
    completed: Vec<CompletedHypothesis>,
    finished:  bool,
}

impl<S: Clone> Beam<S> {
    /// A degenerate beam holding only the seed hypothesis
    pub fn new(width: usize, target: usize, seed: Hypothesis<S>) -> Self {
        Self {
            width,
            target,
            active: vec![seed],
            completed: Vec::with_capacity(target),
            finished: false,
        }
    }

    pub fn active(&self) -> &[Hypothesis<S>] {
        &self.active
    }

    pub fn completed(&self) -> &[CompletedHypothesis] {
        &self.completed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// How many ranked candidates one prune can consume at most:
    /// every candidate either fills an active slot or a completed slot.
    pub fn candidate_limit(&self) -> usize {
        self.width + self.target.saturating_sub(self.completed.len())
    }

    /// Prune `candidates` into the next active set.
    ///
    /// `next_states[p]` is the state the decoder produced for active
    /// hypothesis `p`. Each survivor gets its own clone of it. End-of-
    /// sequence candidates move to `completed` and free their slot for the
    /// next-best candidate. Candidates scored `-inf` are never kept.
    pub fn advance(&mut self, mut candidates: Vec<Candidate>, next_states: &[S], eos: TokenId) {
        debug_assert_eq!(next_states.len(), self.active.len());
        candidates.sort_unstable_by(Candidate::rank);

        let parents = std::mem::take(&mut self.active);
        for cand in candidates {
            if self.active.len() >= self.width || self.completed.len() >= self.target {
                break;
            }
            // Sorted, so everything after this is impossible too
            if cand.score == f32::NEG_INFINITY {
                break;
            }
            let parent = &parents[cand.parent];
            if cand.token == eos {
                self.completed.push(parent.complete_with(
                    cand.token,
                    cand.score,
                    Termination::EndOfSequence,
                ));
            } else {
                let state = next_states[cand.parent].clone();
                self.active.push(parent.extend(cand.token, cand.score, state));
            }
        }

        if self.completed.len() >= self.target || self.active.is_empty() {
            self.finished = true;
        }
    }

    /// Consume the beam and return at most `n` finished hypotheses,
    /// best first. Missing slots are filled with the best active
    /// hypotheses, marked `Termination::MaxLength`.
    pub fn into_ranked(self, n: usize, norm: LengthNormalization) -> Vec<CompletedHypothesis> {
        let ranking = |h: &CompletedHypothesis| norm.apply(h.score, h.tokens.len());

        let mut completed = self.completed;
        if completed.len() < n {
            let mut leftovers: Vec<CompletedHypothesis> = self
                .active
                .into_iter()
                .map(|h| h.finish(Termination::MaxLength))
                .collect();
            leftovers.sort_by(|a, b| ranking(b).total_cmp(&ranking(a)));
            let missing = n - completed.len();
            completed.extend(leftovers.into_iter().take(missing));
        }

        // Stable: equal scores keep completion order
        completed.sort_by(|a, b| ranking(b).total_cmp(&ranking(a)));
        completed.truncate(n);
        completed
    }
}

// ─── BatchBeamState ───────────────────────────────────────────────────────────
/// Where one batch element's rows sit in a batched decoder call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub beam:  usize,
    pub start: usize,
    pub len:   usize,
}

/// Inputs for one batched decoder call, borrowed from the beams.
pub struct PendingStep<'a, S> {
    pub tokens:   Vec<TokenId>,
    pub states:   Vec<&'a S>,
    pub segments: Vec<Segment>,
}

/// All beams of one decode call, indexed by batch element.
#[derive(Debug, Clone)]
pub struct BatchBeamState<S> {
    beams: Vec<Beam<S>>,
}

impl<S: Clone> BatchBeamState<S> {
    /// Seed every batch element with its own encoder state.
    pub fn new(initial: Vec<S>, sos: TokenId, width: usize, target: usize) -> Self {
        let beams = initial
            .into_iter()
            .map(|state| Beam::new(width, target, Hypothesis::seed(sos, state)))
            .collect();
        Self { beams }
    }

    pub fn len(&self) -> usize {
        self.beams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beams.is_empty()
    }

    pub fn beams(&self) -> &[Beam<S>] {
        &self.beams
    }

    pub fn beam_mut(&mut self, index: usize) -> &mut Beam<S> {
        &mut self.beams[index]
    }

    /// Every element must start with something to expand
    pub fn ensure_seeded(&self) -> Result<()> {
        match self.beams.iter().position(|b| b.active.is_empty()) {
            Some(batch_index) => Err(SearchError::NoActiveHypotheses { batch_index }),
            None => Ok(()),
        }
    }

    pub fn all_finished(&self) -> bool {
        self.beams.iter().all(Beam::is_finished)
    }

    /// Flatten the active hypotheses of all unfinished beams into one batch.
    pub fn pending(&self) -> PendingStep<'_, S> {
        let mut tokens   = Vec::new();
        let mut states   = Vec::new();
        let mut segments = Vec::new();

        for (index, beam) in self.beams.iter().enumerate() {
            if beam.finished {
                continue;
            }
            segments.push(Segment { beam: index, start: tokens.len(), len: beam.active.len() });
            for hyp in &beam.active {
                tokens.push(hyp.last_token());
                states.push(hyp.state());
            }
        }

        PendingStep { tokens, states, segments }
    }

    /// Consume the state into per-element ranked results.
    pub fn into_results(self, n: usize, norm: LengthNormalization) -> Vec<Vec<CompletedHypothesis>> {
        self.beams
            .into_iter()
            .map(|beam| beam.into_ranked(n, norm))
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SOS: TokenId = 2;
    const EOS: TokenId = 3;

    fn cand(score: f32, token: TokenId, parent: usize) -> Candidate {
        Candidate { score, token, parent }
    }

    #[test]
    fn test_rank_orders_by_score_then_token_then_parent() {
        let mut c = vec![
            cand(-1.0, 5, 1),
            cand(-0.5, 9, 0),
            cand(-1.0, 5, 0),
            cand(-1.0, 4, 1),
        ];
        c.sort_by(Candidate::rank);
        assert_eq!(c, vec![
            cand(-0.5, 9, 0),
            cand(-1.0, 4, 1),
            cand(-1.0, 5, 0),
            cand(-1.0, 5, 1),
        ]);
    }

    #[test]
    fn test_collect_top_keeps_best_per_parent() {
        let mut out = Vec::new();
        Candidate::collect_top(1, -1.0, &[-3.0, -0.1, -2.0, -0.1], 2, &mut out);
        out.sort_by(Candidate::rank);
        // Tie on -1.1 resolved by the lower token id
        assert_eq!(out, vec![cand(-1.1, 1, 1), cand(-1.1, 3, 1)]);
    }

    #[test]
    fn test_eos_frees_its_slot() {
        let mut beam = Beam::new(2, 2, Hypothesis::seed(SOS, 0u8));
        // eos ranks first, then two regular tokens fill both active slots
        beam.advance(
            vec![cand(-0.1, EOS, 0), cand(-0.2, 4, 0), cand(-0.3, 5, 0), cand(-0.4, 6, 0)],
            &[7u8],
            EOS,
        );
        assert_eq!(beam.completed().len(), 1);
        assert_eq!(beam.completed()[0].tokens, vec![EOS]);
        let kept: Vec<&[TokenId]> = beam.active().iter().map(|h| h.tokens()).collect();
        assert_eq!(kept, vec![&[SOS, 4][..], &[SOS, 5][..]]);
        assert!(beam.active().iter().all(|h| *h.state() == 7));
        assert!(!beam.is_finished());
    }

    #[test]
    fn test_reaching_target_finishes_beam() {
        let mut beam = Beam::new(3, 1, Hypothesis::seed(SOS, ()));
        beam.advance(vec![cand(-0.2, 4, 0), cand(-0.1, EOS, 0)], &[()], EOS);
        assert!(beam.is_finished());
        assert_eq!(beam.completed().len(), 1);
        // Walk stopped as soon as the target was met
        assert!(beam.active().is_empty());
    }

    #[test]
    fn test_impossible_candidates_are_dropped() {
        let mut beam = Beam::new(2, 1, Hypothesis::seed(SOS, ()));
        beam.advance(
            vec![cand(f32::NEG_INFINITY, 4, 0), cand(f32::NEG_INFINITY, 5, 0)],
            &[()],
            EOS,
        );
        assert!(beam.active().is_empty());
        assert!(beam.is_finished());
    }

    #[test]
    fn test_into_ranked_promotes_best_active() {
        let mut beam = Beam::new(2, 2, Hypothesis::seed(SOS, ()));
        beam.advance(vec![cand(-0.5, 4, 0), cand(-0.2, 5, 0)], &[()], EOS);
        let ranked = beam.into_ranked(2, LengthNormalization::None);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].tokens, vec![5]);
        assert_eq!(ranked[1].tokens, vec![4]);
        assert!(ranked.iter().all(|h| h.termination == Termination::MaxLength));
    }

    #[test]
    fn test_length_normalization_can_reorder_results() {
        let mut beam = Beam::new(2, 2, Hypothesis::seed(SOS, ()));
        beam.advance(vec![cand(-1.0, EOS, 0), cand(-1.5, 4, 0)], &[()], EOS);
        beam.advance(vec![cand(-1.6, EOS, 0)], &[()], EOS);
        let raw = beam.clone().into_ranked(2, LengthNormalization::None);
        assert_eq!(raw[0].tokens, vec![EOS]);
        let avg = beam.into_ranked(2, LengthNormalization::Average);
        // -1.6 / 2 beats -1.0 / 1
        assert_eq!(avg[0].tokens, vec![4, EOS]);
    }

    #[test]
    fn test_pending_skips_finished_beams() {
        let mut state = BatchBeamState::new(vec![10u8, 20u8], SOS, 2, 1);
        state.beam_mut(0).advance(vec![cand(0.0, EOS, 0)], &[11u8], EOS);
        let pending = state.pending();
        assert_eq!(pending.tokens, vec![SOS]);
        assert_eq!(pending.states, vec![&20u8]);
        assert_eq!(pending.segments, vec![Segment { beam: 1, start: 0, len: 1 }]);
    }

    #[test]
    fn test_empty_seed_is_detected() {
        let mut state = BatchBeamState::new(vec![(), ()], SOS, 1, 1);
        state.beam_mut(1).active.clear();
        let err = state.ensure_seeded().unwrap_err();
        assert!(matches!(err, SearchError::NoActiveHypotheses { batch_index: 1 }));
    }

    proptest! {
        #[test]
        fn prop_active_never_exceeds_width(
            width in 1usize..6,
            extra in 0usize..6,
            scores in prop::collection::vec((-20.0f32..0.0, 0u32..12), 1..60),
        ) {
            let target = (width.min(1 + extra % width)).max(1);
            let parents = 3usize;
            let mut beam = Beam::new(width, target, Hypothesis::seed(SOS, 0usize));
            // Grow to several parents first
            beam.advance(
                (0..parents as u32).map(|t| cand(-(t as f32), 4 + t, 0)).collect(),
                &[0usize],
                EOS,
            );
            let n_parents = beam.active().len();
            let cands: Vec<Candidate> = scores
                .iter()
                .enumerate()
                .map(|(i, &(s, t))| cand(s, t, i % n_parents.max(1)))
                .collect();
            if n_parents > 0 {
                let states: Vec<usize> = (0..n_parents).collect();
                beam.advance(cands, &states, EOS);
            }
            prop_assert!(beam.active().len() <= width);
            prop_assert!(beam.completed().len() <= target);
        }

        #[test]
        fn prop_prune_is_order_independent(
            scores in prop::collection::vec((-5.0f32..0.0, 0u32..8, 0usize..3), 1..40),
        ) {
            let mut scores = scores;
            let run = |cands: Vec<Candidate>| {
                let mut beam = Beam::new(3, 2, Hypothesis::seed(SOS, ()));
                beam.active = (0..3).map(|t| Hypothesis::seed(SOS, ()).extend(10 + t, 0.0, ())).collect();
                beam.advance(cands, &[(), (), ()], EOS);
                (
                    beam.active().iter().map(|h| h.tokens().to_vec()).collect::<Vec<_>>(),
                    beam.completed().to_vec(),
                )
            };
            let forward: Vec<Candidate> = scores.iter().map(|&(s, t, p)| cand(s, t, p)).collect();
            scores.reverse();
            let backward: Vec<Candidate> = scores.iter().map(|&(s, t, p)| cand(s, t, p)).collect();
            prop_assert_eq!(run(forward), run(backward));
        }
    }
}
