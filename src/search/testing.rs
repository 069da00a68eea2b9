//! Deterministic step decoders for exercising the search layer without a
//! model. Both decoders use the path emitted so far as their state, so a
//! wrongly shared or reordered state shows up as a wrong distribution.

use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::domain::tokens::{SpecialTokens, TokenId};
use crate::domain::traits::{StepDecoder, StepOutput};

pub const SOS: TokenId = 2;
pub const EOS: TokenId = 3;
pub const TOK_A: TokenId = 4;
pub const TOK_B: TokenId = 5;

/// State: which batch element we belong to plus every token emitted after
/// `<sos>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathState {
    pub element: usize,
    pub path:    Vec<TokenId>,
}

fn advance_path(state: &PathState, token: TokenId) -> PathState {
    let mut next = state.clone();
    if token != SpecialTokens::default().sos {
        next.path.push(token);
    }
    next
}

// ─── ScriptedDecoder ──────────────────────────────────────────────────────────
/// Looks up hand-written distributions by (element, path); anything not
/// scripted gets a uniform distribution.
pub struct ScriptedDecoder {
    vocab:       usize,
    table:       HashMap<(usize, Vec<TokenId>), Vec<f32>>,
    batch_sizes: RefCell<Vec<usize>>,
    fail:        bool,
}

impl ScriptedDecoder {
    pub fn new(vocab: usize) -> Self {
        Self {
            vocab,
            table: HashMap::new(),
            batch_sizes: RefCell::new(Vec::new()),
            fail: false,
        }
    }

    /// Every step call errors out
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Script probabilities (converted to natural logs)
    pub fn script(&mut self, element: usize, path: &[TokenId], probs: &[f32]) {
        let log_probs = probs.iter().map(|p| p.ln()).collect();
        self.table.insert((element, path.to_vec()), log_probs);
    }

    /// Script a raw row, valid or not
    pub fn script_log_probs(&mut self, element: usize, path: &[TokenId], log_probs: &[f32]) {
        self.table.insert((element, path.to_vec()), log_probs.to_vec());
    }

    pub fn initial_states(&self, batch: usize) -> Vec<PathState> {
        (0..batch).map(|element| PathState { element, path: Vec::new() }).collect()
    }

    /// Rows per step call, in call order
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.borrow().clone()
    }

    fn row(&self, state: &PathState) -> Vec<f32> {
        self.table
            .get(&(state.element, state.path.clone()))
            .cloned()
            .unwrap_or_else(|| vec![(1.0 / self.vocab as f32).ln(); self.vocab])
    }
}

impl StepDecoder for ScriptedDecoder {
    type State = PathState;

    fn vocab_size(&self) -> usize {
        self.vocab
    }

    fn step(&self, tokens: &[TokenId], states: &[&PathState]) -> Result<Vec<StepOutput<PathState>>> {
        if self.fail {
            bail!("scripted failure");
        }
        self.batch_sizes.borrow_mut().push(tokens.len());
        Ok(tokens
            .iter()
            .zip(states)
            .map(|(&token, state)| {
                let next = advance_path(state, token);
                StepOutput { log_probs: self.row(&next), state: next }
            })
            .collect())
    }
}

// ─── HashedDecoder ────────────────────────────────────────────────────────────
/// Pseudo-random but fully deterministic distributions derived from
/// (seed, element, path). Handy for property tests.
pub struct HashedDecoder {
    vocab:       usize,
    seed:        u64,
    batch_sizes: RefCell<Vec<usize>>,
}

impl HashedDecoder {
    pub fn new(vocab: usize, seed: u64) -> Self {
        Self { vocab, seed, batch_sizes: RefCell::new(Vec::new()) }
    }

    pub fn initial_states(&self, batch: usize) -> Vec<PathState> {
        (0..batch).map(|element| PathState { element, path: Vec::new() }).collect()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.borrow().clone()
    }

    /// Score of emitting `tokens` after `<sos>`, summed the same way the
    /// search accumulates it.
    pub fn path_log_prob(&self, element: usize, tokens: &[TokenId]) -> f32 {
        let mut state = PathState { element, path: Vec::new() };
        let mut input = SOS;
        let mut total = 0.0f32;
        for &token in tokens {
            state = advance_path(&state, input);
            total += self.row(&state)[token as usize];
            input = token;
        }
        total
    }

    fn row(&self, state: &PathState) -> Vec<f32> {
        let mut h = splitmix(self.seed ^ (state.element as u64).wrapping_mul(0x9E37_79B9));
        for &t in &state.path {
            h = splitmix(h ^ t as u64);
        }
        let logits: Vec<f32> = (0..self.vocab)
            .map(|i| {
                let v = splitmix(h.wrapping_add(i as u64));
                (v % 10_000) as f32 / 1_000.0
            })
            .collect();
        let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let log_sum = logits.iter().map(|l| (l - max).exp()).sum::<f32>().ln() + max;
        logits.iter().map(|l| l - log_sum).collect()
    }
}

impl StepDecoder for HashedDecoder {
    type State = PathState;

    fn vocab_size(&self) -> usize {
        self.vocab
    }

    fn step(&self, tokens: &[TokenId], states: &[&PathState]) -> Result<Vec<StepOutput<PathState>>> {
        self.batch_sizes.borrow_mut().push(tokens.len());
        Ok(tokens
            .iter()
            .zip(states)
            .map(|(&token, state)| {
                let next = advance_path(state, token);
                StepOutput { log_probs: self.row(&next), state: next }
            })
            .collect())
    }
}

fn splitmix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}
