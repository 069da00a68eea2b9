// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The search layer and the application layer only ever talk
// to the model through these traits. The burn implementations
// live in Layer 5 (ml); tests plug in scripted decoders.
//
//   SequenceEncoder → source batch in, one state per element out
//   StepDecoder     → (previous token, state) in,
//                     (log-probabilities, next state) out
//   CorpusSource    → where sentence pairs come from
//   Translator      → sentence in, ranked translations out

use anyhow::Result;

use crate::domain::sentence_pair::SentencePair;
use crate::domain::tokens::TokenId;

// ─── SequenceEncoder ──────────────────────────────────────────────────────────
/// Maps a batch of source sequences to one context state per batch element.
///
/// The state type is opaque to callers beyond "can be handed to a
/// `StepDecoder` and cloned".
pub trait SequenceEncoder {
    /// Batched source representation (e.g. a padded id tensor)
    type Input;

    /// Per-element context state
    type State: Clone;

    /// Encode the batch. The returned Vec has one entry per batch element,
    /// in batch order.
    fn encode(&self, input: Self::Input) -> Result<Vec<Self::State>>;
}

// ─── StepDecoder ──────────────────────────────────────────────────────────────
/// Result of advancing one hypothesis by one token.
#[derive(Debug, Clone)]
pub struct StepOutput<S> {
    /// Natural-log probabilities over the whole output vocabulary
    pub log_probs: Vec<f32>,

    /// Recurrent state after consuming the input token
    pub state: S,
}

/// Predicts the next-token distribution from a single token plus a state.
///
/// `step` is always called with all currently active hypotheses at once so
/// an implementation can run them as one batch. States are read-only input;
/// every output row carries a freshly produced state.
pub trait StepDecoder {
    type State: Clone;

    /// Number of entries in every `log_probs` vector
    fn vocab_size(&self) -> usize;

    /// Advance `tokens.len()` hypotheses by one step.
    /// `tokens[i]` is the last token emitted by hypothesis `i` and
    /// `states[i]` the state it carries. Must return exactly one output
    /// per input, in the same order.
    fn step(
        &self,
        tokens: &[TokenId],
        states: &[&Self::State],
    ) -> Result<Vec<StepOutput<Self::State>>>;
}

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Anything that can provide aligned sentence pairs for a named split
/// ("train", "val", "test", ...).
pub trait CorpusSource {
    /// Returns Ok(None) when the split does not exist at this source.
    fn load_split(&self, split: &str) -> Result<Option<Vec<SentencePair>>>;
}

// ─── Translator ───────────────────────────────────────────────────────────────
/// Any component that turns a source sentence into ranked translations.
pub trait Translator {
    /// Best-first list of (translation, score) pairs
    fn translate(&self, sentence: &str) -> Result<Vec<(String, f32)>>;
}
