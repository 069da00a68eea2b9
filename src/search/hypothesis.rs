use crate::domain::tokens::TokenId;

/// Why a hypothesis stopped growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The end-of-sequence token was emitted
    EndOfSequence,
    /// Decoding ran out of steps and the hypothesis was promoted as-is
    MaxLength,
}

/// An in-progress candidate output.
///
/// `tokens` always starts with the start token. The decoder state is owned
/// by this hypothesis alone; siblings that branched from the same parent
/// each hold their own clone.
#[derive(Debug, Clone)]
pub struct Hypothesis<S> {
    tokens: Vec<TokenId>,
    score: f32,
    state: S,
}

impl<S> Hypothesis<S> {
    /// The seed hypothesis: just the start token, score 0
    pub fn seed(sos: TokenId, state: S) -> Self {
        Self { tokens: vec![sos], score: 0.0, state }
    }

    /// Build the continuation `self.tokens + [token]` with the given
    /// cumulative score and the state produced for it.
    pub fn extend(&self, token: TokenId, score: f32, state: S) -> Self {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);
        tokens.extend_from_slice(&self.tokens);
        tokens.push(token);
        Self { tokens, score, state }
    }

    pub fn tokens(&self) -> &[TokenId] {
        &self.tokens
    }

    pub fn last_token(&self) -> TokenId {
        // Never empty: every hypothesis starts from `seed`.
        self.tokens[self.tokens.len() - 1]
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Finish a continuation directly, without materialising a state for it.
    pub fn complete_with(
        &self,
        token:       TokenId,
        score:       f32,
        termination: Termination,
    ) -> CompletedHypothesis {
        let mut tokens = Vec::with_capacity(self.tokens.len());
        tokens.extend_from_slice(&self.tokens[1..]);
        tokens.push(token);
        CompletedHypothesis { tokens, score, termination }
    }

    /// Freeze into a finished hypothesis. The decoder state is dropped.
    pub fn finish(self, termination: Termination) -> CompletedHypothesis {
        CompletedHypothesis {
            tokens: self.tokens.into_iter().skip(1).collect(),
            score: self.score,
            termination,
        }
    }
}

/// A finished, immutable hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedHypothesis {
    /// Emitted tokens, start token excluded, end token included if emitted
    pub tokens: Vec<TokenId>,
    /// Sum of natural-log probabilities along the path
    pub score: f32,
    pub termination: Termination,
}
