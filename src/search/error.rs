//! Errors raised by the decoding core.

use thiserror::Error;

/// Everything that can stop a decode call.
///
/// Configuration problems are detected before the first decoder call;
/// the other variants surface mid-decode and abort the whole batch.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search configuration: {0}")]
    InvalidConfig(String),

    #[error("batch element {batch_index} has no active hypotheses")]
    NoActiveHypotheses { batch_index: usize },

    #[error("batch element {batch_index}: decoder returned invalid log-probabilities ({reason})")]
    InvalidLogProbs { batch_index: usize, reason: String },

    #[error("decoder returned {actual} outputs for {expected} inputs")]
    DecoderOutputMismatch { expected: usize, actual: usize },

    #[error("step decoder failed: {0}")]
    Decoder(#[from] anyhow::Error),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, SearchError>;
