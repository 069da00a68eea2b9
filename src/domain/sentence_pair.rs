use serde::{Deserialize, Serialize};

/// One aligned (source, target) sentence pair from a parallel corpus.
/// Both sides are already cleaned and lowercased by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentencePair {
    pub source: String,
    pub target: String,
}

impl SentencePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self { source: source.into(), target: target.into() }
    }

    /// A pair is usable only if neither side is blank
    pub fn is_valid(&self) -> bool {
        !self.source.trim().is_empty() && !self.target.trim().is_empty()
    }
}
