use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::sentence_pair::SentencePair;
use crate::domain::tokens::{SpecialTokens, TokenId};
use crate::infra::tokenizer_store::Vocabulary;

/// One tokenised sentence pair. Both sides are framed
/// `<sos> … <eos>`; padding happens later, per batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationSample {
    pub src_ids: Vec<TokenId>,
    pub trg_ids: Vec<TokenId>,
}

impl TranslationSample {
    /// Encode a pair. With `reverse_source` the source words are
    /// reversed before framing (Sutskever et al., 2014).
    pub fn encode(
        pair:           &SentencePair,
        src_vocab:      &Vocabulary,
        trg_vocab:      &Vocabulary,
        reverse_source: bool,
    ) -> Result<Self> {
        let mut src = src_vocab.encode(&pair.source)?;
        if reverse_source {
            src.reverse();
        }
        let trg = trg_vocab.encode(&pair.target)?;
        Ok(Self {
            src_ids: frame(src, src_vocab.special_tokens()),
            trg_ids: frame(trg, trg_vocab.special_tokens()),
        })
    }
}

pub(crate) fn frame(ids: Vec<TokenId>, special: SpecialTokens) -> Vec<TokenId> {
    let mut framed = Vec::with_capacity(ids.len() + 2);
    framed.push(special.sos);
    framed.extend(ids);
    framed.push(special.eos);
    framed
}

/// Encode every pair of a split.
pub fn encode_pairs(
    pairs:          &[SentencePair],
    src_vocab:      &Vocabulary,
    trg_vocab:      &Vocabulary,
    reverse_source: bool,
) -> Result<Vec<TranslationSample>> {
    pairs
        .iter()
        .map(|p| TranslationSample::encode(p, src_vocab, trg_vocab, reverse_source))
        .collect()
}

pub struct TranslationDataset {
    samples: Vec<TranslationSample>,
}

impl TranslationDataset {
    pub fn new(samples: Vec<TranslationSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<TranslationSample> for TranslationDataset {
    fn get(&self, index: usize) -> Option<TranslationSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
