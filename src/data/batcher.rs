// ============================================================
// Layer 4 — Translation Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<TranslationSample>
// into padded Int tensors.
//
// Dynamic padding:
//   Sentences differ in length, so each batch is padded with
//   <pad> only up to its own longest source / target:
//
//     src  [batch, max_src_len]
//     trg  [batch, max_trg_len]
//
//   The loss ignores <pad> targets, and evaluation strips them
//   before scoring, so padding never leaks into the metrics.
//
// The unpadded target ids are kept alongside the tensors; the
// evaluator needs them as BLEU references.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TranslationSample;
use crate::domain::tokens::TokenId;

// ─── TranslationBatch ─────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TranslationBatch<B: Backend> {
    /// Source ids — shape: [batch_size, max_src_len]
    pub src: Tensor<B, 2, Int>,

    /// Target ids — shape: [batch_size, max_trg_len]
    pub trg: Tensor<B, 2, Int>,

    /// Unpadded target ids, one Vec per sample
    pub trg_ids: Vec<Vec<TokenId>>,
}

// ─── TranslationBatcher ───────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct TranslationBatcher<B: Backend> {
    pub device: B::Device,
    pub pad:    TokenId,
}

impl<B: Backend> TranslationBatcher<B> {
    pub fn new(device: B::Device, pad: TokenId) -> Self {
        Self { device, pad }
    }

    /// Pad `rows` to a common length and build a [rows, len] tensor
    fn pad_to_tensor<'a>(&self, rows: impl Iterator<Item = &'a [TokenId]> + Clone) -> Tensor<B, 2, Int> {
        let batch_size = rows.clone().count();
        let max_len    = rows.clone().map(<[TokenId]>::len).max().unwrap_or(0);

        let flat: Vec<i32> = rows
            .flat_map(|r| {
                r.iter()
                    .copied()
                    .chain(std::iter::repeat(self.pad).take(max_len - r.len()))
                    .map(|id| id as i32)
            })
            .collect();

        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([batch_size, max_len])
    }
}

impl<B: Backend> Batcher<TranslationSample, TranslationBatch<B>> for TranslationBatcher<B> {
    fn batch(&self, items: Vec<TranslationSample>) -> TranslationBatch<B> {
        let src = self.pad_to_tensor(items.iter().map(|s| s.src_ids.as_slice()));
        let trg = self.pad_to_tensor(items.iter().map(|s| s.trg_ids.as_slice()));
        let trg_ids = items.into_iter().map(|s| s.trg_ids).collect();

        TranslationBatch { src, trg, trg_ids }
    }
}
