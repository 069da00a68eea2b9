// ============================================================
// Layer 3b — Search
// ============================================================
// Turns a step-wise decoder into ranked output sentences.
// Nothing in here knows about tensors: the model is reached
// only through the StepDecoder trait, so every piece can be
// driven by a scripted decoder in tests.
//
//   hypothesis.rs — one partial / finished output sequence
//   beam.rs       — per-element beams + pruning order
//   decoder.rs    — the batched beam search loop
//   greedy.rs     — arg-max decoding (beam width 1)
//   config.rs     — search parameters, length normalisation
//   error.rs      — SearchError

pub mod beam;
pub mod config;
pub mod decoder;
pub mod error;
pub mod greedy;
pub mod hypothesis;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{BeamSearchConfig, LengthNormalization};
pub use decoder::BeamSearchDecoder;
pub use greedy::greedy_decode;
pub use hypothesis::CompletedHypothesis;
