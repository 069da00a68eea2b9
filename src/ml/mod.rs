// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here. The search layer never sees a
// tensor; it talks to the decoder through BurnStepDecoder.
//
//   backend.rs    — Autodiff<Wgpu> for training, Wgpu otherwise
//   model.rs      — embedding + stacked LSTM/GRU encoder and
//                   decoder, teacher-forced loss
//   generation.rs — StepDecoder over the burn decoder, plus
//                   generate() for beam search and greedy
//   evaluator.rs  — BLEU over a data loader
//   trainer.rs    — epoch loop, validation, checkpoints
//   inferencer.rs — rebuild a checkpoint and decode sentences
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Sutskever et al. (2014) Sequence to Sequence Learning

pub mod backend;

/// Encoder-decoder architecture
pub mod model;

pub mod generation;

pub mod evaluator;

/// Training loop with validation and checkpointing
pub mod trainer;

pub mod inferencer;
