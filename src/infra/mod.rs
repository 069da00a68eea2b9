// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence and scoring shared by several layers:
//
//   checkpoint.rs      — model weights (CompactRecorder), the
//                        saved TrainConfig and training history
//   tokenizer_store.rs — word-level tokenizer JSON per language,
//                        built once from the training split
//   metrics.rs         — metrics.csv, one row per epoch
//   bleu.rs            — sentence-level BLEU-4
//
// Reference: Burn Book §5 (Checkpointing)
//            Papineni et al. (2002) BLEU

pub mod checkpoint;

/// Vocabulary building, saving, and loading
pub mod tokenizer_store;

pub mod metrics;

pub mod bleu;
