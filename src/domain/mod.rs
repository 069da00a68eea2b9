// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain types and traits shared by every other layer.
// Nothing in here depends on burn or on the filesystem.
//
//   tokens.rs        — TokenId and the reserved special tokens
//   sentence_pair.rs — one aligned source/target pair
//   traits.rs        — SequenceEncoder, StepDecoder, CorpusSource,
//                      Translator

pub mod tokens;

pub mod sentence_pair;

pub mod traits;
