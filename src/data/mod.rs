// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Raw parallel text all the way to padded tensor batches:
//
//   {split}.{lang} files
//       │
//       ▼
//   ParallelCorpusLoader → aligned SentencePairs
//       │                  (Preprocessor cleans every line)
//       ▼
//   Vocabulary           → word ids (Layer 6)
//       │
//       ▼
//   TranslationSample    → <sos> … <eos> framed, source reversed
//       │
//       ▼
//   TranslationDataset   → Burn's Dataset trait
//       │
//       ▼
//   TranslationBatcher   → [batch, len] Int tensors, padded per batch
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads line-aligned {split}.{lang} files
pub mod loader;

pub mod preprocessor;

pub mod dataset;

pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
