// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Each use case wires the lower layers together for one CLI
// command. No model math lives here and nothing below this
// layer knows about clap.
//
//   train_use_case     — corpus → vocabularies → training run
//   evaluate_use_case  — checkpoint + split → BLEU
//   translate_use_case — checkpoint + sentence → ranked outputs

pub mod train_use_case;

pub mod evaluate_use_case;

pub mod translate_use_case;
