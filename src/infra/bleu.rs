// ============================================================
// Layer 6 — BLEU
// ============================================================
// Sentence-level BLEU-4 (Papineni et al., 2002):
//
//   BLEU = BP · exp( Σ_n 1/4 · ln p_n ),  n = 1..4
//
//   p_n  modified n-gram precision: each hypothesis n-gram is
//        counted at most as often as it appears in any single
//        reference
//   BP   brevity penalty against the reference whose length is
//        closest to the hypothesis (shorter one on ties)
//
// Orders with no match would zero the whole score, so they get
// epsilon smoothing: p_n = 0.1 / total_n.

use std::collections::HashMap;

const MAX_ORDER: usize = 4;
const EPSILON: f64 = 0.1;

fn ngram_counts<S: AsRef<str>>(words: &[S], n: usize) -> HashMap<Vec<&str>, usize> {
    let mut counts = HashMap::new();
    if words.len() >= n {
        for window in words.windows(n) {
            let key: Vec<&str> = window.iter().map(AsRef::as_ref).collect();
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    counts
}

fn closest_ref_len<S: AsRef<str>>(references: &[Vec<S>], hyp_len: usize) -> usize {
    references
        .iter()
        .map(Vec::len)
        .min_by_key(|&r| (r.abs_diff(hyp_len), r))
        .unwrap_or(0)
}

/// BLEU-4 of `hypothesis` against `references`, in [0, 1].
pub fn sentence_bleu<S: AsRef<str>, T: AsRef<str>>(references: &[Vec<S>], hypothesis: &[T]) -> f64 {
    let hyp_len = hypothesis.len();
    if hyp_len == 0 || references.is_empty() {
        return 0.0;
    }

    let mut log_precision = 0.0;
    for n in 1..=MAX_ORDER {
        let hyp_counts = ngram_counts(hypothesis, n);
        let total: usize = hyp_counts.values().sum();

        let mut max_ref: HashMap<Vec<&str>, usize> = HashMap::new();
        for reference in references {
            for (gram, count) in ngram_counts(reference, n) {
                let slot = max_ref.entry(gram).or_insert(0);
                *slot = (*slot).max(count);
            }
        }

        let matched: usize = hyp_counts
            .iter()
            .map(|(gram, &count)| count.min(max_ref.get(gram).copied().unwrap_or(0)))
            .sum();

        let denominator = total.max(1) as f64;
        let precision = if matched == 0 {
            EPSILON / denominator
        } else {
            matched as f64 / denominator
        };
        log_precision += precision.ln() / MAX_ORDER as f64;
    }

    let ref_len = closest_ref_len(references, hyp_len);
    let brevity = if hyp_len > ref_len {
        1.0
    } else {
        (1.0 - ref_len as f64 / hyp_len as f64).exp()
    };

    brevity * log_precision.exp()
}
