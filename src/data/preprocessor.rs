// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Cleans one corpus line before it is tokenised.
//
// Parallel corpora are line-aligned, so a "document" here is a
// single sentence: line breaks inside it are never meaningful.
//
// Cleaning steps (applied in order):
//   1. Map Unicode whitespace variants and control characters
//      to a plain space
//   2. Collapse runs of spaces into one
//   3. Trim both ends
//   4. Lowercase (the vocabulary is case-insensitive)
//
// split_words() then mirrors the tokenizer's Whitespace
// pre-tokenizer: runs of word characters and runs of
// punctuation become separate words, e.g.
//   "a dog's ball." → ["a", "dog", "'", "s", "ball", "."]
// Using the same rule for vocabulary counting and for
// encoding keeps both sides of the tokenizer consistent.

pub struct Preprocessor {
    lowercase: bool,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self { lowercase: true }
    }

    /// Keep the original casing
    pub fn preserving_case() -> Self {
        Self { lowercase: false }
    }

    /// Clean a raw corpus line.
    pub fn clean(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last_space = true;

        for c in text.chars() {
            let c = match c {
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_whitespace() || c.is_control() => ' ',
                c => c,
            };
            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        let trimmed = out.trim_end();
        if self.lowercase {
            trimmed.to_lowercase()
        } else {
            trimmed.to_string()
        }
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Split into word runs and punctuation runs, dropping whitespace.
pub fn split_words(text: &str) -> Vec<&str> {
    #[derive(PartialEq, Clone, Copy)]
    enum Class {
        Word,
        Punct,
        Space,
    }
    let class = |c: char| {
        if c.is_alphanumeric() || c == '_' {
            Class::Word
        } else if c.is_whitespace() {
            Class::Space
        } else {
            Class::Punct
        }
    };

    let mut words = Vec::new();
    let mut start: Option<(usize, Class)> = None;

    for (i, c) in text.char_indices() {
        let k = class(c);
        match start {
            Some((_, current)) if current == k => {}
            Some((s, _)) => {
                words.push(&text[s..i]);
                start = (k != Class::Space).then_some((i, k));
            }
            None => {
                start = (k != Class::Space).then_some((i, k));
            }
        }
    }
    if let Some((s, _)) = start {
        words.push(&text[s..]);
    }
    words
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_multiple_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("zwei   hunde"), "zwei hunde");
    }

    #[test]
    fn test_trims_and_lowercases() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  Ein Mann läuft.  "), "ein mann läuft.");
    }

    #[test]
    fn test_preserving_case() {
        let p = Preprocessor::preserving_case();
        assert_eq!(p.clean("Ein  Mann"), "Ein Mann");
    }

    #[test]
    fn test_removes_control_chars_and_line_breaks() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("a\x01b\r\nc\u{00A0}d"), "a b c d");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
        assert_eq!(p.clean("   "), "");
    }

    #[test]
    fn test_split_words_separates_punctuation() {
        assert_eq!(
            split_words("a dog's ball."),
            vec!["a", "dog", "'", "s", "ball", "."]
        );
    }

    #[test]
    fn test_split_words_keeps_punctuation_runs_together() {
        assert_eq!(split_words("wow!?  ok"), vec!["wow", "!?", "ok"]);
        assert!(split_words("   ").is_empty());
    }
}
