// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// One word-level vocabulary per language, persisted next to the
// checkpoints as `tokenizer.{lang}.json`.
//
// The tokenizer JSON is written by hand (WordLevel model,
// Lowercase normalizer, Whitespace pre-tokenizer) and loaded
// back with Tokenizer::from_file, the same way for building and
// for reloading, so training and inference always see the
// same ids.
//
// Vocabulary layout:
//   0 <unk>   1 <pad>   2 <sos>   3 <eos>
//   4..       training-split words with count >= min_freq,
//             most frequent first, ties alphabetical

use anyhow::{anyhow, Context, Result};
use std::{collections::HashMap, fs, path::PathBuf};
use tokenizers::Tokenizer;

use crate::data::preprocessor::split_words;
use crate::domain::tokens::{SpecialTokens, TokenId};

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, lang: &str) -> PathBuf {
        self.dir.join(format!("tokenizer.{lang}.json"))
    }

    /// Load the stored vocabulary for `lang`, or build it from `texts`.
    pub fn load_or_build(&self, lang: &str, texts: &[&str], min_freq: usize) -> Result<Vocabulary> {
        if self.path(lang).exists() {
            tracing::info!("Loading existing '{}' vocabulary from disk", lang);
            self.load(lang)
        } else {
            tracing::info!("Building '{}' vocabulary (min_freq={})", lang, min_freq);
            self.build_and_save(lang, texts, min_freq)
        }
    }

    pub fn load(&self, lang: &str) -> Result<Vocabulary> {
        let path = self.path(lang);
        let tokenizer = Tokenizer::from_file(&path).map_err(|e| {
            anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e)
        })?;
        Vocabulary::new(tokenizer)
    }

    fn build_and_save(&self, lang: &str, texts: &[&str], min_freq: usize) -> Result<Vocabulary> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let words = count_words(texts, min_freq);
        let mut vocab = serde_json::Map::new();
        for (id, form) in SpecialTokens::surface_forms().iter().enumerate() {
            vocab.insert(form.to_string(), serde_json::json!(id));
        }
        for word in &words {
            let next_id = vocab.len();
            vocab.entry(word.clone()).or_insert(serde_json::json!(next_id));
        }

        let added_tokens: Vec<serde_json::Value> = SpecialTokens::surface_forms()
            .iter()
            .enumerate()
            .map(|(id, form)| serde_json::json!({
                "id": id, "content": form,
                "single_word": false, "lstrip": false, "rstrip": false,
                "normalized": false, "special": true
            }))
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": { "type": "Lowercase" },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": SpecialTokens::UNK
            }
        });

        let path = self.path(lang);
        fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON '{}'", path.display()))?;

        tracing::info!(
            "'{}' vocabulary built with {} entries, saved to '{}'",
            lang,
            words.len() + SpecialTokens::surface_forms().len(),
            path.display()
        );
        self.load(lang)
    }
}

/// Words seen at least `min_freq` times, most frequent first.
fn count_words(texts: &[&str], min_freq: usize) -> Vec<String> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for word in split_words(&text.to_lowercase()) {
            *freq.entry(word.to_string()).or_insert(0) += 1;
        }
    }
    let mut words: Vec<(String, usize)> = freq
        .into_iter()
        .filter(|(_, count)| *count >= min_freq.max(1))
        .collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.into_iter().map(|(w, _)| w).collect()
}

// ─── Vocabulary ───────────────────────────────────────────────────────────────
/// A loaded tokenizer plus the ids of its reserved entries.
pub struct Vocabulary {
    tokenizer: Tokenizer,
    special:   SpecialTokens,
}

impl Vocabulary {
    fn new(tokenizer: Tokenizer) -> Result<Self> {
        let id = |form: &str| {
            tokenizer
                .token_to_id(form)
                .ok_or_else(|| anyhow!("Tokenizer has no '{form}' entry"))
        };
        let special = SpecialTokens {
            unk: id(SpecialTokens::UNK)?,
            pad: id(SpecialTokens::PAD)?,
            sos: id(SpecialTokens::SOS)?,
            eos: id(SpecialTokens::EOS)?,
        };
        Ok(Self { tokenizer, special })
    }

    pub fn special_tokens(&self) -> SpecialTokens {
        self.special
    }

    /// The reserved entries live in the model vocabulary too, so this
    /// covers every id `encode` can return.
    pub fn len(&self) -> usize {
        self.tokenizer.get_vocab_size(false)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Word ids without framing tokens
    pub fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        let enc = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
        Ok(enc.get_ids().to_vec())
    }

    /// Surface words for `ids`, with <sos>, <eos> and <pad> removed.
    /// <unk> is kept so unknown words still count as words.
    pub fn decode_words(&self, ids: &[TokenId]) -> Vec<String> {
        ids.iter()
            .filter(|&&id| !self.special.is_framing(id))
            .map(|&id| {
                self.tokenizer
                    .id_to_token(id)
                    .unwrap_or_else(|| SpecialTokens::UNK.to_string())
            })
            .collect()
    }

    pub fn decode(&self, ids: &[TokenId]) -> String {
        self.decode_words(ids).join(" ")
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: [&str; 3] = ["A dog runs.", "a dog sleeps.", "A cat runs."];

    #[test]
    fn test_count_words_orders_by_frequency_then_alphabet() {
        let words = count_words(&CORPUS, 2);
        // a:3, .:3, dog:2, runs:2 ; cat and sleeps are below min_freq
        assert_eq!(words, vec![".", "a", "dog", "runs"]);
    }

    #[test]
    fn test_specials_come_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let vocab = store.load_or_build("en", &CORPUS, 2).unwrap();
        assert_eq!(vocab.special_tokens(), SpecialTokens::default());
        assert_eq!(vocab.len(), 8);
    }

    #[test]
    fn test_encode_decode() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = TokenizerStore::new(dir.path())
            .load_or_build("en", &CORPUS, 2)
            .unwrap();

        let ids = vocab.encode("A dog sleeps.").unwrap();
        // "sleeps" fell below min_freq
        assert_eq!(ids, vec![5, 6, 0, 4]);

        let s = vocab.special_tokens();
        let mut framed = vec![s.sos];
        framed.extend(&ids);
        framed.extend([s.eos, s.pad]);
        assert_eq!(vocab.decode(&framed), "a dog <unk> .");
    }

    #[test]
    fn test_reload_gives_same_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let built = store.load_or_build("de", &CORPUS, 1).unwrap();
        let loaded = store.load("de").unwrap();
        assert_eq!(
            built.encode("a cat sleeps").unwrap(),
            loaded.encode("a cat sleeps").unwrap()
        );
        assert!(dir.path().join("tokenizer.de.json").exists());
    }
}
