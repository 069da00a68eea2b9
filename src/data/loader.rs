// ============================================================
// Layer 4 — Parallel Corpus Loader
// ============================================================
// Reads a line-aligned parallel corpus from a directory, in the
// Multi30k layout:
//
//   data/multi30k/
//     train.de   train.en
//     val.de     val.en
//     test.de    test.en
//
// Line N of `{split}.{src}` translates line N of `{split}.{trg}`.
// Each line is cleaned and lowercased by the Preprocessor;
// pairs where either side ends up blank are skipped (with a
// count logged), but a line-count mismatch is a hard error
// because every later pair would be misaligned.
//
// Implements the CorpusSource trait from Layer 3.

use anyhow::{bail, Context, Result};
use std::{fs, path::PathBuf};

use crate::data::preprocessor::Preprocessor;
use crate::domain::sentence_pair::SentencePair;
use crate::domain::traits::CorpusSource;

pub struct ParallelCorpusLoader {
    dir:          PathBuf,
    src_lang:     String,
    trg_lang:     String,
    preprocessor: Preprocessor,
}

impl ParallelCorpusLoader {
    pub fn new(
        dir:      impl Into<PathBuf>,
        src_lang: impl Into<String>,
        trg_lang: impl Into<String>,
    ) -> Self {
        Self {
            dir:          dir.into(),
            src_lang:     src_lang.into(),
            trg_lang:     trg_lang.into(),
            preprocessor: Preprocessor::new(),
        }
    }

    fn split_path(&self, split: &str, lang: &str) -> PathBuf {
        self.dir.join(format!("{split}.{lang}"))
    }

    fn read_lines(&self, split: &str, lang: &str) -> Result<Vec<String>> {
        let path = self.split_path(split, lang);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read corpus file '{}'", path.display()))?;
        Ok(text.lines().map(|l| self.preprocessor.clean(l)).collect())
    }
}

impl CorpusSource for ParallelCorpusLoader {
    fn load_split(&self, split: &str) -> Result<Option<Vec<SentencePair>>> {
        let src_path = self.split_path(split, &self.src_lang);
        let trg_path = self.split_path(split, &self.trg_lang);
        if !src_path.exists() && !trg_path.exists() {
            return Ok(None);
        }

        let sources = self.read_lines(split, &self.src_lang)?;
        let targets = self.read_lines(split, &self.trg_lang)?;
        if sources.len() != targets.len() {
            bail!(
                "Split '{}' is misaligned: {} has {} lines but {} has {}",
                split,
                src_path.display(),
                sources.len(),
                trg_path.display(),
                targets.len(),
            );
        }

        let total = sources.len();
        let pairs: Vec<SentencePair> = sources
            .into_iter()
            .zip(targets)
            .map(|(s, t)| SentencePair::new(s, t))
            .filter(SentencePair::is_valid)
            .collect();

        if pairs.len() < total {
            tracing::warn!(
                "Split '{}': skipped {} pairs with a blank side",
                split,
                total - pairs.len()
            );
        }
        tracing::info!("Loaded {} sentence pairs from split '{}'", pairs.len(), split);
        Ok(Some(pairs))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &std::path::Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_loads_aligned_pairs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "train.de", "Ein Hund.\nZwei  Katzen\n");
        write(dir.path(), "train.en", "A dog.\nTwo cats\n");

        let loader = ParallelCorpusLoader::new(dir.path(), "de", "en");
        let pairs = loader.load_split("train").unwrap().unwrap();
        assert_eq!(pairs, vec![
            SentencePair::new("ein hund.", "a dog."),
            SentencePair::new("zwei katzen", "two cats"),
        ]);
    }

    #[test]
    fn test_skips_blank_pairs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "test.de", "ein hund\n   \nein ball\n");
        write(dir.path(), "test.en", "a dog\nsomething\na ball\n");

        let loader = ParallelCorpusLoader::new(dir.path(), "de", "en");
        let pairs = loader.load_split("test").unwrap().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].target, "a ball");
    }

    #[test]
    fn test_missing_split_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ParallelCorpusLoader::new(dir.path(), "de", "en");
        assert!(loader.load_split("val").unwrap().is_none());
    }

    #[test]
    fn test_misaligned_split_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "train.de", "a\nb\n");
        write(dir.path(), "train.en", "a\n");
        let loader = ParallelCorpusLoader::new(dir.path(), "de", "en");
        let err = loader.load_split("train").unwrap_err();
        assert!(err.to_string().contains("misaligned"));
    }

    #[test]
    fn test_one_sided_split_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "val.de", "a\n");
        let loader = ParallelCorpusLoader::new(dir.path(), "de", "en");
        assert!(loader.load_split("val").is_err());
    }
}
