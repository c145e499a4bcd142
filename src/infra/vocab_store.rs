// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Persists the vocabulary next to the checkpoint so a resumed
// run and the dialog front end see the same token ids the
// weights were trained with.
//
// vocabulary.json is a plain JSON array; the array index is the
// token id:
//
//   ["<unk>", "<eos>", "<go>", ".", "you", "i", ...]
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::vocabulary::Vocabulary;

const VOCAB_FILE: &str = "vocabulary.json";

pub struct VocabularyStore {
    dir: PathBuf,
}

impl VocabularyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(VOCAB_FILE)
    }

    /// Load the saved vocabulary, or build one with `build` and
    /// save it.
    pub fn load_or_build<F>(&self, build: F) -> Result<Vocabulary>
    where
        F: FnOnce() -> Result<Vocabulary>,
    {
        if let Some(vocab) = self.load()? {
            tracing::info!("Loaded vocabulary of {} tokens from disk", vocab.len());
            return Ok(vocab);
        }
        let vocab = build()?;
        tracing::info!("Built vocabulary of {} tokens", vocab.len());
        self.save(&vocab)?;
        Ok(vocab)
    }

    /// `Ok(None)` if nothing was saved yet.
    pub fn load(&self) -> Result<Option<Vocabulary>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read vocabulary from '{}'", path.display()))?;
        let vocab = serde_json::from_str(&json)
            .with_context(|| format!("Malformed vocabulary '{}'", path.display()))?;
        Ok(Some(vocab))
    }

    pub fn save(&self, vocab: &Vocabulary) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path();
        fs::write(&path, serde_json::to_string(vocab)?)
            .with_context(|| format!("Cannot write vocabulary to '{}'", path.display()))?;
        tracing::debug!("Saved vocabulary to '{}'", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn store(name: &str) -> VocabularyStore {
        let dir = std::env::temp_dir().join(format!("seq2seq-vocab-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        VocabularyStore::new(dir)
    }

    fn sample() -> Vocabulary {
        let freqs: HashMap<String, u64> =
            [("you", 5), ("i", 3), ("?", 2)].iter().map(|&(t, c)| (t.to_string(), c)).collect();
        Vocabulary::build(&freqs, 10)
    }

    #[test]
    fn test_builds_once_then_loads() {
        let s = store("once");
        let first = s.load_or_build(|| Ok(sample())).unwrap();
        assert!(s.path().exists());

        // Second call must not rebuild
        let second = s
            .load_or_build(|| anyhow::bail!("should have loaded from disk"))
            .unwrap();
        assert_eq!(first.tokens(), second.tokens());
        let _ = fs::remove_dir_all(&s.dir);
    }

    #[test]
    fn test_rejects_file_without_reserved_tokens() {
        let s = store("bad");
        fs::create_dir_all(&s.dir).unwrap();
        fs::write(s.path(), r#"["you","i"]"#).unwrap();
        assert!(s.load().is_err());
        let _ = fs::remove_dir_all(&s.dir);
    }
}
