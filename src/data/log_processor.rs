// ============================================================
// Layer 4 — Log Processor
// ============================================================
// Reads the dialog corpus and turns utterances into tokens and
// then into vocabulary ids.
//
// Corpus line format (Cornell movie dialogs):
//
//   L1045 +++$+++ u0 +++$+++ m0 +++$+++ BIANCA +++$+++ They do not!
//   └ line ┘      └user┘     └movie┘    └ name ┘       └ utterance ┘
//
// Only the fifth field is used. Punctuation characters become
// tokens of their own, everything else is split on whitespace:
//
//   "They do not!"  →  ["they", "do", "not", "!"]
//
// Reference: Rust Book §8 (Strings), §12 (I/O)

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::data::preprocessor::Preprocessor;
use crate::domain::corpus::EncodedLine;
use crate::domain::vocabulary::{Vocabulary, UNKNOWN_ID};

pub const FIELD_DELIMITER: &str = " +++$+++ ";
const UTTERANCE_FIELD: usize = 4;

/// Characters that always form a token by themselves.
pub const SPECIALS: &str = "!\"#$;%^:?*()[]{}<>«»,.–—=+…-\\/_&";

/// Why a line of user input cannot be fed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    TooLong { tokens: usize, limit: usize },
    NoKnownWords,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => write!(f, "Nothing to reply to, try again."),
            Rejection::TooLong { tokens, limit } => {
                write!(f, "That line has {tokens} tokens, at most {limit} fit. Try a shorter one.")
            }
            Rejection::NoKnownWords => write!(f, "No known words in that line, try again."),
        }
    }
}

pub struct LogProcessor {
    /// Maximum tokens per stored line
    row_size: usize,
    preprocessor: Preprocessor,
}

impl LogProcessor {
    pub fn new(row_size: usize) -> Self {
        Self { row_size, preprocessor: Preprocessor::new() }
    }

    /// Extract the utterance field from one raw corpus line.
    pub fn parse_line(raw: &str) -> Option<&str> {
        raw.splitn(UTTERANCE_FIELD + 1, FIELD_DELIMITER).nth(UTTERANCE_FIELD)
    }

    /// Clean and split an utterance into tokens.
    pub fn tokenize(&self, utterance: &str) -> Vec<String> {
        let cleaned    = self.preprocessor.clean(utterance);
        let mut tokens = Vec::new();
        let mut word   = String::new();

        for c in cleaned.chars() {
            if SPECIALS.contains(c) {
                if !word.is_empty() {
                    tokens.push(std::mem::take(&mut word));
                }
                tokens.push(c.to_string());
            } else if c == ' ' {
                if !word.is_empty() {
                    tokens.push(std::mem::take(&mut word));
                }
            } else {
                word.push(c);
            }
        }
        if !word.is_empty() {
            tokens.push(word);
        }
        tokens
    }

    /// Read and tokenize every usable line of the corpus file.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; lines without
    /// an utterance field or with an empty utterance are skipped.
    pub fn read_corpus(&self, path: &Path) -> Result<Vec<Vec<String>>> {
        let file = File::open(path)
            .with_context(|| format!("Cannot open corpus file '{}'", path.display()))?;
        let reader = BufReader::new(file);

        let mut lines   = Vec::new();
        let mut skipped = 0usize;
        for raw in reader.split(b'\n') {
            let raw  = raw.with_context(|| format!("Cannot read corpus file '{}'", path.display()))?;
            let text = String::from_utf8_lossy(&raw);
            let tokens = Self::parse_line(text.trim_end_matches('\r'))
                .map(|utterance| self.tokenize(utterance))
                .unwrap_or_default();
            if tokens.is_empty() {
                skipped += 1;
            } else {
                lines.push(tokens);
            }
        }

        tracing::info!(
            "Read {} utterances from '{}' ({} lines skipped)",
            lines.len(),
            path.display(),
            skipped
        );
        Ok(lines)
    }

    /// Token frequencies over all tokenized lines.
    pub fn count_frequencies(lines: &[Vec<String>]) -> HashMap<String, u64> {
        let mut freq: HashMap<String, u64> = HashMap::new();
        for token in lines.iter().flatten() {
            *freq.entry(token.clone()).or_insert(0) += 1;
        }
        freq
    }

    /// Map tokens to ids. `None` if the line is empty or does not
    /// leave room for `<eos>` within one row.
    pub fn encode(&self, tokens: &[String], vocab: &Vocabulary) -> Option<EncodedLine> {
        if tokens.is_empty() || tokens.len() >= self.row_size {
            return None;
        }
        Some(tokens.iter().map(|t| vocab.id_or_unknown(t)).collect())
    }

    /// Encode all lines, dropping the ones `encode` rejects.
    pub fn encode_all(&self, lines: &[Vec<String>], vocab: &Vocabulary) -> Vec<EncodedLine> {
        lines.iter().filter_map(|tokens| self.encode(tokens, vocab)).collect()
    }

    /// Encode raw user input. Also rejects input where no token is
    /// known to the vocabulary.
    pub fn encode_interactive(&self, text: &str, vocab: &Vocabulary) -> Result<EncodedLine, Rejection> {
        let tokens = self.tokenize(text);
        if tokens.is_empty() {
            return Err(Rejection::Empty);
        }
        let Some(line) = self.encode(&tokens, vocab) else {
            return Err(Rejection::TooLong { tokens: tokens.len(), limit: self.row_size.saturating_sub(1) });
        };
        if line.iter().all(|&id| id == UNKNOWN_ID) {
            return Err(Rejection::NoKnownWords);
        }
        Ok(line)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn vocab_of(tokens: &[&str]) -> Vocabulary {
        let freqs = tokens.iter().map(|t| (t.to_string(), 1u64)).collect();
        Vocabulary::build(&freqs, 100)
    }

    #[test]
    fn test_parse_line_takes_fifth_field() {
        let raw = "L1045 +++$+++ u0 +++$+++ m0 +++$+++ BIANCA +++$+++ They do not!";
        assert_eq!(LogProcessor::parse_line(raw), Some("They do not!"));
        assert_eq!(LogProcessor::parse_line("no delimiters here"), None);
    }

    #[test]
    fn test_parse_line_keeps_delimiter_inside_utterance() {
        let raw = "L1 +++$+++ u0 +++$+++ m0 +++$+++ A +++$+++ odd +++$+++ text";
        assert_eq!(LogProcessor::parse_line(raw), Some("odd +++$+++ text"));
    }

    #[test]
    fn test_tokenize_splits_specials() {
        let p = LogProcessor::new(40);
        assert_eq!(p.tokenize("They do not!"), vec!["they", "do", "not", "!"]);
        assert_eq!(p.tokenize("well...ok"), vec!["well", ".", ".", ".", "ok"]);
        assert_eq!(p.tokenize("don't"), vec!["don't"]);
    }

    #[test]
    fn test_tokenize_splits_on_unicode_spaces() {
        let p = LogProcessor::new(40);
        assert_eq!(p.tokenize("hi\u{2003}there"), vec!["hi", "there"]);
    }

    #[test]
    fn test_encode_maps_unknown_and_bounds_length() {
        let p     = LogProcessor::new(4);
        let vocab = vocab_of(&["hi", "there"]);
        let hi    = vocab.id("hi").unwrap();
        let line  = p.encode(&["hi".into(), "stranger".into()], &vocab);
        assert_eq!(line, Some(vec![hi, UNKNOWN_ID]));
        // 4 tokens do not fit a row of 4 once <eos> is appended
        let long: Vec<String> = ["hi"; 4].iter().map(|s| s.to_string()).collect();
        assert_eq!(p.encode(&long, &vocab), None);
        assert_eq!(p.encode(&[], &vocab), None);
    }

    #[test]
    fn test_encode_interactive_rejects_all_unknown() {
        let p     = LogProcessor::new(40);
        let vocab = vocab_of(&["hello"]);
        assert_eq!(p.encode_interactive("qwerty asdf", &vocab), Err(Rejection::NoKnownWords));
        assert_eq!(p.encode_interactive("   ", &vocab), Err(Rejection::Empty));
        assert!(p.encode_interactive("Hello qwerty", &vocab).is_ok());
    }

    #[test]
    fn test_encode_interactive_reports_overlong_input() {
        let p     = LogProcessor::new(4);
        let vocab = vocab_of(&["hello"]);
        assert_eq!(
            p.encode_interactive("hello hello hello hello", &vocab),
            Err(Rejection::TooLong { tokens: 4, limit: 3 })
        );
        assert!(p.encode_interactive("hello hello hello", &vocab).is_ok());
    }

    #[test]
    fn test_read_corpus_and_frequencies() {
        let dir  = std::env::temp_dir().join("seq2seq_chat_test_corpus");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("movie_lines.txt");
        let mut bytes = b"L1 +++$+++ u0 +++$+++ m0 +++$+++ A +++$+++ Hi there!\r\n".to_vec();
        bytes.extend_from_slice(b"broken line\n");
        bytes.extend_from_slice(b"L2 +++$+++ u1 +++$+++ m0 +++$+++ B +++$+++ hi \xff\n");
        bytes.extend_from_slice(b"L3 +++$+++ u1 +++$+++ m0 +++$+++ B +++$+++ \n");
        fs::write(&path, bytes).unwrap();

        let p     = LogProcessor::new(40);
        let lines = p.read_corpus(&path).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], vec!["hi", "there", "!"]);
        assert_eq!(lines[1], vec!["hi", "\u{FFFD}"]);

        let freqs = LogProcessor::count_frequencies(&lines);
        assert_eq!(freqs.get("hi"), Some(&2));
        assert_eq!(freqs.get("!"), Some(&1));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_corpus_is_an_error() {
        let p = LogProcessor::new(40);
        assert!(p.read_corpus(Path::new("/nonexistent/movie_lines.txt")).is_err());
    }
}
