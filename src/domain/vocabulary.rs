// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// A frozen, bijective mapping between tokens and dense ids.
//
//   id 0  <unk>  — any token outside the vocabulary
//   id 1  <eos>  — end of a reply; stops decoding
//   id 2  <go>   — first decoder input, before anything was produced
//   id 3… corpus tokens, most frequent first
//
// Corpus tokens are chosen by walking frequency buckets from the
// highest count down. Inside one bucket tokens are visited in
// lexicographic order, so the result never depends on the
// iteration order of the frequency map.
//
// Reference: Rust Book §8 (Hash Maps)

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const UNKNOWN_ID: usize = 0;
pub const END_OF_SEQUENCE_ID: usize = 1;
pub const START_OF_DECODING_ID: usize = 2;

pub const UNKNOWN_TOKEN: &str = "<unk>";
pub const END_OF_SEQUENCE_TOKEN: &str = "<eos>";
pub const START_OF_DECODING_TOKEN: &str = "<go>";

/// Reserved tokens in id order.
pub const RESERVED_TOKENS: [&str; 3] = [UNKNOWN_TOKEN, END_OF_SEQUENCE_TOKEN, START_OF_DECODING_TOKEN];

/// Token ↔ id lookup in both directions.
///
/// Serialised as the plain id-ordered token list; the forward
/// index is rebuilt (and validated) on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct Vocabulary {
    /// Reverse map: position = id
    tokens: Vec<String>,
    /// Forward map: token → id
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// A vocabulary holding only the three reserved tokens.
    pub fn reserved_only() -> Self {
        let mut vocab = Self { tokens: Vec::new(), index: HashMap::new() };
        for token in RESERVED_TOKENS {
            vocab.insert(token);
        }
        vocab
    }

    /// Build the vocabulary from corpus token frequencies.
    ///
    /// At most `max_corpus_tokens` tokens are added on top of the
    /// reserved ones. A corpus token spelled like a reserved token
    /// is skipped and does not count against the ceiling.
    pub fn build(freqs: &HashMap<String, u64>, max_corpus_tokens: usize) -> Self {
        let mut vocab = Self::reserved_only();

        // ── Group by frequency, highest first, tokens sorted per bucket ──────
        let mut buckets: BTreeMap<Reverse<u64>, BTreeSet<&str>> = BTreeMap::new();
        for (token, &count) in freqs {
            buckets.entry(Reverse(count)).or_default().insert(token.as_str());
        }

        let mut added = 0usize;
        'buckets: for tokens in buckets.values() {
            for token in tokens {
                if added >= max_corpus_tokens {
                    break 'buckets;
                }
                if vocab.insert(token) {
                    added += 1;
                }
            }
        }

        tracing::debug!(
            "Vocabulary built: {} corpus tokens out of {} distinct",
            added,
            freqs.len()
        );
        vocab
    }

    /// Adds `token` with the next free id. Returns false if it was
    /// already present. Both lookup directions change together.
    fn insert(&mut self, token: &str) -> bool {
        if self.index.contains_key(token) {
            return false;
        }
        let id = self.tokens.len();
        self.tokens.push(token.to_string());
        self.index.insert(token.to_string(), id);
        true
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn id(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Id for `token`, falling back to `<unk>`.
    pub fn id_or_unknown(&self, token: &str) -> usize {
        self.id(token).unwrap_or(UNKNOWN_ID)
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    /// Render a sequence of ids, one token per id, joined by spaces.
    /// Ids outside the vocabulary render as `<unk>`.
    pub fn render(&self, ids: &[usize]) -> String {
        ids.iter()
            .map(|&id| self.token(id).unwrap_or(UNKNOWN_TOKEN))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Tokens in id order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.tokens
    }
}

impl TryFrom<Vec<String>> for Vocabulary {
    type Error = String;

    fn try_from(tokens: Vec<String>) -> Result<Self, Self::Error> {
        for (id, reserved) in RESERVED_TOKENS.iter().enumerate() {
            match tokens.get(id) {
                Some(token) if token == reserved => {}
                other => {
                    return Err(format!(
                        "vocabulary id {id} must be '{reserved}', found {other:?}"
                    ))
                }
            }
        }
        let mut vocab = Self { tokens: Vec::with_capacity(tokens.len()), index: HashMap::new() };
        for token in &tokens {
            if !vocab.insert(token) {
                return Err(format!("duplicate vocabulary token '{token}'"));
            }
        }
        Ok(vocab)
    }
}
