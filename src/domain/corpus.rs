// ============================================================
// Layer 3 — Corpus of Encoded Lines
// ============================================================
// The in-memory, ordered list of vocabulary-encoded dialog
// lines. Built once during preprocessing and read-only after.
//
// Consecutive lines form a training pair: line i is the input
// and line i + 1 is the reply the model should learn to give.

use rand::Rng;

/// One dialog utterance as vocabulary ids.
pub type EncodedLine = Vec<usize>;

/// Input line and the reply that followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogPair {
    pub input: EncodedLine,
    pub reply: EncodedLine,
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    lines: Vec<EncodedLine>,
}

impl Corpus {
    pub fn new(lines: Vec<EncodedLine>) -> Self {
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&EncodedLine> {
        self.lines.get(index)
    }

    /// Number of (input, reply) pairs.
    pub fn pair_count(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }

    /// The pair starting at line `index`.
    pub fn pair(&self, index: usize) -> Option<DialogPair> {
        let input = self.lines.get(index)?;
        let reply = self.lines.get(index + 1)?;
        Some(DialogPair { input: input.clone(), reply: reply.clone() })
    }

    /// Uniformly chosen line, `None` for an empty corpus.
    pub fn random_line<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&EncodedLine> {
        if self.lines.is_empty() {
            return None;
        }
        self.lines.get(rng.gen_range(0..self.lines.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_pairs_are_consecutive_lines() {
        let corpus = Corpus::new(vec![vec![3], vec![4, 5], vec![6]]);
        assert_eq!(corpus.pair_count(), 2);
        assert_eq!(corpus.pair(0), Some(DialogPair { input: vec![3], reply: vec![4, 5] }));
        assert_eq!(corpus.pair(1), Some(DialogPair { input: vec![4, 5], reply: vec![6] }));
        assert_eq!(corpus.pair(2), None);
    }

    #[test]
    fn test_random_line_on_empty_corpus() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(Corpus::default().random_line(&mut rng).is_none());
        assert_eq!(Corpus::default().pair_count(), 0);
    }

    #[test]
    fn test_random_line_comes_from_corpus() {
        let corpus = Corpus::new(vec![vec![3], vec![4]]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let line = corpus.random_line(&mut rng).unwrap();
            assert!(line == &vec![3] || line == &vec![4]);
        }
    }
}
