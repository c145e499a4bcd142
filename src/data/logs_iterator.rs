// ============================================================
// Layer 4 — Logs Iterator (macrobatch supply)
// ============================================================
// Partitions the corpus pairs into macrobatches of minibatches
// and hands them to the training scheduler one macrobatch at a
// time.
//
//   pairs:  [p7 p2 p9 p0 p4 p1 p8 p3 p6 p5]   (shuffled order)
//   minibatch_size = 2, macrobatch_size = 2
//   macrobatch 0: [p7 p2] [p9 p0]
//   macrobatch 1: [p4 p1] [p8 p3]
//   macrobatch 2: [p6 p5]
//
// The first pass uses the order produced by the seeded RNG, so a
// resume offset given to `seek` refers to the same macrobatches
// the crashed run saw. Every later pass reshuffles.
//
// Reference: rand crate documentation (SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::corpus::{Corpus, DialogPair};
use crate::ml::scheduler::MacrobatchSupply;

pub struct LogsIterator<'a> {
    corpus:          &'a Corpus,
    minibatch_size:  usize,
    macrobatch_size: usize,
    /// Pair start indices in presentation order
    order:           Vec<usize>,
    /// Macrobatches consumed in the current pass
    position:        usize,
    passes:          usize,
    rng:             StdRng,
}

impl<'a> LogsIterator<'a> {
    pub fn new(corpus: &'a Corpus, minibatch_size: usize, macrobatch_size: usize, seed: u64) -> Self {
        let mut rng   = StdRng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..corpus.pair_count()).collect();
        order.shuffle(&mut rng);
        Self {
            corpus,
            minibatch_size:  minibatch_size.max(1),
            macrobatch_size: macrobatch_size.max(1),
            order,
            position: 0,
            passes: 0,
            rng,
        }
    }

    fn pairs_per_macrobatch(&self) -> usize {
        self.minibatch_size * self.macrobatch_size
    }
}

impl MacrobatchSupply for LogsIterator<'_> {
    type Minibatch = Vec<DialogPair>;

    fn reset(&mut self) {
        if self.passes > 0 {
            self.order.shuffle(&mut self.rng);
        }
        self.passes  += 1;
        self.position = 0;
    }

    fn seek(&mut self, macrobatch: usize) {
        self.passes  += 1;
        self.position = macrobatch.min(self.total_batches());
        tracing::info!("Resuming at macrobatch {}/{}", self.position, self.total_batches());
    }

    fn has_next_macrobatch(&self) -> bool {
        self.position < self.total_batches()
    }

    fn next_macrobatch(&mut self) {
        if self.has_next_macrobatch() {
            self.position += 1;
        }
    }

    fn batch(&self) -> usize {
        self.position
    }

    fn total_batches(&self) -> usize {
        self.order.len().div_ceil(self.pairs_per_macrobatch())
    }

    fn minibatches(&self) -> Vec<Self::Minibatch> {
        let start = self.position * self.pairs_per_macrobatch();
        let end   = (start + self.pairs_per_macrobatch()).min(self.order.len());
        if start >= end {
            return Vec::new();
        }
        self.order[start..end]
            .chunks(self.minibatch_size)
            .map(|chunk| chunk.iter().filter_map(|&i| self.corpus.pair(i)).collect())
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(lines: usize) -> Corpus {
        Corpus::new((0..lines).map(|i| vec![3 + i]).collect())
    }

    fn inputs(it: &LogsIterator) -> Vec<usize> {
        it.minibatches().iter().flatten().map(|p| p.input[0]).collect()
    }

    #[test]
    fn test_partitions_every_pair_once_per_pass() {
        let c      = corpus(11); // 10 pairs
        let mut it = LogsIterator::new(&c, 2, 2, 42);
        assert_eq!(it.total_batches(), 3);

        it.reset();
        let mut seen = Vec::new();
        let mut sizes = Vec::new();
        while it.has_next_macrobatch() {
            let mbs = it.minibatches();
            sizes.push(mbs.iter().map(Vec::len).collect::<Vec<_>>());
            seen.extend(mbs.into_iter().flatten().map(|p| p.input[0]));
            it.next_macrobatch();
        }
        assert_eq!(sizes, vec![vec![2, 2], vec![2, 2], vec![2]]);
        seen.sort_unstable();
        assert_eq!(seen, (3..13).collect::<Vec<_>>());
        assert_eq!(it.batch(), 3);
    }

    #[test]
    fn test_pairs_reply_with_next_line() {
        let c      = corpus(3);
        let mut it = LogsIterator::new(&c, 4, 1, 1);
        it.reset();
        for pair in it.minibatches().into_iter().flatten() {
            assert_eq!(pair.reply[0], pair.input[0] + 1);
        }
    }

    #[test]
    fn test_seek_matches_first_pass_order() {
        let c = corpus(21);
        let mut from_start = LogsIterator::new(&c, 2, 2, 9);
        from_start.reset();
        from_start.next_macrobatch();
        from_start.next_macrobatch();

        let mut resumed = LogsIterator::new(&c, 2, 2, 9);
        resumed.seek(2);
        assert_eq!(resumed.batch(), 2);
        assert_eq!(inputs(&resumed), inputs(&from_start));
    }

    #[test]
    fn test_seek_past_end_is_clamped() {
        let c      = corpus(5);
        let mut it = LogsIterator::new(&c, 2, 1, 3);
        it.seek(100);
        assert_eq!(it.batch(), it.total_batches());
        assert!(!it.has_next_macrobatch());
        assert!(it.minibatches().is_empty());
    }

    #[test]
    fn test_reset_rewinds() {
        let c      = corpus(9);
        let mut it = LogsIterator::new(&c, 2, 1, 5);
        it.reset();
        it.next_macrobatch();
        it.reset();
        assert_eq!(it.batch(), 0);
        assert!(it.has_next_macrobatch());
    }

    #[test]
    fn test_empty_corpus_has_no_batches() {
        let c      = Corpus::default();
        let mut it = LogsIterator::new(&c, 32, 20, 42);
        it.reset();
        assert_eq!(it.total_batches(), 0);
        assert!(!it.has_next_macrobatch());
    }
}
