// ============================================================
// Layer 5 — Autoregressive Decoder
// ============================================================
// Generates a reply one token at a time from any SequenceModel.
//
// Protocol for one call (order matters):
//
//   1. open a fresh decode session      (recurrent state cleared)
//   2. reverse the input ids
//   3. one full forward pass with a single <go> decoder step;
//      keep only the thought vector
//   4. repeat up to `max_len` times:
//        merge(previous token one-hot, thought)
//        → stateful decoder step
//        → output distribution
//        → inverse-CDF sample with one uniform draw
//        → render it (unless a suppressed <unk>)
//        → stop on <eos> (if asked), else feed the token back in
//
// Sampling is deliberately stochastic: picking the arg-max made
// the model repeat the same token over and over.

use anyhow::{bail, Result};
use rand::Rng;

use crate::domain::traits::{DecodeSession, OneHot, SequenceModel};
use crate::domain::vocabulary::{
    Vocabulary, END_OF_SEQUENCE_ID, START_OF_DECODING_ID, UNKNOWN_ID,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Leave sampled <unk> tokens out of the rendered reply
    pub suppress_unknown: bool,
    /// End the reply as soon as <eos> is sampled
    pub stop_on_eos:      bool,
}

impl DecodeOptions {
    /// Settings for talking to a user.
    pub fn interactive() -> Self {
        Self { suppress_unknown: true, stop_on_eos: true }
    }

    /// Settings for the periodic self-test: unknowns stay visible.
    pub fn self_test() -> Self {
        Self { suppress_unknown: false, stop_on_eos: true }
    }
}

/// Outcome of one decode call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    /// Every sampled id in order, including suppressed ones
    pub sampled:  Vec<usize>,
    /// Ids that make up the visible reply
    pub rendered: Vec<usize>,
    /// Whether decoding ended on <eos> rather than the length bound
    pub stopped_on_eos: bool,
}

/// Inverse-CDF sampling: the first index whose running sum reaches
/// `draw`. Falls back to the last index when rounding leaves the
/// total just below the draw.
pub fn sample_index(distribution: &[f32], draw: f64) -> usize {
    let mut cumulative = 0.0f64;
    for (index, &p) in distribution.iter().enumerate() {
        cumulative += f64::from(p);
        if draw <= cumulative {
            return index;
        }
    }
    distribution.len().saturating_sub(1)
}

pub struct Decoder<'v, R> {
    vocab:   &'v Vocabulary,
    /// Upper bound on sampled tokens (the row size)
    max_len: usize,
    rng:     R,
}

impl<'v, R: Rng> Decoder<'v, R> {
    pub fn new(vocab: &'v Vocabulary, max_len: usize, rng: R) -> Self {
        Self { vocab, max_len, rng }
    }

    /// Generate a reply for `input` (vocabulary ids, natural order).
    pub fn decode<M: SequenceModel>(&mut self, model: &M, input: &[usize], options: DecodeOptions) -> Result<Reply> {
        if !model.supports_stateful_step() {
            bail!("sequence model cannot advance its decoder one step at a time");
        }
        let width = model.vocab_size();
        if width != self.vocab.len() {
            bail!(
                "model vocabulary size {} differs from the loaded vocabulary ({})",
                width,
                self.vocab.len()
            );
        }

        // ── 1. Fresh recurrent state for this call only ───────────────────────
        let mut session = model.create_decode_session();

        // ── 2. Encoder reads the input back to front ──────────────────────────
        let mut reversed: Vec<usize> = input.iter().rev().copied().collect();
        if reversed.is_empty() {
            reversed.push(UNKNOWN_ID);
        }

        // ── 3. Thought vector from one <go> pass ──────────────────────────────
        let mut decoder_input = OneHot::new(START_OF_DECODING_ID, width);
        let thought = session.thought_vector(&reversed, &decoder_input)?;

        // ── 4. Token loop ─────────────────────────────────────────────────────
        let mut reply = Reply::default();
        for _ in 0..self.max_len {
            let merged       = session.merge(&decoder_input, &thought)?;
            let activation   = session.step(merged)?;
            let distribution = session.distribution(activation)?;
            if distribution.len() != width {
                bail!(
                    "output distribution has {} entries, expected {}",
                    distribution.len(),
                    width
                );
            }

            let id = sample_index(&distribution, self.rng.gen::<f64>());
            reply.sampled.push(id);

            if !(options.suppress_unknown && id == UNKNOWN_ID) {
                reply.rendered.push(id);
            }
            if options.stop_on_eos && id == END_OF_SEQUENCE_ID {
                reply.stopped_on_eos = true;
                break;
            }
            decoder_input = OneHot::new(id, width);
        }

        tracing::debug!(
            "Decoded {} tokens ({} rendered, eos={})",
            reply.sampled.len(),
            reply.rendered.len(),
            reply.stopped_on_eos
        );
        Ok(reply)
    }

    /// Reply as text.
    pub fn render(&self, reply: &Reply) -> String {
        self.vocab.render(&reply.rendered)
    }
}
