// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the orchestration code and the neural
// network. The decoder, the scheduler and the checkpoint
// manager only ever see these traits; the burn model in
// Layer 5 implements them, and the tests implement them with
// small scripted fakes.
//
//   SequenceModel  → hands out a fresh DecodeSession per call
//   DecodeSession  → encode once, then step one token at a time
//   Persistable    → write/read a model snapshot at a path
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use std::path::Path;

// ─── OneHot ───────────────────────────────────────────────────────────────────
/// A one-hot decoder input: a single hot `index` over `width` slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneHot {
    pub index: usize,
    pub width: usize,
}

impl OneHot {
    pub fn new(index: usize, width: usize) -> Self {
        Self { index, width }
    }

    /// Dense representation, all zeros except `index`.
    pub fn to_dense(&self) -> Vec<f32> {
        let mut v = vec![0.0; self.width];
        if let Some(slot) = v.get_mut(self.index) {
            *slot = 1.0;
        }
        v
    }
}

// ─── SequenceModel ────────────────────────────────────────────────────────────
/// A trained encoder-decoder that can be driven token by token.
pub trait SequenceModel {
    type Session: DecodeSession;

    /// Width of the output distribution and of one-hot inputs.
    fn vocab_size(&self) -> usize;

    /// Whether the decoding half can advance one time step while
    /// carrying its recurrent state. Manual decoding needs this.
    fn supports_stateful_step(&self) -> bool;

    /// Start a decode session with cleared recurrent state.
    fn create_decode_session(&self) -> Self::Session;
}

// ─── DecodeSession ────────────────────────────────────────────────────────────
/// Recurrent decoder state for one input → reply generation.
/// Dropped when the decode call ends.
pub trait DecodeSession {
    /// Whatever the model passes between its layers.
    type Activation: Clone;

    /// Full forward pass over the (already reversed) input with a
    /// single decoder step. Returns the thought vector, i.e. the
    /// encoder summary flowing into the merge point.
    fn thought_vector(
        &mut self,
        reversed_input: &[usize],
        decoder_input: &OneHot,
    ) -> Result<Self::Activation>;

    /// Fuse the decoder input with the thought vector.
    fn merge(&self, decoder_input: &OneHot, thought: &Self::Activation) -> Result<Self::Activation>;

    /// Advance the decoder's recurrent layer by one time step,
    /// updating the session's state.
    fn step(&mut self, merged: Self::Activation) -> Result<Self::Activation>;

    /// Output layer: probability distribution over the vocabulary.
    fn distribution(&self, activation: Self::Activation) -> Result<Vec<f32>>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// A model whose snapshot can be written to disk.
///
/// Implementations:
///   - Seq2SeqModel → burn CompactRecorder file
///   - test fakes   → plain bytes
pub trait Persistable {
    /// Write a full snapshot to exactly `path`.
    fn save(&self, path: &Path) -> Result<()>;
}
