// ============================================================
// Layer 4 — Dialog Batcher
// ============================================================
// Converts a minibatch of DialogPairs into model-ready tensors.
//
// For the pair  input = "how are you"   reply = "fine"
//
//   encoder input : "you are how"            (reversed)
//   decoder input : "<go> fine"              (one-hot rows)
//   targets       : "fine <eos>"
//
// Rows are padded to the longest input / reply in the batch:
//   - encoder padding uses <unk>; the real length of every row is
//     kept so the thought vector is read at the last real step
//   - decoder padding rows are all zeros
//   - target padding is masked out of the loss
//
// Reference: Burn Book §4 (Batcher)
//            Rust Book §8 (Vectors)

use burn::prelude::*;

use crate::domain::corpus::DialogPair;
use crate::domain::vocabulary::{END_OF_SEQUENCE_ID, START_OF_DECODING_ID, UNKNOWN_ID};

// ─── BatchLayout ──────────────────────────────────────────────────────────────
/// Flat host-side buffers for one batch, before tensor creation.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchLayout {
    pub batch_size:    usize,
    /// Longest encoder input in the batch
    pub input_len:     usize,
    /// Longest reply + 1 (for <go> / <eos>)
    pub reply_len:     usize,
    /// [batch_size * input_len] reversed ids
    pub input_ids:     Vec<i32>,
    /// Real length of every encoder row
    pub input_lengths: Vec<usize>,
    /// [batch_size * reply_len * vocab_size] one-hot decoder inputs
    pub decoder_input: Vec<f32>,
    /// [batch_size * reply_len] target ids
    pub targets:       Vec<i32>,
    /// [batch_size * reply_len] 1.0 for real targets, 0.0 for padding
    pub target_mask:   Vec<f32>,
}

impl BatchLayout {
    pub fn build(items: &[DialogPair], vocab_size: usize) -> Self {
        let batch_size = items.len();
        let input_len  = items.iter().map(|p| p.input.len()).max().unwrap_or(0).max(1);
        let reply_len  = items.iter().map(|p| p.reply.len()).max().unwrap_or(0) + 1;

        let mut input_ids     = vec![UNKNOWN_ID as i32; batch_size * input_len];
        let mut input_lengths = Vec::with_capacity(batch_size);
        let mut decoder_input = vec![0.0f32; batch_size * reply_len * vocab_size];
        let mut targets       = vec![UNKNOWN_ID as i32; batch_size * reply_len];
        let mut target_mask   = vec![0.0f32; batch_size * reply_len];

        for (row, pair) in items.iter().enumerate() {
            // ── Encoder: reversed input ───────────────────────────────────────
            for (t, &id) in pair.input.iter().rev().enumerate() {
                input_ids[row * input_len + t] = id as i32;
            }
            input_lengths.push(pair.input.len().max(1));

            // ── Decoder: <go> + reply  →  reply + <eos> ───────────────────────
            let decoder_tokens = std::iter::once(START_OF_DECODING_ID).chain(pair.reply.iter().copied());
            let target_tokens  = pair.reply.iter().copied().chain(std::iter::once(END_OF_SEQUENCE_ID));

            for (t, (dec, tgt)) in decoder_tokens.zip(target_tokens).enumerate() {
                let step = row * reply_len + t;
                if dec < vocab_size {
                    decoder_input[step * vocab_size + dec] = 1.0;
                }
                targets[step]     = tgt as i32;
                target_mask[step] = 1.0;
            }
        }

        Self {
            batch_size,
            input_len,
            reply_len,
            input_ids,
            input_lengths,
            decoder_input,
            targets,
            target_mask,
        }
    }

    /// Number of unmasked target positions.
    pub fn target_count(&self) -> usize {
        self.target_mask.iter().filter(|&&m| m > 0.0).count()
    }
}

// ─── DialogBatch ──────────────────────────────────────────────────────────────
/// A batch of dialog pairs on the target device.
#[derive(Debug, Clone)]
pub struct DialogBatch<B: Backend> {
    /// Reversed encoder input — shape: [batch_size, input_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// Real length of each encoder row
    pub input_lengths: Vec<usize>,

    /// One-hot decoder input — shape: [batch_size, reply_len, vocab_size]
    pub decoder_input: Tensor<B, 3>,

    /// Flattened targets — shape: [batch_size * reply_len]
    pub targets: Tensor<B, 1, Int>,

    /// Flattened loss mask — shape: [batch_size * reply_len]
    pub target_mask: Tensor<B, 1>,

    /// Unmasked positions in `target_mask`
    pub target_count: usize,
}

// ─── DialogBatcher ────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the correct GPU/CPU.
#[derive(Clone, Debug)]
pub struct DialogBatcher<B: Backend> {
    pub device:     B::Device,
    pub vocab_size: usize,
}

impl<B: Backend> DialogBatcher<B> {
    pub fn new(device: B::Device, vocab_size: usize) -> Self {
        Self { device, vocab_size }
    }

    /// Stack `items` into tensors. `None` for an empty minibatch.
    pub fn batch(&self, items: &[DialogPair]) -> Option<DialogBatch<B>> {
        if items.is_empty() {
            return None;
        }
        let layout = BatchLayout::build(items, self.vocab_size);
        let target_count = layout.target_count();

        let input_ids = Tensor::<B, 1, Int>::from_ints(layout.input_ids.as_slice(), &self.device)
            .reshape([layout.batch_size, layout.input_len]);

        let decoder_input = Tensor::<B, 1>::from_floats(layout.decoder_input.as_slice(), &self.device)
            .reshape([layout.batch_size, layout.reply_len, self.vocab_size]);

        let targets = Tensor::<B, 1, Int>::from_ints(layout.targets.as_slice(), &self.device);

        let target_mask = Tensor::<B, 1>::from_floats(layout.target_mask.as_slice(), &self.device);

        Some(DialogBatch {
            input_ids,
            input_lengths: layout.input_lengths,
            decoder_input,
            targets,
            target_mask,
            target_count,
        })
    }
}
