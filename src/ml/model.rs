use anyhow::{Context, Result};
use burn::{
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig, Lstm, LstmConfig},
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::activation::log_softmax,
};
use std::path::Path;

use crate::data::batcher::DialogBatch;
use crate::domain::traits::Persistable;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    pub vocab_size:      usize,
    pub embedding_width: usize,
    pub hidden_width:    usize,
}

impl Seq2SeqConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Seq2SeqModel<B> {
        let embedding = EmbeddingConfig::new(self.vocab_size, self.embedding_width).init(device);
        let encoder   = LstmConfig::new(self.embedding_width, self.hidden_width, true).init(device);
        // Decoder input = one-hot previous token ++ thought vector
        let decoder   = LstmConfig::new(self.vocab_size + self.hidden_width, self.hidden_width, true)
            .init(device);
        let output    = LinearConfig::new(self.hidden_width, self.vocab_size).init(device);
        Seq2SeqModel { embedding, encoder, decoder, output }
    }
}

/// Encoder-decoder LSTM:
///
/// input ids → embedding → encoder ─ last step → thought ─┐
///                                                        ├ merge → decoder → output
/// one-hot decoder input ─────────────────────────────────┘
#[derive(Module, Debug)]
pub struct Seq2SeqModel<B: Backend> {
    pub embedding: Embedding<B>,
    pub encoder:   Lstm<B>,
    pub decoder:   Lstm<B>,
    pub output:    Linear<B>,
}

pub struct Seq2SeqOutput<B: Backend> {
    /// [batch, reply_len, vocab]
    pub logits:  Tensor<B, 3>,
    /// [batch, hidden]
    pub thought: Tensor<B, 2>,
}

impl<B: Backend> Seq2SeqModel<B> {
    /// Encoder summary per row, read at the row's last real step.
    ///
    /// input_ids: [batch, input_len] → [batch, hidden]
    pub fn encode(&self, input_ids: Tensor<B, 2, Int>, input_lengths: &[usize]) -> Tensor<B, 2> {
        let device   = input_ids.device();
        let embedded = self.embedding.forward(input_ids);
        let (encoded, _) = self.encoder.forward(embedded, None); // [batch, input_len, hidden]
        let [batch_size, input_len, hidden] = encoded.dims();

        let last: Vec<i32> = input_lengths
            .iter()
            .flat_map(|&len| {
                let step = len.clamp(1, input_len) - 1;
                std::iter::repeat(step as i32).take(hidden)
            })
            .collect();
        let index = Tensor::<B, 1, Int>::from_ints(last.as_slice(), &device)
            .reshape([batch_size, 1, hidden]);

        encoded.gather(1, index).reshape([batch_size, hidden])
    }

    /// Concatenate the decoder input with the thought vector copied
    /// to every decoder time step.
    ///
    /// decoder_input: [batch, steps, vocab], thought: [batch, hidden]
    pub fn merge(&self, decoder_input: Tensor<B, 3>, thought: Tensor<B, 2>) -> Tensor<B, 3> {
        let [batch_size, steps, _] = decoder_input.dims();
        let [_, hidden] = thought.dims();
        let duplicated = thought.unsqueeze_dim::<3>(1).expand([batch_size, steps, hidden]);
        Tensor::cat(vec![decoder_input, duplicated], 2)
    }

    pub fn forward(
        &self,
        input_ids:     Tensor<B, 2, Int>,
        input_lengths: &[usize],
        decoder_input: Tensor<B, 3>,
    ) -> Seq2SeqOutput<B> {
        let thought      = self.encode(input_ids, input_lengths);
        let merged       = self.merge(decoder_input, thought.clone());
        let (decoded, _) = self.decoder.forward(merged, None);
        let logits       = self.output.forward(decoded);
        Seq2SeqOutput { logits, thought }
    }

    /// Masked cross-entropy over every real target position.
    pub fn forward_loss(&self, batch: DialogBatch<B>) -> Tensor<B, 1> {
        let output = self.forward(batch.input_ids, &batch.input_lengths, batch.decoder_input);
        let [batch_size, steps, vocab] = output.logits.dims();
        let positions = batch_size * steps;

        let log_probs = log_softmax(output.logits.reshape([positions, vocab]), 1);
        let picked    = log_probs
            .gather(1, batch.targets.reshape([positions, 1]))
            .reshape([positions]);

        (picked * batch.target_mask)
            .sum()
            .neg()
            .div_scalar(batch.target_count.max(1) as f32)
    }

    /// Restore weights written by `Persistable::save`.
    pub fn load(self, path: &Path, device: &B::Device) -> Result<Self> {
        let record = CompactRecorder::new()
            .load(path.to_path_buf(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;
        Ok(self.load_record(record))
    }
}

impl<B: Backend> Persistable for Seq2SeqModel<B> {
    /// The recorder names the file after `path` with its `.mpk`
    /// extension, so checkpoint paths must already end in `.mpk`.
    fn save(&self, path: &Path) -> Result<()> {
        CompactRecorder::new()
            .record(self.clone().into_record(), path.to_path_buf())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        tracing::debug!("Wrote model snapshot '{}'", path.display());
        Ok(())
    }
}
