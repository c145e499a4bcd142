// ============================================================
// Layer 5 — Burn Decode Session
// ============================================================
// Exposes the trained Seq2SeqModel through the SequenceModel /
// DecodeSession traits so the autoregressive decoder can drive
// it one time step at a time.
//
// The session owns the decoder LSTM state. It starts empty and
// is carried from one `step` to the next; dropping the session
// discards it.

use anyhow::{anyhow, bail, Result};
use burn::{nn::LstmState, prelude::*, tensor::activation::softmax};

use crate::domain::traits::{DecodeSession, OneHot, SequenceModel};
use crate::ml::model::Seq2SeqModel;

/// A Seq2SeqModel bound to the device it runs on.
#[derive(Debug, Clone)]
pub struct BurnSequenceModel<B: Backend> {
    model:      Seq2SeqModel<B>,
    device:     B::Device,
    vocab_size: usize,
}

impl<B: Backend> BurnSequenceModel<B> {
    pub fn new(model: Seq2SeqModel<B>, vocab_size: usize) -> Self {
        let device = model.devices().into_iter().next().unwrap_or_default();
        Self { model, device, vocab_size }
    }
}

impl<B: Backend> SequenceModel for BurnSequenceModel<B> {
    type Session = BurnDecodeSession<B>;

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn supports_stateful_step(&self) -> bool {
        true
    }

    fn create_decode_session(&self) -> Self::Session {
        BurnDecodeSession {
            model:      self.model.clone(),
            device:     self.device.clone(),
            vocab_size: self.vocab_size,
            state:      None,
        }
    }
}

pub struct BurnDecodeSession<B: Backend> {
    model:      Seq2SeqModel<B>,
    device:     B::Device,
    vocab_size: usize,
    /// Decoder recurrent state; `None` until the first step
    state:      Option<LstmState<B, 2>>,
}

impl<B: Backend> BurnDecodeSession<B> {
    /// [1, 1, vocab] tensor for a one-hot decoder input.
    fn one_hot(&self, input: &OneHot) -> Result<Tensor<B, 3>> {
        if input.width != self.vocab_size || input.index >= self.vocab_size {
            bail!(
                "one-hot input {}/{} does not match vocabulary size {}",
                input.index,
                input.width,
                self.vocab_size
            );
        }
        Ok(Tensor::<B, 1>::from_floats(input.to_dense().as_slice(), &self.device)
            .reshape([1, 1, self.vocab_size]))
    }
}

impl<B: Backend> DecodeSession for BurnDecodeSession<B> {
    /// Always shaped [1, 1, width]
    type Activation = Tensor<B, 3>;

    fn thought_vector(&mut self, reversed_input: &[usize], decoder_input: &OneHot) -> Result<Tensor<B, 3>> {
        if reversed_input.is_empty() {
            bail!("cannot encode an empty input");
        }
        let ids: Vec<i32> = reversed_input.iter().map(|&id| id as i32).collect();
        let input_ids = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &self.device)
            .reshape([1, ids.len()]);

        let output = self.model.forward(input_ids, &[ids.len()], self.one_hot(decoder_input)?);
        Ok(output.thought.unsqueeze_dim::<3>(1))
    }

    fn merge(&self, decoder_input: &OneHot, thought: &Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        Ok(Tensor::cat(vec![self.one_hot(decoder_input)?, thought.clone()], 2))
    }

    fn step(&mut self, merged: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        let (activation, state) = self.model.decoder.forward(merged, self.state.take());
        self.state = Some(state);
        Ok(activation)
    }

    fn distribution(&self, activation: Tensor<B, 3>) -> Result<Vec<f32>> {
        let logits = self.model.output.forward(activation);
        softmax(logits, 2)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read output distribution: {e:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::Seq2SeqConfig;

    type B = burn::backend::NdArray;

    fn tiny() -> BurnSequenceModel<B> {
        BurnSequenceModel::new(Seq2SeqConfig::new(6, 3, 4).init::<B>(&Default::default()), 6)
    }

    #[test]
    fn test_distribution_sums_to_one() {
        let model       = tiny();
        let mut session = model.create_decode_session();
        let go          = OneHot::new(2, 6);
        let thought     = session.thought_vector(&[4, 3], &go).unwrap();
        assert_eq!(thought.dims(), [1, 1, 4]);

        let merged = session.merge(&go, &thought).unwrap();
        assert_eq!(merged.dims(), [1, 1, 10]);

        let activation = session.step(merged).unwrap();
        let dist       = session.distribution(activation).unwrap();
        assert_eq!(dist.len(), 6);
        assert!((dist.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_step_carries_state() {
        let model   = tiny();
        let go      = OneHot::new(2, 6);
        let mut s   = model.create_decode_session();
        let thought = s.thought_vector(&[3], &go).unwrap();

        let first  = s.step(s.merge(&go, &thought).unwrap()).unwrap();
        let second = s.step(s.merge(&go, &thought).unwrap()).unwrap();
        let a = first.into_data().to_vec::<f32>().unwrap();
        let b = second.into_data().to_vec::<f32>().unwrap();
        // Same input, different recurrent state
        assert_ne!(a, b);
    }

    /// Distributions for `steps` decoder steps, all fed `<go>`.
    fn walk(session: &mut BurnDecodeSession<B>, input: &[usize], steps: usize) -> Vec<Vec<f32>> {
        let go      = OneHot::new(2, 6);
        let thought = session.thought_vector(input, &go).unwrap();
        (0..steps)
            .map(|_| {
                let activation = session.step(session.merge(&go, &thought).unwrap()).unwrap();
                session.distribution(activation).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_sessions_do_not_share_state() {
        let model = tiny();
        let alone = walk(&mut model.create_decode_session(), &[5], 3);

        // A busy session on another input must not leak into a new one
        let mut busy = model.create_decode_session();
        walk(&mut busy, &[4, 3], 4);
        let mut fresh = model.create_decode_session();
        assert_eq!(walk(&mut fresh, &[5], 3), alone);

        // Nor when two live sessions are stepped in turn
        let go     = OneHot::new(2, 6);
        let mut a  = model.create_decode_session();
        let mut b  = model.create_decode_session();
        let ta     = a.thought_vector(&[4, 3], &go).unwrap();
        let tb     = b.thought_vector(&[5], &go).unwrap();
        let mut interleaved = Vec::new();
        for _ in 0..3 {
            a.step(a.merge(&go, &ta).unwrap()).unwrap();
            let activation = b.step(b.merge(&go, &tb).unwrap()).unwrap();
            interleaved.push(b.distribution(activation).unwrap());
        }
        assert_eq!(interleaved, alone);
    }

    #[test]
    fn test_rejects_mismatched_one_hot() {
        let model = tiny();
        let mut s = model.create_decode_session();
        assert!(s.thought_vector(&[3], &OneHot::new(2, 9)).is_err());
        assert!(s.thought_vector(&[], &OneHot::new(2, 6)).is_err());
    }
}
