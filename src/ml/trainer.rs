// ============================================================
// Layer 5 — Trainer
// ============================================================
// One optimiser step per minibatch:
//
//   DialogPairs → DialogBatch → forward_loss → backward
//               → GradientsParams → Adam step → new model
//
// Key Burn 0.20 insight:
//   - Training uses an AutodiffBackend for gradients
//   - model.valid() returns the same weights on the inner backend,
//     which is what the self-test decodes with
//   - optim.step consumes the model and hands back the update
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::batcher::DialogBatcher;
use crate::domain::corpus::DialogPair;
use crate::ml::model::Seq2SeqModel;
use crate::ml::scheduler::Trainable;

/// Adam with global gradient-norm clipping.
pub fn adam<B: AutodiffBackend>(clip_norm: f32) -> impl Optimizer<Seq2SeqModel<B>, B> {
    AdamConfig::new()
        .with_epsilon(1e-8)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(clip_norm)))
        .init()
}

pub struct Seq2SeqTrainer<B: AutodiffBackend, O> {
    model:   Seq2SeqModel<B>,
    optim:   O,
    lr:      f64,
    batcher: DialogBatcher<B>,
}

impl<B, O> Seq2SeqTrainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2SeqModel<B>, B>,
{
    pub fn new(model: Seq2SeqModel<B>, optim: O, lr: f64, batcher: DialogBatcher<B>) -> Self {
        Self { model, optim, lr, batcher }
    }

    pub fn model(&self) -> &Seq2SeqModel<B> {
        &self.model
    }

    /// Current weights on the inner backend, without autodiff.
    pub fn inference_model(&self) -> Seq2SeqModel<B::InnerBackend> {
        self.model.valid()
    }

    pub fn vocab_size(&self) -> usize {
        self.batcher.vocab_size
    }
}

impl<B, O> Trainable<Vec<DialogPair>> for Seq2SeqTrainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2SeqModel<B>, B>,
{
    fn fit(&mut self, minibatch: &Vec<DialogPair>) -> Result<f64> {
        let Some(batch) = self.batcher.batch(minibatch) else {
            bail!("cannot fit an empty minibatch");
        };

        let loss = self.model.forward_loss(batch);
        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
        if !loss_val.is_finite() {
            bail!("loss diverged ({loss_val})");
        }

        // Backward pass + Adam update
        let grads  = loss.backward();
        let grads  = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.lr, self.model.clone(), grads);

        tracing::debug!("minibatch of {} pairs, loss={:.4}", minibatch.len(), loss_val);
        Ok(loss_val)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::Seq2SeqConfig;

    type B = burn::backend::Autodiff<burn::backend::NdArray>;

    fn trainer(lr: f64) -> Seq2SeqTrainer<B, impl Optimizer<Seq2SeqModel<B>, B>> {
        let device = Default::default();
        let model  = Seq2SeqConfig::new(8, 4, 8).init::<B>(&device);
        Seq2SeqTrainer::new(model, adam::<B>(1.0), lr, DialogBatcher::new(device, 8))
    }

    #[test]
    fn test_repeated_fit_lowers_loss() {
        let mut t = trainer(1e-2);
        let mb    = vec![DialogPair { input: vec![3, 4], reply: vec![5, 6] }];

        let first = t.fit(&mb).unwrap();
        let mut last = first;
        for _ in 0..30 {
            last = t.fit(&mb).unwrap();
        }
        assert!(last < first, "loss did not drop: {first} → {last}");
    }

    #[test]
    fn test_empty_minibatch_is_an_error() {
        let mut t = trainer(1e-3);
        assert!(t.fit(&Vec::new()).is_err());
    }

    #[test]
    fn test_inference_model_matches_vocab() {
        let t = trainer(1e-3);
        assert_eq!(t.vocab_size(), 8);
        let inner = t.inference_model();
        assert_eq!(inner.output.weight.val().dims(), [8, 8]);
    }
}
