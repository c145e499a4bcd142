// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that touches tensors lives here, plus the pieces
// that drive it: the scheduler and the autoregressive decoder.
// The scheduler and decoder talk to the model only through
// traits, so both are tested without a GPU.
//
//   model.rs     — encoder-decoder LSTM, loss, weight loading
//   session.rs   — per-reply decode session over the model,
//                  owning the decoder recurrent state
//   decoder.rs   — thought vector + inverse-CDF sampling loop
//   trainer.rs   — one Adam step per minibatch
//   scheduler.rs — epoch loop with time-based checkpoint and
//                  self-test
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Sutskever et al. (2014) Sequence to Sequence Learning

/// Encoder-decoder LSTM architecture
pub mod model;

/// Stateful decode sessions over a trained model
pub mod session;

/// Autoregressive reply decoder
pub mod decoder;

pub mod trainer;

/// Epoch loop with time-based side jobs
pub mod scheduler;

// ─── Backends ─────────────────────────────────────────────────────────────────
// Training needs Autodiff<Wgpu> for gradients; replying and the
// self-test run on plain Wgpu via model.valid().

pub type InferBackend = burn::backend::Wgpu;
pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

pub fn default_device() -> burn::backend::wgpu::WgpuDevice {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    device
}
