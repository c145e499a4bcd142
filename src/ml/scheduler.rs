// ============================================================
// Layer 5 — Training Scheduler
// ============================================================
// Drives fit steps over the corpus, epoch after epoch, and
// interleaves two wall-clock driven side jobs on the same thread:
//
//   every macrobatch:
//     fit each minibatch → advance supply → report progress
//     if now - last_save > save_every : save checkpoint, reset timer
//     if now - last_test > test_every : run self-test,  reset timer
//
// The cadence is time based, not batch based, so a slow batch
// does not stretch the interval between checkpoints.
//
//   - fit and checkpoint errors end training (returned as Err)
//   - self-test errors are logged and training continues
//   - the resume offset applies to the first epoch only
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use std::time::{Duration, Instant};

// ─── Collaborator traits ──────────────────────────────────────────────────────

/// Source of macrobatches for one pass over the corpus.
pub trait MacrobatchSupply {
    type Minibatch;

    /// Start a new pass from the first macrobatch.
    fn reset(&mut self);
    /// Start a new pass at macrobatch `macrobatch`.
    fn seek(&mut self, macrobatch: usize);
    fn has_next_macrobatch(&self) -> bool;
    fn next_macrobatch(&mut self);
    /// Macrobatches consumed so far in this pass.
    fn batch(&self) -> usize;
    fn total_batches(&self) -> usize;
    /// The current macrobatch, split into minibatches.
    fn minibatches(&self) -> Vec<Self::Minibatch>;
}

/// Something that learns from one minibatch at a time.
pub trait Trainable<Mb> {
    /// One optimiser step; returns the minibatch loss.
    fn fit(&mut self, minibatch: &Mb) -> Result<f64>;
}

/// Side jobs the scheduler triggers.
pub trait TrainingHooks<T> {
    fn save_checkpoint(&mut self, trainer: &T) -> Result<()>;
    fn self_test(&mut self, trainer: &T) -> Result<()>;

    fn on_macrobatch(&mut self, _report: &MacrobatchReport) -> Result<()> {
        Ok(())
    }

    fn on_progress(&mut self, _epoch: usize, _percent: usize) {}
}

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ─── Config and reports ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Epochs to run before stopping on its own
    pub max_epochs: usize,
    pub save_every: Duration,
    pub test_every: Duration,
    /// Macrobatch to start the first epoch at
    pub resume_from: Option<usize>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            max_epochs:  10_000,
            save_every:  Duration::from_secs(5 * 60),
            test_every:  Duration::from_secs(60),
            resume_from: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacrobatchReport {
    pub epoch:    usize,
    /// Position after this macrobatch
    pub batch:    usize,
    pub total:    usize,
    pub fit_time: Duration,
    /// Mean minibatch loss, NaN if the macrobatch was empty
    pub loss:     f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub epochs:       usize,
    pub macrobatches: usize,
    pub saves:        usize,
    pub tests:        usize,
    pub failed_tests: usize,
}

/// Fires when more than `every` has passed since the last reset.
struct IntervalTimer {
    every: Duration,
    last:  Instant,
}

impl IntervalTimer {
    fn new(every: Duration, now: Instant) -> Self {
        Self { every, last: now }
    }

    fn due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last) > self.every
    }

    fn reset(&mut self, now: Instant) {
        self.last = now;
    }
}

// ─── Scheduler ────────────────────────────────────────────────────────────────

pub struct TrainingScheduler<C = SystemClock> {
    config: ScheduleConfig,
    clock:  C,
}

impl TrainingScheduler<SystemClock> {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config, clock: SystemClock }
    }
}

impl<C: Clock> TrainingScheduler<C> {
    pub fn with_clock(config: ScheduleConfig, clock: C) -> Self {
        Self { config, clock }
    }

    pub fn run<T, S, H>(&self, trainer: &mut T, supply: &mut S, hooks: &mut H) -> Result<RunSummary>
    where
        S: MacrobatchSupply,
        T: Trainable<S::Minibatch>,
        H: TrainingHooks<T>,
    {
        let mut summary   = RunSummary::default();
        let mut save_time = IntervalTimer::new(self.config.save_every, self.clock.now());
        let mut test_time = IntervalTimer::new(self.config.test_every, self.clock.now());

        for epoch in 1..=self.config.max_epochs {
            println!("Epoch {epoch}");
            match self.config.resume_from {
                Some(offset) if epoch == 1 => supply.seek(offset),
                _ => supply.reset(),
            }

            let mut last_percent = 0usize;
            while supply.has_next_macrobatch() {
                // ── Fit every minibatch of this macrobatch ────────────────────
                let started = self.clock.now();
                let mut loss_sum = 0.0f64;
                let minibatches  = supply.minibatches();
                for minibatch in &minibatches {
                    loss_sum += trainer.fit(minibatch)?;
                }
                let fit_time = self.clock.now().saturating_duration_since(started);
                supply.next_macrobatch();
                summary.macrobatches += 1;

                let report = MacrobatchReport {
                    epoch,
                    batch: supply.batch(),
                    total: supply.total_batches(),
                    fit_time,
                    loss: if minibatches.is_empty() { f64::NAN } else { loss_sum / minibatches.len() as f64 },
                };
                println!("Fit time: {} ms", fit_time.as_millis());
                println!("Batch = {}/{}", report.batch, report.total);
                hooks.on_macrobatch(&report)?;

                // ── Progress: announce only when the integer percent moves ────
                let percent = report.batch * 100 / report.total.max(1);
                if percent != last_percent {
                    println!("Epoch complete: {percent}%");
                    hooks.on_progress(epoch, percent);
                    last_percent = percent;
                }

                // ── Time-based checkpoint ─────────────────────────────────────
                if save_time.due(self.clock.now()) {
                    hooks.save_checkpoint(trainer)?;
                    summary.saves += 1;
                    save_time.reset(self.clock.now());
                }

                // ── Time-based self-test ──────────────────────────────────────
                if test_time.due(self.clock.now()) {
                    summary.tests += 1;
                    if let Err(e) = hooks.self_test(trainer) {
                        summary.failed_tests += 1;
                        tracing::warn!("Self-test failed, training continues: {e:#}");
                    }
                    test_time.reset(self.clock.now());
                }
            }
            summary.epochs = epoch;
        }

        tracing::info!(
            "Epoch ceiling reached: {} epochs, {} macrobatches",
            summary.epochs,
            summary.macrobatches
        );
        Ok(summary)
    }
}
