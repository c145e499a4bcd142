// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Read and tokenise the corpus      (Layer 4 - data)
//   Step 2: Build / load the vocabulary       (Layer 6 - infra)
//   Step 3: Encode the corpus                 (Layer 4 - data)
//   Step 4: Save config                       (Layer 6 - infra)
//   Step 5: Restore or create the model       (Layer 6 + 5)
//   Step 6: Self-test a restored model        (Layer 2)
//   Step 7: Run the scheduler until the
//           epoch ceiling or an operator kill (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{bail, Result};
use burn::{optim::Optimizer, tensor::backend::AutodiffBackend};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

use crate::application::self_test::SelfTest;
use crate::data::{batcher::DialogBatcher, log_processor::LogProcessor, logs_iterator::LogsIterator};
use crate::domain::{corpus::Corpus, vocabulary::Vocabulary};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{MacrobatchMetrics, MetricsLogger},
    vocab_store::VocabularyStore,
};
use crate::ml::{
    default_device,
    model::{Seq2SeqConfig, Seq2SeqModel},
    scheduler::{MacrobatchReport, ScheduleConfig, TrainingHooks, TrainingScheduler},
    session::BurnSequenceModel,
    trainer::{adam, Seq2SeqTrainer},
    TrainBackend,
};

// ─── TrainConfig ──────────────────────────────────────────────────────────────
// Serialize + Deserialize lets the checkpoint manager save this
// next to the weights, so `dialog` rebuilds the same architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub corpus:          String,
    pub checkpoint_dir:  String,
    /// Max tokens per corpus line, and max tokens per reply
    pub row_size:        usize,
    /// Corpus tokens kept on top of the three reserved ones
    pub max_vocab:       usize,
    pub minibatch_size:  usize,
    /// Minibatches per macrobatch
    pub macrobatch_size: usize,
    pub embedding_width: usize,
    pub hidden_width:    usize,
    pub lr:              f64,
    pub grad_clip:       f32,
    pub max_epochs:      usize,
    pub save_every_secs: u64,
    pub test_every_secs: u64,
    pub seed:            u64,
    /// Macrobatch to resume the first epoch at; never persisted
    #[serde(skip)]
    pub shift:           Option<usize>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus:          "movie_lines.txt".to_string(),
            checkpoint_dir:  "checkpoints".to_string(),
            row_size:        40,
            max_vocab:       20_000,
            minibatch_size:  32,
            macrobatch_size: 20,
            embedding_width: 128,
            hidden_width:    512,
            lr:              1e-3,
            grad_clip:       1.0,
            max_epochs:      10_000,
            save_every_secs: 300,
            test_every_secs: 60,
            seed:            42,
            shift:           None,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self, vocab_size: usize) -> Seq2SeqConfig {
        Seq2SeqConfig::new(vocab_size, self.embedding_width, self.hidden_width)
    }

    pub fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            max_epochs:  self.max_epochs,
            save_every:  Duration::from_secs(self.save_every_secs),
            test_every:  Duration::from_secs(self.test_every_secs),
            resume_from: self.shift,
        }
    }

    /// Keep the layer widths a checkpoint was trained with.
    pub fn adopt_architecture(&mut self, saved: &TrainConfig) {
        if self.embedding_width != saved.embedding_width || self.hidden_width != saved.hidden_width {
            tracing::warn!(
                "Checkpoint was trained with embedding={} hidden={}; ignoring embedding={} hidden={}",
                saved.embedding_width,
                saved.hidden_width,
                self.embedding_width,
                self.hidden_width,
            );
        }
        self.embedding_width = saved.embedding_width;
        self.hidden_width    = saved.hidden_width;
    }
}

/// Build the vocabulary from tokenised corpus lines.
pub fn build_vocabulary(lines: &[Vec<String>], max_vocab: usize) -> Vocabulary {
    Vocabulary::build(&LogProcessor::count_frequencies(lines), max_vocab)
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Train until the epoch ceiling; in practice until killed.
    pub fn execute(mut self) -> Result<()> {
        // ── Step 1: Read the corpus ───────────────────────────────────────────
        let processor = LogProcessor::new(self.config.row_size);
        let lines     = processor.read_corpus(Path::new(&self.config.corpus))?;

        // ── Step 2: Vocabulary, reused if an earlier run saved one ────────────
        let vocab_store = VocabularyStore::new(&self.config.checkpoint_dir);
        let vocab       = vocab_store.load_or_build(|| Ok(build_vocabulary(&lines, self.config.max_vocab)))?;

        // ── Step 3: Encode ────────────────────────────────────────────────────
        let corpus = Corpus::new(processor.encode_all(&lines, &vocab));
        drop(lines);
        tracing::info!("Encoded {} lines, {} dialog pairs", corpus.len(), corpus.pair_count());
        if corpus.pair_count() == 0 {
            bail!("corpus '{}' has no usable dialog pairs", self.config.corpus);
        }

        // ── Step 4: Config, adopting the checkpoint's architecture ────────────
        let checkpoints = CheckpointManager::new(&self.config.checkpoint_dir)?;
        if checkpoints.has_checkpoint() {
            if let Some(saved) = checkpoints.load_config()? {
                self.config.adopt_architecture(&saved);
            }
        }
        checkpoints.save_config(&self.config)?;
        let cfg = &self.config;

        // ── Step 5: Restore or create the model ───────────────────────────────
        let device    = default_device();
        let model_cfg = cfg.model_config(vocab.len());
        let restored  = checkpoints.load(|path| model_cfg.init::<TrainBackend>(&device).load(path, &device))?;
        let resumed   = restored.is_some();
        let model: Seq2SeqModel<TrainBackend> = match restored {
            Some(model) => model,
            None => {
                tracing::info!("No checkpoint found, starting from an untrained model");
                model_cfg.init(&device)
            }
        };
        tracing::info!(
            "Model ready: vocab={} embedding={} hidden={}",
            vocab.len(),
            cfg.embedding_width,
            cfg.hidden_width
        );

        let mut trainer = Seq2SeqTrainer::new(
            model,
            adam::<TrainBackend>(cfg.grad_clip),
            cfg.lr,
            DialogBatcher::new(device.clone(), vocab.len()),
        );
        let mut hooks = TrainHooks {
            checkpoints,
            metrics: MetricsLogger::new(&cfg.checkpoint_dir)?,
            tester:  SelfTest::new(&vocab, &corpus, cfg.row_size, rand::thread_rng()),
        };

        // ── Step 6: Show what a restored model says before training on ────────
        if resumed {
            if let Err(e) = hooks.self_test(&trainer) {
                tracing::warn!("Initial self-test failed: {e:#}");
            }
        }

        // ── Step 7: Scheduler ─────────────────────────────────────────────────
        let mut supply = LogsIterator::new(&corpus, cfg.minibatch_size, cfg.macrobatch_size, cfg.seed);
        let summary    = TrainingScheduler::new(cfg.schedule()).run(&mut trainer, &mut supply, &mut hooks)?;
        tracing::info!(
            "Training finished: {} epochs, {} checkpoints, {} self-tests ({} failed)",
            summary.epochs,
            summary.saves,
            summary.tests,
            summary.failed_tests
        );
        Ok(())
    }
}

// ─── Scheduler hooks ──────────────────────────────────────────────────────────
struct TrainHooks<'a, R> {
    checkpoints: CheckpointManager,
    metrics:     MetricsLogger,
    tester:      SelfTest<'a, R>,
}

impl<B, O, R> TrainingHooks<Seq2SeqTrainer<B, O>> for TrainHooks<'_, R>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2SeqModel<B>, B>,
    R: Rng,
{
    fn save_checkpoint(&mut self, trainer: &Seq2SeqTrainer<B, O>) -> Result<()> {
        println!("Saving checkpoint...");
        self.checkpoints.save(trainer.model())?;
        println!("Checkpoint saved");
        Ok(())
    }

    fn self_test(&mut self, trainer: &Seq2SeqTrainer<B, O>) -> Result<()> {
        let model = BurnSequenceModel::new(trainer.inference_model(), trainer.vocab_size());
        self.tester.run(&model)?;
        Ok(())
    }

    fn on_macrobatch(&mut self, report: &MacrobatchReport) -> Result<()> {
        self.metrics.log(&MacrobatchMetrics::from(report))
    }

    fn on_progress(&mut self, epoch: usize, percent: usize) {
        tracing::debug!("Epoch {} at {}%", epoch, percent);
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.row_size, 40);
        assert_eq!(cfg.max_vocab, 20_000);
        assert_eq!(cfg.schedule().save_every, Duration::from_secs(300));
        assert_eq!(cfg.schedule().test_every, Duration::from_secs(60));
        assert_eq!(cfg.schedule().resume_from, None);
    }

    #[test]
    fn test_shift_is_not_persisted() {
        let cfg  = TrainConfig { shift: Some(7), ..TrainConfig::default() };
        assert_eq!(cfg.schedule().resume_from, Some(7));

        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("shift"));
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.shift, None);
    }

    #[test]
    fn test_adopt_architecture_keeps_other_settings() {
        let saved   = TrainConfig { embedding_width: 16, hidden_width: 32, ..TrainConfig::default() };
        let mut cfg = TrainConfig { lr: 5e-4, minibatch_size: 8, ..TrainConfig::default() };
        cfg.adopt_architecture(&saved);
        assert_eq!((cfg.embedding_width, cfg.hidden_width), (16, 32));
        assert_eq!(cfg.lr, 5e-4);
        assert_eq!(cfg.minibatch_size, 8);
        assert_eq!(cfg.model_config(10).hidden_width, 32);
    }

    #[test]
    fn test_build_vocabulary_from_lines() {
        let lines = vec![
            vec!["hi".to_string(), "!".to_string()],
            vec!["hi".to_string(), "there".to_string()],
        ];
        let vocab = build_vocabulary(&lines, 10);
        assert_eq!(vocab.len(), 6);
        assert_eq!(vocab.id("hi"), Some(3));
    }
}
