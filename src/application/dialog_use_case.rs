// ============================================================
// Layer 2 — Dialog Use Case
// ============================================================
// Interactive chat against the latest checkpoint:
//
//   In> where are you going?
//   Got words: where are you going ?
//   Out> home .
//
// Every input line goes through the same tokeniser and frozen
// vocabulary the corpus went through. A line with no known word
// or too many tokens is skipped with a notice; decode errors are
// reported and the loop keeps going. Bytes that are not UTF-8 are
// replaced, not fatal. End of input ends the session.

use anyhow::{Context, Result};
use rand::Rng;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::application::train_use_case::{build_vocabulary, TrainConfig};
use crate::data::log_processor::{LogProcessor, Rejection};
use crate::domain::{traits::SequenceModel, vocabulary::Vocabulary};
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabularyStore};
use crate::ml::{
    decoder::{DecodeOptions, Decoder},
    default_device,
    session::BurnSequenceModel,
    InferBackend,
};

const PROMPT: &str = "In> ";

/// Outcome of one line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    Answered { words: String, reply: String },
    Rejected(Rejection),
}

pub struct DialogUseCase<M> {
    processor: LogProcessor,
    vocab:     Vocabulary,
    model:     M,
    row_size:  usize,
}

impl DialogUseCase<BurnSequenceModel<InferBackend>> {
    /// Load config, vocabulary and weights from `checkpoint_dir`.
    ///
    /// `corpus` is only read when no vocabulary was saved yet.
    pub fn from_checkpoint(checkpoint_dir: &str, corpus: &str) -> Result<Self> {
        let checkpoints = CheckpointManager::new(checkpoint_dir)?;
        let cfg = match checkpoints.load_config()? {
            Some(cfg) => cfg,
            None => {
                tracing::warn!("No train_config.json in '{}', using defaults", checkpoint_dir);
                TrainConfig { checkpoint_dir: checkpoint_dir.to_string(), ..TrainConfig::default() }
            }
        };

        let processor = LogProcessor::new(cfg.row_size);
        let vocab     = VocabularyStore::new(checkpoint_dir).load_or_build(|| {
            let lines = processor.read_corpus(Path::new(corpus))?;
            Ok(build_vocabulary(&lines, cfg.max_vocab))
        })?;

        let device    = default_device();
        let model_cfg = cfg.model_config(vocab.len());
        let model     = match checkpoints.load(|path| model_cfg.init::<InferBackend>(&device).load(path, &device))? {
            Some(model) => model,
            None => {
                tracing::warn!("No checkpoint in '{}', replies come from an untrained model", checkpoint_dir);
                model_cfg.init(&device)
            }
        };

        let vocab_size = vocab.len();
        Ok(Self::new(processor, vocab, BurnSequenceModel::new(model, vocab_size), cfg.row_size))
    }
}

impl<M: SequenceModel> DialogUseCase<M> {
    pub fn new(processor: LogProcessor, vocab: Vocabulary, model: M, row_size: usize) -> Self {
        Self { processor, vocab, model, row_size }
    }

    /// Reply to one line of raw text.
    pub fn reply<R: Rng>(&self, text: &str, rng: &mut R) -> Result<Turn> {
        let ids = match self.processor.encode_interactive(text, &self.vocab) {
            Ok(ids) => ids,
            Err(rejection) => return Ok(Turn::Rejected(rejection)),
        };
        let mut decoder = Decoder::new(&self.vocab, self.row_size, rng);
        let reply       = decoder.decode(&self.model, &ids, DecodeOptions::interactive())?;
        Ok(Turn::Answered { words: self.vocab.render(&ids), reply: decoder.render(&reply) })
    }

    /// Prompt, read, reply until `input` runs dry.
    pub fn run<I, O, R>(&self, mut input: I, mut output: O, mut rng: R) -> Result<()>
    where
        I: BufRead,
        O: Write,
        R: Rng,
    {
        let mut raw = Vec::new();
        loop {
            write!(output, "{PROMPT}")?;
            output.flush()?;

            raw.clear();
            let read = input.read_until(b'\n', &mut raw).context("Cannot read from standard input")?;
            if read == 0 {
                writeln!(output)?;
                return Ok(());
            }
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }

            match self.reply(line, &mut rng) {
                Ok(Turn::Answered { words, reply }) => {
                    writeln!(output, "Got words: {words}")?;
                    writeln!(output, "Out> {reply}")?;
                }
                Ok(Turn::Rejected(rejection)) => writeln!(output, "{rejection}")?,
                Err(e) => {
                    tracing::warn!("Decode failed: {e:#}");
                    writeln!(output, "Error: {e}")?;
                }
            }
        }
    }
}
