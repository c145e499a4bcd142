// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `dialog`
// and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the model on a dialog corpus, checkpointing as it goes
    Train(TrainArgs),

    /// Chat with the latest checkpoint on stdin / stdout
    Dialog(DialogArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Dialog corpus (Cornell movie_lines.txt format)
    #[arg(long, default_value = "movie_lines.txt")]
    pub corpus: String,

    /// Directory for the checkpoint, its backup, vocabulary and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Longest corpus line kept, in tokens; also the longest reply
    #[arg(long, default_value_t = 40)]
    pub row_size: usize,

    /// Corpus tokens kept in the vocabulary, most frequent first
    #[arg(long, default_value_t = 20_000)]
    pub max_vocab: usize,

    /// Dialog pairs per optimiser step
    #[arg(long, default_value_t = 32)]
    pub minibatch_size: usize,

    /// Minibatches between checkpoint / self-test checks
    #[arg(long, default_value_t = 20)]
    pub macrobatch_size: usize,

    #[arg(long, default_value_t = 128)]
    pub embedding_width: usize,

    /// Width of both LSTMs and of the thought vector
    #[arg(long, default_value_t = 512)]
    pub hidden_width: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Gradient L2-norm ceiling
    #[arg(long, default_value_t = 1.0)]
    pub grad_clip: f32,

    #[arg(long, default_value_t = 10_000)]
    pub max_epochs: usize,

    /// Seconds between checkpoints
    #[arg(long, default_value_t = 300)]
    pub save_every_secs: u64,

    /// Seconds between self-tests
    #[arg(long, default_value_t = 60)]
    pub test_every_secs: u64,

    /// Seed for the corpus shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Macrobatch to resume the first epoch at, e.g. after a crash
    #[arg(long, env = "SEQ2SEQ_SHIFT")]
    pub shift: Option<usize>,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            corpus:          a.corpus,
            checkpoint_dir:  a.checkpoint_dir,
            row_size:        a.row_size,
            max_vocab:       a.max_vocab,
            minibatch_size:  a.minibatch_size,
            macrobatch_size: a.macrobatch_size,
            embedding_width: a.embedding_width,
            hidden_width:    a.hidden_width,
            lr:              a.lr,
            grad_clip:       a.grad_clip,
            max_epochs:      a.max_epochs,
            save_every_secs: a.save_every_secs,
            test_every_secs: a.test_every_secs,
            seed:            a.seed,
            shift:           a.shift,
        }
    }
}

/// All arguments for the `dialog` command
#[derive(Args, Debug)]
pub struct DialogArgs {
    /// Directory where training saved its checkpoint and vocabulary
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Corpus to build the vocabulary from if none was saved
    #[arg(long, default_value = "movie_lines.txt")]
    pub corpus: String,
}
