// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All real work is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`  — trains on the dialog corpus until killed,
//                 checkpointing on a timer
//   2. `dialog` — loads the checkpoint and chats on stdin
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, DialogArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "seq2seq-chat",
    version = "0.1.0",
    about = "Train an LSTM sequence-to-sequence chatbot on movie dialogs, then talk to it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)  => run_train(args),
            Commands::Dialog(args) => run_dialog(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on corpus: {}", args.corpus);
    if let Some(shift) = args.shift {
        tracing::info!("Resuming the first epoch at macrobatch {}", shift);
    }
    TrainUseCase::new(args.into()).execute()
}

fn run_dialog(args: DialogArgs) -> Result<()> {
    use crate::application::dialog_use_case::DialogUseCase;

    let use_case = DialogUseCase::from_checkpoint(&args.checkpoint_dir, &args.corpus)?;
    let stdin    = std::io::stdin();
    use_case.run(stdin.lock(), std::io::stdout(), rand::thread_rng())
}
