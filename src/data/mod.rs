// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the raw corpus file to tensor batches.
//
//   movie_lines.txt
//       │
//       ▼
//   LogProcessor      → utterance field, cleaned and tokenised,
//       │               then encoded with the vocabulary
//       ▼
//   Corpus            → encoded lines, consecutive lines = pairs
//       │
//       ▼
//   LogsIterator      → shuffled pass split into macrobatches
//       │               of minibatches
//       ▼
//   DialogBatcher     → reversed inputs, one-hot decoder inputs,
//                       masked targets as tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Cleans and normalises raw utterances
pub mod preprocessor;

/// Corpus reading, tokenising and encoding
pub mod log_processor;

/// Shuffled macrobatch supply for the training scheduler
pub mod logs_iterator;

/// Stacks dialog pairs into tensor batches
pub mod batcher;
