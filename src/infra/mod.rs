// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the checkpoint directory:
//
//   checkpoint.rs   — model snapshot with one rotating backup,
//                     plus train_config.json so a later run can
//                     rebuild the same architecture
//
//   vocab_store.rs  — vocabulary.json, built once from the
//                     corpus and reused by every later run
//
//   metrics.rs      — per-macrobatch loss and fit time, appended
//                     to metrics.csv
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary persistence
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
