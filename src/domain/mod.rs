// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits describing the core concepts:
// the frozen vocabulary, the encoded corpus, and the seams to
// the sequence model.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Token ↔ id mapping with reserved tokens
pub mod vocabulary;

// Encoded dialog lines and training pairs
pub mod corpus;

// SequenceModel, DecodeSession, Persistable
pub mod traits;
