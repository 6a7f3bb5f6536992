// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain structs, enums and traits describing the pipeline's
// data: examples, windows, raw model scores and predictions.
//
// Rules for this layer:
//   - NO file I/O
//   - NO tokenizer or model implementations
//   - Only plain Rust types and the traits other layers implement

// A question over a word-tokenised document
pub mod example;

// Fixed-length windows and raw model output
pub mod feature;

// Ranked answers per example
pub mod prediction;

// Collaborator traits
pub mod traits;

// Typed pipeline failures
pub mod error;
