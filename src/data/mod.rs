// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the raw SQuAD JSON file and model-ready
// fixed-length windows.
//
//   SQuAD JSON
//       │
//       ▼
//   SquadLoader       → questions + whitespace-split documents
//       │
//       ▼
//   FeatureBuilder    → subword streams, gold span projection
//       │                (span_aligner), sliding windows
//       │                (windowing), window ownership
//       │                (max_context)
//       ▼
//   FeatureBatcher    → flat [batch, seq_len] arrays for the model
//
// Each module is responsible for exactly one step.

/// Reads SQuAD JSON into QaExamples
pub mod loader;

/// Whitespace, accent, case and punctuation normalisation
pub mod normalizer;

/// Splits a subword stream into overlapping DocSpans
pub mod windowing;

/// Decides which window owns a subword
pub mod max_context;

/// Word span → tightest subword span
pub mod span_aligner;

/// Builds padded Features from examples
pub mod features;

/// Stacks Features into model batches
pub mod batcher;

#[cfg(test)]
pub mod test_support;
