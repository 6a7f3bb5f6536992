// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File formats and external resources used by more than one
// use case:
//
//   tokenizer_store.rs   — loads the subword tokenizer
//                          (tokenizer.json or vocab.txt) and
//                          adapts it to SubwordTokenizer
//
//   feature_cache.rs     — stores built features on disk keyed
//                          by corpus, tokenizer and window
//                          settings
//
//   raw_results.rs       — reads the external model's per-window
//                          start/end scores
//
//   prediction_writer.rs — writes predictions, n-best lists and
//                          null odds as JSON
//
// Reference: Rust Book §9 (Error Handling with anyhow)

/// Tokenizer loading and trait adapter
pub mod tokenizer_store;

/// On-disk feature cache
pub mod feature_cache;

/// Raw model score input
pub mod raw_results;

/// Prediction output files
pub mod prediction_writer;
