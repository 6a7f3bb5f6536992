// ============================================================
// Layer 5 — Decoding Layer
// ============================================================
// Everything that happens after the external model has scored
// each window. Nothing here knows how the scores were produced;
// it only needs the features and their raw start/end scores.
//
//   scoring.rs         — top-n positions and softmax
//
//   text_projection.rs — maps normalised subword text back onto
//                        the original document characters
//
//   aggregator.rs      — n-best span decoding across all of an
//                        example's windows, with optional
//                        "no answer" predictions
//
// Reference: Devlin et al. (2019) BERT

/// Top-n positions and softmax over raw scores
pub mod scoring;

/// Recover original document text for a predicted span
pub mod text_projection;

/// Per-example n-best decoding
pub mod aggregator;
