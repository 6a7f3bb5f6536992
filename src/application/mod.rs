// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: each use case wires the data,
// decoding and infrastructure layers together for one command.
//
//   featurize_use_case.rs — corpus → windows → model inputs
//   predict_use_case.rs   — corpus + raw scores → answers
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Corpus to model inputs
pub mod featurize_use_case;

// Raw scores to prediction files
pub mod predict_use_case;
