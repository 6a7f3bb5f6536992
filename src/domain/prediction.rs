// ============================================================
// Layer 3 — Prediction Domain Types
// ============================================================
// The aggregated answer for one example, ready to be written
// out by the infrastructure layer.

use serde::{Deserialize, Serialize};

/// One ranked candidate answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NbestEntry {
    pub text:        String,
    pub probability: f32,
    pub start_logit: f32,
    pub end_logit:   f32,
}

/// Final decision for one example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamplePrediction {
    pub qas_id: String,

    /// Best answer text, "" when predicted unanswerable
    pub answer: String,

    /// Up to n_best entries, highest score first
    pub nbest: Vec<NbestEntry>,

    /// null score minus best non-null score; only with null answers enabled
    pub null_score_diff: Option<f32>,
}
