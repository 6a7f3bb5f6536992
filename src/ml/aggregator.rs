// ============================================================
// Layer 5 — Prediction Aggregator
// ============================================================
// Turns per-window start/end scores into one answer per example.
//
// Per example, over all of its windows:
//   1. Take the n_best highest start and end positions per window
//   2. (null mode) score "no answer" as start[0] + end[0] at the
//      [CLS] slot and keep the lowest such score across windows
//   3. Pair starts with ends, dropping pairs that leave the real
//      tokens, touch the question/markers, start on a position
//      this window does not own, run backwards or are too long
//   4. (null mode) add one "no answer" candidate
//   5. Rank by start + end score, dedupe on final text, keep n_best
//   6. Rebuild each text from the subwords and project it back
//      onto the original document words
//   7. Softmax the kept scores into probabilities
//   8. Pick the answer; in null mode predict "" when
//      null score - best non-null score > threshold
//
// Reference: Devlin et al. (2019) BERT, SQuAD 2.0 decoding

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::{
    error::PipelineError,
    example::QaExample,
    feature::{Feature, RawResult},
    prediction::{ExamplePrediction, NbestEntry},
};
use crate::ml::{
    scoring::{best_indexes, compute_softmax},
    text_projection::project_to_original,
};

/// Text used when no candidate survives filtering
const PLACEHOLDER_TEXT: &str = "empty";

// ─── Decoding Configuration ───────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Candidates kept per example (and per score array)
    pub n_best_size:       usize,
    /// Longest answer in subwords
    pub max_answer_length: usize,
    /// Must match the tokenizer's lowercasing
    pub do_lower_case:     bool,
    /// Allow "no answer" predictions (SQuAD 2.0)
    pub version_2_with_negative: bool,
    /// Predict "" when null score - best non-null score exceeds this
    pub null_score_diff_threshold: f32,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            n_best_size:               20,
            max_answer_length:         30,
            do_lower_case:             true,
            version_2_with_negative:   false,
            null_score_diff_threshold: 0.0,
        }
    }
}

impl DecodeConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.n_best_size == 0 {
            return Err(PipelineError::Config("n_best_size must be at least 1".to_string()));
        }
        if self.max_answer_length == 0 {
            return Err(PipelineError::Config("max_answer_length must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// One unranked (window, start, end) hypothesis.
/// start_index 0 marks the "no answer" candidate.
#[derive(Debug, Clone, Copy)]
struct PrelimPrediction {
    feature_index: usize,
    start_index:   usize,
    end_index:     usize,
    start_logit:   f32,
    end_logit:     f32,
}

impl PrelimPrediction {
    fn score(&self) -> f32 {
        self.start_logit + self.end_logit
    }
}

/// Lowest [CLS] score seen across an example's windows.
#[derive(Debug, Clone, Copy)]
struct NullScore {
    score:         f32,
    feature_index: usize,
    start_logit:   f32,
    end_logit:     f32,
}

// ─── Aggregation ──────────────────────────────────────────────────────────────

/// Decode every example from its windows' raw results.
pub fn aggregate_predictions(
    examples: &[QaExample],
    features: &[Feature],
    results:  &[RawResult],
    config:   &DecodeConfig,
) -> Result<Vec<ExamplePrediction>> {
    config.validate()?;

    let mut by_example: Vec<Vec<&Feature>> = vec![Vec::new(); examples.len()];
    for feature in features {
        ensure!(
            feature.example_index < examples.len(),
            "feature {} refers to example {} but only {} examples were loaded",
            feature.unique_id,
            feature.example_index,
            examples.len()
        );
        by_example[feature.example_index].push(feature);
    }

    let results: HashMap<u64, &RawResult> = results.iter().map(|r| (r.unique_id, r)).collect();

    tracing::info!(
        "Aggregating {} results over {} examples (n_best={}, null answers={})",
        results.len(),
        examples.len(),
        config.n_best_size,
        config.version_2_with_negative
    );

    examples
        .iter()
        .zip(&by_example)
        .map(|(example, features)| decode_example(example, features, &results, config))
        .collect()
}

fn decode_example(
    example:  &QaExample,
    features: &[&Feature],
    results:  &HashMap<u64, &RawResult>,
    config:   &DecodeConfig,
) -> Result<ExamplePrediction> {
    let (mut prelim, min_null) = collect_candidates(features, results, config)?;

    if config.version_2_with_negative {
        if let Some(null) = min_null {
            prelim.push(PrelimPrediction {
                feature_index: null.feature_index,
                start_index:   0,
                end_index:     0,
                start_logit:   null.start_logit,
                end_logit:     null.end_logit,
            });
        }
    }

    // stable: equal scores keep discovery order
    prelim.sort_by(|a, b| b.score().total_cmp(&a.score()));

    // ── Rank, rebuild text, dedupe ────────────────────────────────────────────
    let mut seen: HashSet<String>        = HashSet::new();
    let mut nbest: Vec<(String, f32, f32)> = Vec::new();

    for pred in &prelim {
        if nbest.len() >= config.n_best_size {
            break;
        }
        let text = if pred.start_index > 0 {
            match final_text(example, features[pred.feature_index], pred, config.do_lower_case) {
                Some(text) => text,
                None => continue,
            }
        } else {
            String::new()
        };

        if seen.insert(text.clone()) {
            nbest.push((text, pred.start_logit, pred.end_logit));
        }
    }

    if config.version_2_with_negative && !seen.contains("") {
        if let Some(null) = min_null {
            nbest.push((String::new(), null.start_logit, null.end_logit));
        }
    }

    if nbest.is_empty() {
        nbest.push((PLACEHOLDER_TEXT.to_string(), 0.0, 0.0));
    }

    // ── Probabilities ─────────────────────────────────────────────────────────
    let total_scores: Vec<f32> = nbest.iter().map(|(_, s, e)| s + e).collect();
    let probs = compute_softmax(&total_scores);

    let entries: Vec<NbestEntry> = nbest
        .into_iter()
        .zip(probs)
        .map(|((text, start_logit, end_logit), probability)| NbestEntry {
            text,
            probability,
            start_logit,
            end_logit,
        })
        .collect();

    // ── Final decision ────────────────────────────────────────────────────────
    let (answer, null_score_diff) = if config.version_2_with_negative {
        let best_non_null = entries.iter().find(|e| !e.text.is_empty());
        let score_null    = min_null.map(|n| n.score).unwrap_or(0.0);
        let best_score    = best_non_null.map(|e| e.start_logit + e.end_logit).unwrap_or(0.0);
        let diff          = score_null - best_score;

        let answer = match best_non_null {
            Some(entry) if diff <= config.null_score_diff_threshold => entry.text.clone(),
            _ => String::new(),
        };
        (answer, Some(diff))
    } else {
        (entries[0].text.clone(), None)
    };

    Ok(ExamplePrediction {
        qas_id: example.qas_id.clone(),
        answer,
        nbest: entries,
        null_score_diff,
    })
}

/// Valid (start, end) pairs from every window, plus the lowest null score.
fn collect_candidates(
    features: &[&Feature],
    results:  &HashMap<u64, &RawResult>,
    config:   &DecodeConfig,
) -> Result<(Vec<PrelimPrediction>, Option<NullScore>)> {
    let mut prelim   = Vec::new();
    let mut min_null: Option<NullScore> = None;

    for (feature_index, feature) in features.iter().enumerate() {
        let result = results
            .get(&feature.unique_id)
            .ok_or(PipelineError::MissingResult(feature.unique_id))?;
        ensure!(
            result.start_logits.len() == result.end_logits.len(),
            "feature {}: {} start scores but {} end scores",
            feature.unique_id,
            result.start_logits.len(),
            result.end_logits.len()
        );

        let start_indexes = best_indexes(&result.start_logits, config.n_best_size);
        let end_indexes   = best_indexes(&result.end_logits, config.n_best_size);

        if config.version_2_with_negative {
            if let (Some(&start_logit), Some(&end_logit)) =
                (result.start_logits.first(), result.end_logits.first())
            {
                let score = start_logit + end_logit;
                if min_null.map_or(true, |n| score < n.score) {
                    min_null = Some(NullScore { score, feature_index, start_logit, end_logit });
                }
            }
        }

        for &start_index in &start_indexes {
            for &end_index in &end_indexes {
                if !is_valid_span(feature, start_index, end_index, config.max_answer_length) {
                    continue;
                }
                prelim.push(PrelimPrediction {
                    feature_index,
                    start_index,
                    end_index,
                    start_logit: result.start_logits[start_index],
                    end_logit:   result.end_logits[end_index],
                });
            }
        }
    }

    Ok((prelim, min_null))
}

fn is_valid_span(feature: &Feature, start: usize, end: usize, max_answer_length: usize) -> bool {
    if start >= feature.tokens.len() || end >= feature.tokens.len() {
        return false;
    }
    if feature.orig_index(start).is_none() || feature.orig_index(end).is_none() {
        return false;
    }
    if !feature.is_max_context(start) {
        return false;
    }
    end >= start && end - start + 1 <= max_answer_length
}

/// Detokenized subwords of the span, projected onto the original words.
fn final_text(
    example:       &QaExample,
    feature:       &Feature,
    pred:          &PrelimPrediction,
    do_lower_case: bool,
) -> Option<String> {
    let orig_doc_start = feature.orig_index(pred.start_index)?;
    let orig_doc_end   = feature.orig_index(pred.end_index)?;

    let tok_text  = detokenize(feature.tokens.get(pred.start_index..=pred.end_index)?);
    let orig_text = example.doc_text(orig_doc_start, orig_doc_end);

    Some(project_to_original(&tok_text, &orig_text, do_lower_case))
}

/// Join subwords, glue "##" continuations back on, collapse whitespace.
pub fn detokenize(tokens: &[String]) -> String {
    let joined = tokens.join(" ").replace(" ##", "").replace("##", "");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}
