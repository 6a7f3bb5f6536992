// ============================================================
// Layer 4 — Feature Batcher
// ============================================================
// Stacks Features into row-major batches for the external model.
//
// How batching works here:
//   Input:  N Features, each padded to length S
//   Output: FeatureBatch with flat arrays of N * S values
//
//   [f1_t1, f1_t2, ..., f1_tS, f2_t1, ..., fN_tS]  reshaped as [N, S]
//
// All Features are already padded to the same length by the
// window builder, so no dynamic padding happens here.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::domain::feature::Feature;

/// A batch of windows ready for the model forward pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBatch {
    pub batch_size: usize,
    pub seq_len:    usize,

    /// Joins each row back to its Feature and raw result
    pub unique_ids: Vec<u64>,

    /// Token ids, shape [batch_size, seq_len]
    pub input_ids: Vec<i64>,

    /// 1 = real token, 0 = padding, shape [batch_size, seq_len]
    pub attention_mask: Vec<i64>,

    /// 0 = question side, 1 = document side, shape [batch_size, seq_len]
    pub segment_ids: Vec<i64>,

    /// Gold positions, shape [batch_size]; training batches only
    pub start_positions: Option<Vec<i64>>,
    pub end_positions:   Option<Vec<i64>>,
}

#[derive(Debug, Clone)]
pub struct FeatureBatcher {
    batch_size: usize,
}

impl FeatureBatcher {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size: batch_size.max(1) }
    }

    /// Split features into consecutive batches, preserving order.
    pub fn batches(&self, features: &[Feature]) -> Result<Vec<FeatureBatch>> {
        features.chunks(self.batch_size).map(|chunk| self.batch(chunk)).collect()
    }

    /// Stack one slice of features into a batch.
    pub fn batch(&self, items: &[Feature]) -> Result<FeatureBatch> {
        let batch_size = items.len();
        let seq_len    = items.first().map(Feature::seq_len).unwrap_or(0);

        ensure!(
            items.iter().all(|f| f.seq_len() == seq_len),
            "all features in a batch must share one sequence length"
        );

        Ok(FeatureBatch {
            batch_size,
            seq_len,
            unique_ids:      items.iter().map(|f| f.unique_id).collect(),
            input_ids:       flatten(items.iter().map(|f| f.input_ids.as_slice())),
            attention_mask:  flatten(items.iter().map(|f| f.input_mask.as_slice())),
            segment_ids:     flatten(items.iter().map(|f| f.segment_ids.as_slice())),
            start_positions: gold(items.iter().map(|f| f.start_position)),
            end_positions:   gold(items.iter().map(|f| f.end_position)),
        })
    }
}

fn flatten<'a>(rows: impl Iterator<Item = &'a [u32]>) -> Vec<i64> {
    rows.flat_map(|row| row.iter().map(|&x| i64::from(x))).collect()
}

/// Gold positions only when every row carries them
fn gold(positions: impl Iterator<Item = Option<usize>>) -> Option<Vec<i64>> {
    positions
        .map(|p| p.map(|p| p as i64))
        .collect::<Option<Vec<_>>>()
        .filter(|v| !v.is_empty())
}
