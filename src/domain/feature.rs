// ============================================================
// Layer 3 — Feature (Window) Domain Types
// ============================================================
// A Feature is one fixed-length model input cut from one
// QaExample:
//
//   [CLS] question subwords [SEP] document slice [SEP] [PAD]...
//     0   ───── segment 0 ─────   ─── segment 1 ───    0
//
// Long documents produce several Features whose document slices
// overlap. Each Feature remembers which slice of the example's
// subword stream it covers (DocSpan) and, for every document
// position, which original word it came from.
//
// Position maps are dense vectors indexed by token position:
//   token_to_orig_map[i]    → Some(word index) inside the slice,
//                             None for [CLS], question and [SEP]
//   token_is_max_context[i] → true when this window owns position i

use serde::{Deserialize, Serialize};

/// Contiguous slice `[start, start + length)` of an example's
/// document subword stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocSpan {
    pub start:  usize,
    pub length: usize,
}

impl DocSpan {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// One past the last covered subword
    pub fn end_exclusive(&self) -> usize {
        self.start + self.length
    }

    pub fn contains(&self, position: usize) -> bool {
        position >= self.start && position < self.end_exclusive()
    }
}

/// One fully assembled and padded window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Globally unique id, used to join raw model results
    pub unique_id: u64,

    /// Index of the owning example in the example list
    pub example_index: usize,

    /// Ordinal of this window among the example's windows
    pub doc_span_index: usize,

    /// Real (unpadded) token strings
    pub tokens: Vec<String>,

    pub token_to_orig_map: Vec<Option<usize>>,

    pub token_is_max_context: Vec<bool>,

    /// Padded to max_seq_length
    pub input_ids: Vec<u32>,

    /// 1 = real token, 0 = padding
    pub input_mask: Vec<u32>,

    pub segment_ids: Vec<u32>,

    /// Gold start/end inside this window (training only);
    /// 0 points at [CLS] and means "not answerable here"
    pub start_position: Option<usize>,
    pub end_position:   Option<usize>,

    pub is_impossible: bool,
}

impl Feature {
    /// Original word index for a window position, if it lies in the
    /// document slice
    pub fn orig_index(&self, position: usize) -> Option<usize> {
        self.token_to_orig_map.get(position).copied().flatten()
    }

    pub fn is_max_context(&self, position: usize) -> bool {
        self.token_is_max_context.get(position).copied().unwrap_or(false)
    }

    /// Fixed window width (including padding)
    pub fn seq_len(&self) -> usize {
        self.input_ids.len()
    }
}

/// Model output for one Feature: one start and one end score per
/// window position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    pub unique_id:    u64,
    pub start_logits: Vec<f32>,
    pub end_logits:   Vec<f32>,
}
