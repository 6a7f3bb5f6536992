// ============================================================
// Layer 4 — Document Windowing
// ============================================================
// Splits an example's document subword stream into overlapping
// windows (DocSpans) that each fit the token budget left over
// after [CLS] question [SEP] ... [SEP].
//
// Sliding window with stride:
//   - each window takes up to `max_tokens_for_doc` subwords
//   - if it does not reach the end, the next window starts
//     min(window length, doc_stride) subwords later
//   - stop as soon as a window reaches the end of the stream
//
// Example with max_tokens_for_doc=5, doc_stride=3, 10 subwords:
//   Span 0:  start 0, length 5   (0-4)
//   Span 1:  start 3, length 5   (3-7)
//   Span 2:  start 6, length 4   (6-9, reaches the end)
//
// Every subword is covered, consecutive spans overlap by at most
// `max_tokens_for_doc - doc_stride`.
//
// Reference: Devlin et al. (2019) BERT, SQuAD sliding window

use crate::domain::{error::PipelineError, feature::DocSpan};

pub struct Windower {
    /// Subword budget for the document slice of one window
    max_tokens_for_doc: usize,
    /// Maximum step between window starts
    doc_stride: usize,
}

impl Windower {
    /// Fails when either value is zero, which would make the
    /// window loop unable to advance.
    pub fn new(max_tokens_for_doc: usize, doc_stride: usize) -> Result<Self, PipelineError> {
        if max_tokens_for_doc == 0 {
            return Err(PipelineError::Config(
                "no room left for document tokens in the window".to_string(),
            ));
        }
        if doc_stride == 0 {
            return Err(PipelineError::Config("doc_stride must be at least 1".to_string()));
        }
        Ok(Self { max_tokens_for_doc, doc_stride })
    }

    /// Partition `[0, total)` into overlapping spans.
    /// An empty stream yields a single zero-length span so the
    /// example still gets one window.
    pub fn spans(&self, total: usize) -> Vec<DocSpan> {
        if total == 0 {
            return vec![DocSpan::new(0, 0)];
        }

        let mut spans = Vec::new();
        let mut start = 0usize;

        loop {
            let length = (total - start).min(self.max_tokens_for_doc);
            spans.push(DocSpan::new(start, length));

            if start + length == total {
                break;
            }
            start += length.min(self.doc_stride);
        }

        spans
    }
}
