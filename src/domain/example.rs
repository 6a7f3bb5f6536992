// ============================================================
// Layer 3 — QaExample Domain Type
// ============================================================
// One (question, document) pair as read from the corpus.
//
// The document is kept as whitespace-separated word tokens,
// never as raw characters. Every later coordinate system
// (subword positions, window positions) maps back onto these
// word indices, and the final answer text is rebuilt from them.
//
// Gold annotations only exist in training mode:
//   - GoldAnswer::Span         → answerable, word-level span
//   - GoldAnswer::Unanswerable → SQuAD 2.0 "is_impossible"
//
// Reference: Rajpurkar et al. (2018) SQuAD 2.0

use serde::{Deserialize, Serialize};

/// Gold annotation for a training example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoldAnswer {
    /// The answer covers document words `start_word..=end_word`
    Span {
        text:       String,
        start_word: usize,
        end_word:   usize,
    },
    /// The question has no answer in this document
    Unanswerable,
}

/// A single question over a single document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaExample {
    /// Stable question identifier from the corpus
    pub qas_id: String,

    pub question_text: String,

    /// Document split on whitespace, punctuation kept attached
    pub doc_tokens: Vec<String>,

    /// `None` in prediction mode
    pub gold: Option<GoldAnswer>,
}

impl QaExample {
    pub fn new(
        qas_id:        impl Into<String>,
        question_text: impl Into<String>,
        doc_tokens:    Vec<String>,
        gold:          Option<GoldAnswer>,
    ) -> Self {
        Self {
            qas_id:        qas_id.into(),
            question_text: question_text.into(),
            doc_tokens,
            gold,
        }
    }

    /// True only for training examples explicitly marked unanswerable
    pub fn is_impossible(&self) -> bool {
        matches!(self.gold, Some(GoldAnswer::Unanswerable))
    }

    /// Document words `start..=end` joined with single spaces.
    /// Indices are clamped to the document.
    pub fn doc_text(&self, start: usize, end: usize) -> String {
        if self.doc_tokens.is_empty() || start > end {
            return String::new();
        }
        let end = end.min(self.doc_tokens.len() - 1);
        self.doc_tokens
            .get(start..=end)
            .map(|words| words.join(" "))
            .unwrap_or_default()
    }
}
