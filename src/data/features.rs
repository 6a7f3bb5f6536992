// ============================================================
// Layer 4 — Window Builder
// ============================================================
// Turns QaExamples into fixed-length Features.
//
// Per example:
//   1. Tokenize the question, keep at most max_query_length pieces
//   2. Tokenize every document word on its own and concatenate,
//      remembering which word each subword came from
//   3. Budget for the document slice:
//        max_seq_length - question pieces - 3   ([CLS] + 2 x [SEP])
//   4. Cut the subword stream into overlapping DocSpans (windowing)
//   5. Assemble each window:
//        [CLS] question [SEP] slice [SEP] [PAD]...
//      with segment ids, the word map and the max-context flags
//   6. Training only: place the gold span inside each window,
//      or point it at [CLS] (position 0) when it does not fit
//
// Three coordinate systems meet here:
//   word index     → example.doc_tokens
//   subword index  → all_doc_tokens (the whole document stream)
//   window index   → feature.tokens (one window)

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    max_context::is_max_context,
    span_aligner::{improve_answer_span, project_word_span},
    windowing::Windower,
};
use crate::domain::{
    error::PipelineError,
    example::{GoldAnswer, QaExample},
    feature::{DocSpan, Feature},
    traits::SubwordTokenizer,
};

pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";

/// Unique ids are handed out sequentially from here
const FIRST_UNIQUE_ID: u64 = 1_000_000_000;

/// Number of features dumped in full at debug level
const LOGGED_FEATURES: usize = 20;

// ─── Window Configuration ─────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Total window length in subwords, including markers and padding
    pub max_seq_length:   usize,
    /// Maximum step between consecutive document slices
    pub doc_stride:       usize,
    /// Questions longer than this are truncated (prefix kept)
    pub max_query_length: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_seq_length:   384,
            doc_stride:       128,
            max_query_length: 64,
        }
    }
}

impl WindowConfig {
    /// A full-length question must still leave room for at least one
    /// document subword.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.doc_stride == 0 {
            return Err(PipelineError::Config("doc_stride must be at least 1".to_string()));
        }
        if self.max_query_length + 3 >= self.max_seq_length {
            return Err(PipelineError::Config(format!(
                "max_query_length ({}) + 3 leaves no document room in max_seq_length ({})",
                self.max_query_length, self.max_seq_length
            )));
        }
        Ok(())
    }
}

// ─── FeatureBuilder ───────────────────────────────────────────────────────────
pub struct FeatureBuilder<'a, T: SubwordTokenizer + ?Sized> {
    tokenizer:   &'a T,
    config:      WindowConfig,
    is_training: bool,
}

/// Subword view of one example's document.
struct DocSubwords {
    tokens:            Vec<String>,
    /// subword index → word index
    tok_to_orig_index: Vec<usize>,
    /// word index → first subword index
    orig_to_tok_index: Vec<usize>,
}

impl<'a, T: SubwordTokenizer + ?Sized> FeatureBuilder<'a, T> {
    pub fn new(tokenizer: &'a T, config: WindowConfig, is_training: bool) -> Self {
        Self { tokenizer, config, is_training }
    }

    /// Build every window of every example, in example order.
    pub fn build(&self, examples: &[QaExample]) -> Result<Vec<Feature>> {
        self.config.validate()?;

        let mut features  = Vec::new();
        let mut unique_id = FIRST_UNIQUE_ID;

        for (example_index, example) in examples.iter().enumerate() {
            let built = self
                .build_example(example_index, example, &mut unique_id)
                .with_context(|| format!("Cannot build windows for question '{}'", example.qas_id))?;
            features.extend(built);
        }

        tracing::info!(
            "Built {} features from {} examples (max_seq_length={}, doc_stride={})",
            features.len(),
            examples.len(),
            self.config.max_seq_length,
            self.config.doc_stride,
        );
        Ok(features)
    }

    fn build_example(
        &self,
        example_index: usize,
        example:       &QaExample,
        unique_id:     &mut u64,
    ) -> Result<Vec<Feature>> {
        // ── Steps 1-2: question and document subwords ─────────────────────────
        let mut query_tokens = self.tokenizer.tokenize(&example.question_text)?;
        query_tokens.truncate(self.config.max_query_length);

        let doc = self.tokenize_document(example)?;

        // ── Step 6 (prep): gold span in subword coordinates ───────────────────
        let gold_span = match (&example.gold, self.is_training) {
            (Some(GoldAnswer::Span { text, start_word, end_word }), true) => {
                let (start, end) = project_word_span(
                    &doc.orig_to_tok_index,
                    doc.tokens.len(),
                    *start_word,
                    *end_word,
                );
                Some(improve_answer_span(&doc.tokens, start, end, self.tokenizer, text)?)
            }
            _ => None,
        };

        // ── Steps 3-4: budget and windows ─────────────────────────────────────
        let max_tokens_for_doc = self
            .config
            .max_seq_length
            .checked_sub(query_tokens.len() + 3)
            .filter(|&budget| budget > 0)
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "question of {} subwords leaves no room for the document in {} positions",
                    query_tokens.len(),
                    self.config.max_seq_length
                ))
            })?;

        let doc_spans = Windower::new(max_tokens_for_doc, self.config.doc_stride)?
            .spans(doc.tokens.len());

        // ── Step 5: assemble each window ──────────────────────────────────────
        let mut features = Vec::with_capacity(doc_spans.len());
        for (doc_span_index, doc_span) in doc_spans.iter().enumerate() {
            let mut feature = self.assemble_window(
                example_index,
                doc_span_index,
                &doc_spans,
                &query_tokens,
                &doc,
            )?;
            feature.unique_id     = *unique_id;
            feature.is_impossible = example.is_impossible();

            if self.is_training {
                let (start, end) = gold_positions(example, gold_span, doc_span, query_tokens.len());
                feature.start_position = Some(start);
                feature.end_position   = Some(end);
            }

            if *unique_id < FIRST_UNIQUE_ID + LOGGED_FEATURES as u64 {
                log_feature(&feature);
            }

            *unique_id += 1;
            features.push(feature);
        }

        Ok(features)
    }

    fn tokenize_document(&self, example: &QaExample) -> Result<DocSubwords> {
        let mut tokens            = Vec::new();
        let mut tok_to_orig_index = Vec::new();
        let mut orig_to_tok_index = Vec::with_capacity(example.doc_tokens.len());

        for (word_index, word) in example.doc_tokens.iter().enumerate() {
            orig_to_tok_index.push(tokens.len());
            for sub_token in self.tokenizer.tokenize(word)? {
                tok_to_orig_index.push(word_index);
                tokens.push(sub_token);
            }
        }

        Ok(DocSubwords { tokens, tok_to_orig_index, orig_to_tok_index })
    }

    fn assemble_window(
        &self,
        example_index:  usize,
        doc_span_index: usize,
        doc_spans:      &[DocSpan],
        query_tokens:   &[String],
        doc:            &DocSubwords,
    ) -> Result<Feature> {
        let doc_span = doc_spans[doc_span_index];
        let real_len = query_tokens.len() + doc_span.length + 3;

        let mut tokens               = Vec::with_capacity(real_len);
        let mut segment_ids          = Vec::with_capacity(self.config.max_seq_length);
        let mut token_to_orig_map    = Vec::with_capacity(real_len);
        let mut token_is_max_context = Vec::with_capacity(real_len);

        // [CLS] question [SEP] → segment 0, unmapped
        tokens.push(CLS_TOKEN.to_string());
        tokens.extend(query_tokens.iter().cloned());
        tokens.push(SEP_TOKEN.to_string());
        segment_ids.resize(tokens.len(), 0);
        token_to_orig_map.resize(tokens.len(), None);
        token_is_max_context.resize(tokens.len(), false);

        // document slice → segment 1, mapped to words
        for split_token_index in doc_span.start..doc_span.end_exclusive() {
            token_to_orig_map.push(Some(doc.tok_to_orig_index[split_token_index]));
            token_is_max_context.push(is_max_context(doc_spans, doc_span_index, split_token_index));
            tokens.push(doc.tokens[split_token_index].clone());
            segment_ids.push(1);
        }

        tokens.push(SEP_TOKEN.to_string());
        segment_ids.push(1);
        token_to_orig_map.push(None);
        token_is_max_context.push(false);

        let mut input_ids = self.tokenizer.convert_tokens_to_ids(&tokens)?;
        ensure!(
            input_ids.len() == tokens.len(),
            "tokenizer returned {} ids for {} tokens",
            input_ids.len(),
            tokens.len()
        );
        let mut input_mask = vec![1u32; input_ids.len()];

        // Zero-pad up to the window length
        let seq_len = self.config.max_seq_length;
        input_ids.resize(seq_len, self.tokenizer.pad_id());
        input_mask.resize(seq_len, 0);
        segment_ids.resize(seq_len, 0);

        ensure!(input_ids.len() == seq_len, "input_ids length {} != {seq_len}", input_ids.len());
        ensure!(input_mask.len() == seq_len, "input_mask length {} != {seq_len}", input_mask.len());
        ensure!(segment_ids.len() == seq_len, "segment_ids length {} != {seq_len}", segment_ids.len());

        Ok(Feature {
            unique_id: 0,
            example_index,
            doc_span_index,
            tokens,
            token_to_orig_map,
            token_is_max_context,
            input_ids,
            input_mask,
            segment_ids,
            start_position: None,
            end_position: None,
            is_impossible: false,
        })
    }
}

/// Convenience wrapper over FeatureBuilder.
pub fn convert_examples_to_features<T: SubwordTokenizer + ?Sized>(
    examples:    &[QaExample],
    tokenizer:   &T,
    config:      WindowConfig,
    is_training: bool,
) -> Result<Vec<Feature>> {
    FeatureBuilder::new(tokenizer, config, is_training).build(examples)
}

/// Gold start/end inside one window, (0, 0) when the answer is not
/// fully contained in the window's slice or the example is unanswerable.
fn gold_positions(
    example:        &QaExample,
    gold_span:      Option<(usize, usize)>,
    doc_span:       &DocSpan,
    query_len:      usize,
) -> (usize, usize) {
    if example.is_impossible() {
        return (0, 0);
    }
    match gold_span {
        Some((tok_start, tok_end)) if doc_span.contains(tok_start) && doc_span.contains(tok_end) => {
            let doc_offset = query_len + 2;
            (
                tok_start - doc_span.start + doc_offset,
                tok_end - doc_span.start + doc_offset,
            )
        }
        _ => (0, 0),
    }
}

fn log_feature(feature: &Feature) {
    tracing::debug!(
        unique_id      = feature.unique_id,
        example_index  = feature.example_index,
        doc_span_index = feature.doc_span_index,
        "feature tokens: {}",
        feature.tokens.join(" ")
    );
    let word_map: Vec<String> = feature
        .token_to_orig_map
        .iter()
        .enumerate()
        .filter_map(|(pos, word)| word.map(|w| format!("{pos}:{w}")))
        .collect();
    tracing::debug!("token_to_orig_map: {}", word_map.join(" "));

    if feature.is_impossible {
        tracing::debug!("impossible example");
    } else if let (Some(start), Some(end)) = (feature.start_position, feature.end_position) {
        if start > 0 {
            tracing::debug!(
                "start_position: {start}, end_position: {end}, answer: {}",
                feature.tokens[start..=end].join(" ")
            );
        }
    }
}
