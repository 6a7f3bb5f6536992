// ============================================================
// Layer 4 — SQuAD Corpus Loader
// ============================================================
// Reads a SQuAD-style JSON file into QaExamples.
//
// File layout:
//   { "version": "v2.0",
//     "data": [ { "title": ...,
//                 "paragraphs": [ { "context": "...",
//                                   "qas": [ { "id", "question",
//                                              "answers": [{ "text", "answer_start" }],
//                                              "is_impossible" } ] } ] } ] }
//
// Each context is split into whitespace words once, recording for
// every character which word it belongs to. Answer character
// offsets are converted to word indices with that table.
//
// Training mode:
//   - answerable questions need exactly one answer (fatal otherwise)
//   - v2.x questions flagged is_impossible become Unanswerable
//   - answers whose text cannot be found in the mapped words are
//     skipped with a warning
// Prediction mode ignores all gold fields.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::PathBuf};

use crate::domain::{
    error::PipelineError,
    example::{GoldAnswer, QaExample},
    traits::ExampleSource,
};

// ─── Corpus schema ────────────────────────────────────────────────────────────
#[derive(Debug, Deserialize)]
pub struct SquadFile {
    pub version: String,
    pub data:    Vec<SquadArticle>,
}

#[derive(Debug, Deserialize)]
pub struct SquadArticle {
    #[serde(default)]
    pub title:      String,
    pub paragraphs: Vec<SquadParagraph>,
}

#[derive(Debug, Deserialize)]
pub struct SquadParagraph {
    pub context: String,
    pub qas:     Vec<SquadQa>,
}

#[derive(Debug, Deserialize)]
pub struct SquadQa {
    pub id:       String,
    pub question: String,
    #[serde(default)]
    pub answers:  Vec<SquadAnswer>,
    #[serde(default)]
    pub is_impossible: bool,
}

#[derive(Debug, Deserialize)]
pub struct SquadAnswer {
    pub text:         String,
    pub answer_start: usize,
}

// ─── SquadLoader ──────────────────────────────────────────────────────────────
pub struct SquadLoader {
    path:        PathBuf,
    is_training: bool,
}

impl SquadLoader {
    pub fn new(path: impl Into<PathBuf>, is_training: bool) -> Self {
        Self { path: path.into(), is_training }
    }
}

impl ExampleSource for SquadLoader {
    fn load_examples(&self) -> Result<Vec<QaExample>> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read corpus '{}'", self.path.display()))?;
        let file: SquadFile = serde_json::from_str(&json)
            .with_context(|| format!("Cannot parse corpus '{}'", self.path.display()))?;

        let examples = read_squad_examples(file, self.is_training)?;
        tracing::info!(
            "Loaded {} examples from '{}' (training={})",
            examples.len(),
            self.path.display(),
            self.is_training
        );
        Ok(examples)
    }
}

/// SQuAD word separators
fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\u{202F}')
}

/// Split a context into words.
///
/// Returns the words and, for every character, the index of the
/// word it belongs to. Whitespace maps to the preceding word;
/// leading whitespace maps to None.
pub fn segment_document(text: &str) -> (Vec<String>, Vec<Option<usize>>) {
    let mut doc_tokens: Vec<String>          = Vec::new();
    let mut char_to_word: Vec<Option<usize>> = Vec::with_capacity(text.len());
    let mut prev_is_whitespace               = true;

    for c in text.chars() {
        if is_whitespace(c) {
            prev_is_whitespace = true;
        } else {
            if prev_is_whitespace {
                doc_tokens.push(c.to_string());
            } else if let Some(word) = doc_tokens.last_mut() {
                word.push(c);
            }
            prev_is_whitespace = false;
        }
        char_to_word.push(doc_tokens.len().checked_sub(1));
    }

    (doc_tokens, char_to_word)
}

/// Convert a parsed corpus into examples, one per question.
pub fn read_squad_examples(file: SquadFile, is_training: bool) -> Result<Vec<QaExample>> {
    let honours_impossible = file.version.starts_with("v2");
    let mut examples = Vec::new();
    let mut skipped  = 0usize;

    for article in file.data {
        tracing::debug!("Reading article '{}' ({} paragraphs)", article.title, article.paragraphs.len());
        for paragraph in article.paragraphs {
            let (doc_tokens, char_to_word) = segment_document(&paragraph.context);

            for qa in paragraph.qas {
                let gold = if is_training {
                    let is_impossible = honours_impossible && qa.is_impossible;
                    match gold_answer(&qa, is_impossible, &doc_tokens, &char_to_word)? {
                        Some(gold) => Some(gold),
                        None => {
                            skipped += 1;
                            continue;
                        }
                    }
                } else {
                    None
                };

                examples.push(QaExample::new(qa.id, qa.question, doc_tokens.clone(), gold));
            }
        }
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} questions whose answer text could not be recovered", skipped);
    }
    Ok(examples)
}

/// Gold annotation for one training question.
/// `Ok(None)` means the record should be skipped.
fn gold_answer(
    qa:            &SquadQa,
    is_impossible: bool,
    doc_tokens:    &[String],
    char_to_word:  &[Option<usize>],
) -> Result<Option<GoldAnswer>, PipelineError> {
    if is_impossible {
        return Ok(Some(GoldAnswer::Unanswerable));
    }
    if qa.answers.len() != 1 {
        return Err(PipelineError::Format(format!(
            "question '{}' must have exactly 1 answer for training, found {}",
            qa.id,
            qa.answers.len()
        )));
    }

    let answer     = &qa.answers[0];
    let answer_len = answer.text.chars().count();
    if answer_len == 0 {
        return Err(PipelineError::Format(format!("question '{}' has an empty answer", qa.id)));
    }

    let word_at = |char_index: usize| {
        char_to_word.get(char_index).copied().flatten().ok_or_else(|| {
            PipelineError::Format(format!(
                "answer of question '{}' at character {} lies outside the context",
                qa.id, char_index
            ))
        })
    };
    let start_word = word_at(answer.answer_start)?;
    let end_word   = word_at(answer.answer_start + answer_len - 1)?;

    let actual_text  = doc_tokens[start_word..=end_word].join(" ");
    let cleaned_text = answer.text.split_whitespace().collect::<Vec<_>>().join(" ");
    if !actual_text.contains(&cleaned_text) {
        tracing::warn!(
            "Could not find answer '{}' in '{}' (question '{}')",
            cleaned_text,
            actual_text,
            qa.id
        );
        return Ok(None);
    }

    Ok(Some(GoldAnswer::Span {
        text: answer.text.clone(),
        start_word,
        end_word,
    }))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &str = r#"{
        "version": "v2.0",
        "data": [{
            "title": "Smith",
            "paragraphs": [{
                "context": "The leader was John Smith (1895-1943).",
                "qas": [
                    {"id": "a", "question": "Who led?",
                     "answers": [{"text": "John Smith", "answer_start": 15}],
                     "is_impossible": false},
                    {"id": "b", "question": "Who followed?",
                     "answers": [], "is_impossible": true},
                    {"id": "c", "question": "When born?",
                     "answers": [{"text": "1895", "answer_start": 27}]}
                ]
            }]
        }]
    }"#;

    fn parse(json: &str, is_training: bool) -> Result<Vec<QaExample>> {
        read_squad_examples(serde_json::from_str(json)?, is_training)
    }

    #[test]
    fn test_article_title_is_optional() {
        let file: SquadFile = serde_json::from_str(CORPUS).unwrap();
        assert_eq!(file.data[0].title, "Smith");

        let untitled: SquadFile = serde_json::from_str(
            r#"{"version": "v1.1", "data": [{"paragraphs": []}]}"#,
        )
        .unwrap();
        assert_eq!(untitled.data[0].title, "");
        assert!(read_squad_examples(untitled, false).unwrap().is_empty());
    }

    #[test]
    fn test_segments_on_whitespace_only() {
        let (words, map) = segment_document(" ab  c\u{202F}d");
        assert_eq!(words, vec!["ab", "c", "d"]);
        assert_eq!(map, vec![None, Some(0), Some(0), Some(0), Some(0), Some(1), Some(1), Some(2)]);
    }

    #[test]
    fn test_every_word_has_a_character() {
        let text = "Steve  Smith's\tcar (1895-1943).\nEnd";
        let (words, map) = segment_document(text);
        for w in 0..words.len() {
            assert!(map.contains(&Some(w)), "word {w} has no character");
        }
        // segmentation is idempotent
        let (again, _) = segment_document(&words.join(" "));
        assert_eq!(again, words);
    }

    #[test]
    fn test_training_examples_get_word_spans() {
        let examples = parse(CORPUS, true).unwrap();
        assert_eq!(examples.len(), 3);

        assert_eq!(examples[0].gold, Some(GoldAnswer::Span {
            text: "John Smith".to_string(), start_word: 3, end_word: 4,
        }));
        assert!(examples[1].is_impossible());
        // "1895" sits inside the word "(1895-1943)."
        assert_eq!(examples[2].gold, Some(GoldAnswer::Span {
            text: "1895".to_string(), start_word: 5, end_word: 5,
        }));
    }

    #[test]
    fn test_prediction_mode_has_no_gold() {
        let examples = parse(CORPUS, false).unwrap();
        assert_eq!(examples.len(), 3);
        assert!(examples.iter().all(|e| e.gold.is_none()));
        assert_eq!(examples[0].doc_tokens.len(), 6);
    }

    #[test]
    fn test_missing_answer_is_a_format_error() {
        let json = r#"{"version": "v1.1", "data": [{"paragraphs": [{"context": "a b",
            "qas": [{"id": "x", "question": "?", "answers": []}]}]}]}"#;
        let err = parse(json, true).unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Format(_))));
    }

    #[test]
    fn test_impossible_flag_ignored_for_v1() {
        let json = r#"{"version": "v1.1", "data": [{"paragraphs": [{"context": "a b",
            "qas": [{"id": "x", "question": "?", "answers": [], "is_impossible": true}]}]}]}"#;
        assert!(parse(json, true).is_err());
    }

    #[test]
    fn test_unrecoverable_answer_is_skipped() {
        let json = r#"{"version": "v1.1", "data": [{"paragraphs": [{"context": "alpha beta",
            "qas": [{"id": "x", "question": "?", "answers": [{"text": "gamma", "answer_start": 0}]}]}]}]}"#;
        assert!(parse(json, true).unwrap().is_empty());
    }

    #[test]
    fn test_offset_outside_context_is_a_format_error() {
        let json = r#"{"version": "v1.1", "data": [{"paragraphs": [{"context": "alpha",
            "qas": [{"id": "x", "question": "?", "answers": [{"text": "alpha", "answer_start": 3}]}]}]}]}"#;
        assert!(parse(json, true).is_err());
    }
}
