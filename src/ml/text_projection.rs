// ============================================================
// Layer 5 — Original-Text Projection
// ============================================================
// Maps a normalised prediction back onto the original document
// text, recovering case, accents and punctuation.
//
//   pred_text = "steve smith"
//   orig_text = "Steve Smith's"
//   result    = "Steve Smith"
//
// Steps:
//   1. Normalise orig_text the way the tokenizer does and join
//      the pieces with single spaces
//   2. Find pred_text in that string
//   3. Drop spaces from both strings; if the remaining character
//      counts match, characters are assumed to align one to one
//   4. Carry the match start/end through the space-free alignment
//      back to character offsets in orig_text and slice
//
// Any step that fails returns orig_text unchanged.

use std::collections::HashMap;

use crate::data::normalizer::BasicTokenizer;

/// Best-effort substring of `orig_text` matching `pred_text`.
pub fn project_to_original(pred_text: &str, orig_text: &str, do_lower_case: bool) -> String {
    if pred_text.is_empty() {
        return orig_text.to_string();
    }

    let tok_text = match BasicTokenizer::new(do_lower_case).tokenize(orig_text) {
        Ok(pieces) => pieces.join(" "),
        Err(e) => {
            tracing::debug!("Unable to normalise '{}': {}", orig_text, e);
            return orig_text.to_string();
        }
    };

    let Some(byte_start) = tok_text.find(pred_text) else {
        tracing::debug!("Unable to find text '{}' in '{}'", pred_text, orig_text);
        return orig_text.to_string();
    };
    let start_position = tok_text[..byte_start].chars().count();
    let end_position   = start_position + pred_text.chars().count() - 1;

    let orig_ns_to_s = strip_spaces(orig_text);
    let tok_ns_to_s  = strip_spaces(&tok_text);

    if orig_ns_to_s.len() != tok_ns_to_s.len() {
        tracing::debug!(
            "Length not equal after stripping spaces: '{}' vs '{}'",
            orig_text,
            tok_text
        );
        return orig_text.to_string();
    }

    let tok_s_to_ns: HashMap<usize, usize> = tok_ns_to_s
        .iter()
        .enumerate()
        .map(|(ns, &s)| (s, ns))
        .collect();

    let to_orig = |tok_position: usize| {
        tok_s_to_ns
            .get(&tok_position)
            .and_then(|&ns| orig_ns_to_s.get(ns).copied())
    };

    let Some(orig_start) = to_orig(start_position) else {
        tracing::debug!("Couldn't map start position");
        return orig_text.to_string();
    };
    let Some(orig_end) = to_orig(end_position) else {
        tracing::debug!("Couldn't map end position");
        return orig_text.to_string();
    };
    if orig_end < orig_start {
        return orig_text.to_string();
    }

    orig_text
        .chars()
        .skip(orig_start)
        .take(orig_end - orig_start + 1)
        .collect()
}

/// Character index (in `text`) of every non-space character, in order.
fn strip_spaces(text: &str) -> Vec<usize> {
    text.chars()
        .enumerate()
        .filter(|&(_, c)| c != ' ')
        .map(|(i, _)| i)
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_case_and_drops_trailing_possessive() {
        assert_eq!(project_to_original("steve smith", "Steve Smith's", true), "Steve Smith");
    }

    #[test]
    fn test_recovers_punctuation_inside_word() {
        assert_eq!(project_to_original("1895", "(1895-1943).", true), "1895");
        assert_eq!(project_to_original("1895 - 1943", "(1895-1943).", true), "1895-1943");
    }

    #[test]
    fn test_recovers_accents() {
        assert_eq!(project_to_original("beyonce", "Beyoncé's", true), "Beyoncé");
    }

    #[test]
    fn test_non_latin_punctuation_splits_words() {
        // U+061F ARABIC QUESTION MARK separates "hi" from "there"
        assert_eq!(project_to_original("hi \u{061F} there", "Hi\u{061F}there's", true), "Hi\u{061F}there");
        assert_eq!(project_to_original("there", "Hi\u{061F}there's", true), "there");
    }

    #[test]
    fn test_missing_text_falls_back_to_original() {
        assert_eq!(project_to_original("jones", "Steve Smith's", true), "Steve Smith's");
    }

    #[test]
    fn test_cased_projection() {
        assert_eq!(project_to_original("Smith", "Steve Smith's", false), "Smith");
        // lowercased prediction cannot be found in cased normalisation
        assert_eq!(project_to_original("smith", "Steve Smith's", false), "Steve Smith's");
    }

    #[test]
    fn test_empty_prediction_falls_back() {
        assert_eq!(project_to_original("", "abc", true), "abc");
    }
}
