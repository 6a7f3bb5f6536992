// ============================================================
// Layer 4 — Span Aligner
// ============================================================
// Projects a word-level gold answer onto subword positions and
// then tightens it.
//
// Annotations are character based and first land on whitespace
// words. After subword tokenization a tighter match is often
// possible:
//
//   Context: The leader was John Smith (1895-1943).
//   Answer:  1895
//
// The whitespace word is "(1895-1943)." but its subwords are
// "( 1895 - 1943 ) .", so the answer can be matched exactly.
//
// When the annotator picked a character sub-span of a subword
// ("Japan" inside "Japanese") no exact match exists and the
// coarse word-level projection is kept.

use anyhow::Result;

use crate::domain::traits::SubwordTokenizer;

/// Map a word span onto the subword stream.
///
/// `orig_to_tok_index[w]` is the first subword of word `w`. The end
/// extends to the last subword of `end_word` (or the stream end when
/// `end_word` is the last word).
pub fn project_word_span(
    orig_to_tok_index: &[usize],
    total_subwords:    usize,
    start_word:        usize,
    end_word:          usize,
) -> (usize, usize) {
    let last_subword = total_subwords.saturating_sub(1);

    let tok_start = orig_to_tok_index
        .get(start_word)
        .copied()
        .unwrap_or(last_subword)
        .min(last_subword);

    let tok_end = match orig_to_tok_index.get(end_word + 1) {
        Some(&next_word_start) => next_word_start.saturating_sub(1),
        None                   => last_subword,
    };

    (tok_start, tok_end.max(tok_start).min(last_subword))
}

/// Find the tightest `[new_start, new_end]` inside `[input_start, input_end]`
/// whose subwords, joined by spaces, equal the tokenized answer text.
///
/// Scans `new_start` ascending and `new_end` descending; the first exact
/// match wins. Without a match the input span comes back unchanged.
pub fn improve_answer_span<T: SubwordTokenizer + ?Sized>(
    doc_subwords:     &[String],
    input_start:      usize,
    input_end:        usize,
    tokenizer:        &T,
    orig_answer_text: &str,
) -> Result<(usize, usize)> {
    let tok_answer_text = tokenizer.tokenize(orig_answer_text)?.join(" ");

    if doc_subwords.is_empty() || input_end >= doc_subwords.len() {
        return Ok((input_start, input_end));
    }

    for new_start in input_start..=input_end {
        for new_end in (new_start..=input_end).rev() {
            let text_span = doc_subwords[new_start..=new_end].join(" ");
            if text_span == tok_answer_text {
                return Ok((new_start, new_end));
            }
        }
    }

    Ok((input_start, input_end))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::TestWordPiece;

    fn subwords(s: &str) -> Vec<String> {
        s.split(' ').map(str::to_string).collect()
    }

    #[test]
    fn test_projects_multi_piece_words() {
        // words: the(0) puppeteer(1) smiled(2)
        // subwords: the | puppet ##eer | smiled
        let orig_to_tok = vec![0, 1, 3];
        assert_eq!(project_word_span(&orig_to_tok, 4, 1, 1), (1, 2));
        assert_eq!(project_word_span(&orig_to_tok, 4, 1, 2), (1, 3));
        assert_eq!(project_word_span(&orig_to_tok, 4, 0, 0), (0, 0));
    }

    #[test]
    fn test_tightens_to_exact_subword_match() {
        let tok = TestWordPiece::covering(&["The leader was John Smith (1895-1943)."], &[]);
        // "(1895-1943)." is word 5 → subwords 5..=10
        let doc = subwords("the leader was john smith ( 1895 - 1943 ) .");
        let span = improve_answer_span(&doc, 5, 10, &tok, "1895").unwrap();
        assert_eq!(span, (6, 6));
    }

    #[test]
    fn test_no_exact_match_keeps_original_span() {
        let tok = TestWordPiece::covering(&["The Japanese electronics industry"], &["japan"]);
        let doc = subwords("the japanese electronics industry");
        let span = improve_answer_span(&doc, 1, 1, &tok, "Japan").unwrap();
        assert_eq!(span, (1, 1));
    }

    #[test]
    fn test_prefers_earliest_start_then_longest_end() {
        let tok = TestWordPiece::covering(&["a b a b"], &[]);
        let doc = subwords("a b a b");
        // "a b" occurs at 0..=1 and 2..=3; the earliest start wins
        assert_eq!(improve_answer_span(&doc, 0, 3, &tok, "a b").unwrap(), (0, 1));
    }

    #[test]
    fn test_exact_full_span_is_returned_as_is() {
        let tok = TestWordPiece::covering(&["john smith"], &[]);
        let doc = subwords("john smith");
        assert_eq!(improve_answer_span(&doc, 0, 1, &tok, "John Smith").unwrap(), (0, 1));
    }
}
