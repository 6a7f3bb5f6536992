// ============================================================
// Layer 4 — Basic Text Normaliser
// ============================================================
// Runs the cleaning the subword tokenizer applies before it
// splits words into pieces, without the vocabulary lookup:
//
//   BertNormalizer   → drop control chars, unify whitespace,
//                      space out CJK ideographs, optionally
//                      lowercase and strip accents
//   BertPreTokenizer → split on whitespace, isolate every
//                      Unicode punctuation character
//
// These are the same components TokenizerStore configures for
// vocab.txt tokenizers, so a predicted answer can be located
// again inside the original document text.
//
// Example (lowercasing on):
//   "Steve Smith's"  →  ["steve", "smith", "'", "s"]
//   "Café (1895)."   →  ["cafe", "(", "1895", ")", "."]
//
// Reference: Devlin et al. (2019) BERT, BasicTokenizer

use anyhow::{anyhow, Result};
use tokenizers::{
    normalizers::bert::BertNormalizer, pre_tokenizers::bert::BertPreTokenizer, NormalizedString,
    Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer,
};

#[derive(Debug, Clone)]
pub struct BasicTokenizer {
    normalizer: BertNormalizer,
}

impl BasicTokenizer {
    /// `do_lower_case` also strips accents, as for uncased vocabularies
    pub fn new(do_lower_case: bool) -> Self {
        Self {
            normalizer: BertNormalizer::new(true, true, None, do_lower_case),
        }
    }

    /// Split text into normalised basic tokens.
    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let mut normalized = NormalizedString::from(text);
        self.normalizer
            .normalize(&mut normalized)
            .map_err(|e| anyhow!("Cannot normalise '{text}': {e}"))?;

        let mut pretokenized = PreTokenizedString::from(normalized);
        BertPreTokenizer
            .pre_tokenize(&mut pretokenized)
            .map_err(|e| anyhow!("Cannot pre-tokenize '{text}': {e}"))?;

        Ok(pretokenized
            .get_splits(OffsetReferential::Normalized, OffsetType::Char)
            .into_iter()
            .map(|(piece, _, _)| piece.to_string())
            .filter(|piece| !piece.is_empty())
            .collect())
    }
}
