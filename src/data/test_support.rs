// Small in-memory WordPiece tokenizer for unit tests.
//
// Uses BasicTokenizer (BertNormalizer + BertPreTokenizer), then greedy
// longest-match-first over a fixed vocabulary with "##"
// continuation pieces. Unknown words become [UNK].

use std::collections::HashMap;

use anyhow::Result;

use crate::data::normalizer::BasicTokenizer;
use crate::domain::traits::SubwordTokenizer;

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 100;
pub const CLS_ID: u32 = 101;
pub const SEP_ID: u32 = 102;

pub struct TestWordPiece {
    vocab: HashMap<String, u32>,
    basic: BasicTokenizer,
}

impl TestWordPiece {
    /// Vocabulary made of exactly the given pieces (plus specials).
    pub fn new(pieces: &[&str]) -> Self {
        let mut vocab = HashMap::new();
        vocab.insert("[PAD]".to_string(), PAD_ID);
        vocab.insert("[UNK]".to_string(), UNK_ID);
        vocab.insert("[CLS]".to_string(), CLS_ID);
        vocab.insert("[SEP]".to_string(), SEP_ID);
        let mut next = 1000u32;
        for piece in pieces {
            vocab.entry(piece.to_string()).or_insert_with(|| {
                next += 1;
                next
            });
        }
        Self { vocab, basic: BasicTokenizer::new(true) }
    }

    /// Vocabulary holding every basic token of the given texts as a
    /// whole word, plus any extra pieces.
    pub fn covering(texts: &[&str], extra: &[&str]) -> Self {
        let basic = BasicTokenizer::new(true);
        let mut pieces: Vec<String> = texts
            .iter()
            .flat_map(|t| basic.tokenize(t).unwrap_or_default())
            .collect();
        pieces.extend(extra.iter().map(|p| p.to_string()));
        let refs: Vec<&str> = pieces.iter().map(String::as_str).collect();
        Self::new(&refs)
    }

    fn word_pieces(&self, word: &str) -> Vec<String> {
        let chars: Vec<char> = word.chars().collect();
        let mut pieces = Vec::new();
        let mut start  = 0;

        while start < chars.len() {
            let mut end   = chars.len();
            let mut found = None;
            while start < end {
                let mut candidate: String = chars[start..end].iter().collect();
                if start > 0 {
                    candidate = format!("##{candidate}");
                }
                if self.vocab.contains_key(&candidate) {
                    found = Some(candidate);
                    break;
                }
                end -= 1;
            }
            match found {
                Some(piece) => {
                    pieces.push(piece);
                    start = end;
                }
                None => return vec!["[UNK]".to_string()],
            }
        }
        pieces
    }
}

impl SubwordTokenizer for TestWordPiece {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        Ok(self
            .basic
            .tokenize(text)?
            .iter()
            .flat_map(|w| self.word_pieces(w))
            .collect())
    }

    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Result<Vec<u32>> {
        Ok(tokens
            .iter()
            .map(|t| self.vocab.get(t).copied().unwrap_or(UNK_ID))
            .collect())
    }
}

/// Split on single spaces, the way corpus documents are segmented.
pub fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}
