// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads the subword tokenizer the features are built with and
// adapts it to the SubwordTokenizer trait.
//
// Two on-disk formats are accepted:
//   tokenizer.json → a HuggingFace tokenizer, loaded as is
//   vocab.txt      → one WordPiece token per line; a BERT
//                    tokenizer JSON is assembled around it
//                    and loaded from memory
//
// The vocabulary must be the one the external model was
// trained with, otherwise the ids in the features are wrong.

use anyhow::{anyhow, Context, Result};
use std::{path::Path, str::FromStr};
use tokenizers::Tokenizer;

use crate::domain::traits::SubwordTokenizer;

const UNK_TOKEN: &str = "[UNK]";
const PAD_TOKEN: &str = "[PAD]";
const SPECIAL_TOKENS: [&str; 5] = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]"];

impl SubwordTokenizer for Tokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let encoding = self
            .encode(text, false)
            .map_err(|e| anyhow!("Cannot tokenize '{text}': {e}"))?;
        Ok(encoding.get_tokens().to_vec())
    }

    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Result<Vec<u32>> {
        let unk_id = self.token_to_id(UNK_TOKEN);
        tokens
            .iter()
            .map(|token| {
                self.token_to_id(token)
                    .or(unk_id)
                    .ok_or_else(|| anyhow!("Token '{token}' is not in the vocabulary and there is no {UNK_TOKEN}"))
            })
            .collect()
    }

    fn pad_id(&self) -> u32 {
        self.token_to_id(PAD_TOKEN).unwrap_or(0)
    }
}

pub struct TokenizerStore;

impl TokenizerStore {
    /// Load a tokenizer from a `.json` file or a WordPiece `vocab.txt`.
    /// `do_lower_case` only applies to vocab files; a tokenizer JSON
    /// carries its own normalizer.
    pub fn load(path: &Path, do_lower_case: bool) -> Result<Tokenizer> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let tokenizer = if is_json {
            Tokenizer::from_file(path)
                .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {e}", path.display()))?
        } else {
            let vocab = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read vocabulary '{}'", path.display()))?;
            Self::from_vocab(&vocab, do_lower_case)
                .with_context(|| format!("Cannot build WordPiece tokenizer from '{}'", path.display()))?
        };

        tracing::info!(
            "Loaded tokenizer from '{}' ({} tokens)",
            path.display(),
            tokenizer.get_vocab_size(true)
        );
        Ok(tokenizer)
    }

    /// Build a BERT WordPiece tokenizer from vocab.txt contents.
    /// Line number is the token id.
    pub fn from_vocab(vocab_txt: &str, do_lower_case: bool) -> Result<Tokenizer> {
        let mut vocab = serde_json::Map::new();
        for (id, line) in vocab_txt.lines().enumerate() {
            let token = line.trim_end_matches('\r');
            if token.is_empty() {
                continue;
            }
            vocab.entry(token.to_string()).or_insert_with(|| serde_json::json!(id));
        }
        if vocab.is_empty() {
            return Err(anyhow!("vocabulary is empty"));
        }

        let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
            .iter()
            .filter_map(|&special| {
                vocab.get(special).map(|id| {
                    serde_json::json!({
                        "id": id, "content": special, "single_word": false, "lstrip": false,
                        "rstrip": false, "normalized": false, "special": true
                    })
                })
            })
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": do_lower_case
            },
            "pre_tokenizer": {
                "type": "BertPreTokenizer"
            },
            "post_processor": null,
            "decoder": {
                "type": "WordPiece",
                "prefix": "##",
                "cleanup": true
            },
            "model": {
                "type": "WordPiece",
                "unk_token": UNK_TOKEN,
                "continuing_subword_prefix": "##",
                "max_input_chars_per_word": 100,
                "vocab": vocab
            }
        });

        Tokenizer::from_str(&tokenizer_json.to_string())
            .map_err(|e| anyhow!("Invalid tokenizer definition: {e}"))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VOCAB: &str = "[PAD]\n[UNK]\n[CLS]\n[SEP]\n[MASK]\nthe\npuppet\n##eer\nsmiled\n.\n";

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_vocab_file_gives_wordpiece_tokens() {
        let tok = TokenizerStore::from_vocab(VOCAB, true).unwrap();
        let pieces = SubwordTokenizer::tokenize(&tok, "The puppeteer smiled.").unwrap();
        assert_eq!(pieces, strings(&["the", "puppet", "##eer", "smiled", "."]));
    }

    #[test]
    fn test_ids_follow_line_numbers_and_unknowns_map_to_unk() {
        let tok = TokenizerStore::from_vocab(VOCAB, true).unwrap();
        let ids = SubwordTokenizer::convert_tokens_to_ids(&tok, &strings(&["[CLS]", "the", "zebra", "[SEP]"]))
            .unwrap();
        assert_eq!(ids, vec![2, 5, 1, 3]);
        assert_eq!(SubwordTokenizer::pad_id(&tok), 0);
    }

    #[test]
    fn test_load_from_vocab_file_on_disk() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(VOCAB.as_bytes()).unwrap();

        let tok = TokenizerStore::load(file.path(), true).unwrap();
        let pieces = SubwordTokenizer::tokenize(&tok, "the puppeteer").unwrap();
        assert_eq!(pieces, strings(&["the", "puppet", "##eer"]));
    }

    #[test]
    fn test_empty_vocabulary_is_rejected() {
        assert!(TokenizerStore::from_vocab("\n\n", true).is_err());
    }
}
