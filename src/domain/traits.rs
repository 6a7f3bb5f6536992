// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The two collaborators the pipeline depends on but does not
// implement itself:
//
//   ExampleSource    → anything that yields QaExamples
//                      (SquadLoader reads SQuAD JSON)
//   SubwordTokenizer → text → subword strings → vocabulary ids
//                      (implemented for tokenizers::Tokenizer)
//
// Window building and span alignment only ever see these traits,
// so tests can plug in a small in-memory vocabulary.

use anyhow::Result;

use crate::domain::example::QaExample;

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Any component that can produce QA examples.
pub trait ExampleSource {
    /// Load every example, in corpus order.
    fn load_examples(&self) -> Result<Vec<QaExample>>;
}

// ─── SubwordTokenizer ─────────────────────────────────────────────────────────
/// Subword tokenizer contract.
///
/// Continuation pieces carry the `##` prefix (WordPiece convention);
/// the special markers `[CLS]`, `[SEP]` and `[PAD]` must be part of
/// the vocabulary.
pub trait SubwordTokenizer {
    /// Split text into ordered subword tokens.
    fn tokenize(&self, text: &str) -> Result<Vec<String>>;

    /// Map tokens to vocabulary ids, one id per token.
    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Result<Vec<u32>>;

    /// Id written into padding positions
    fn pad_id(&self) -> u32 {
        0
    }
}
