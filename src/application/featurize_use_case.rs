// ============================================================
// Layer 2 — FeaturizeUseCase
// ============================================================
// Turns a SQuAD corpus into model-ready windows:
//
//   Step 1: Load the tokenizer        (Layer 6 - infra)
//   Step 2: Load the corpus           (Layer 4 - data)
//   Step 3: Build or reuse features   (Layer 4 - data, Layer 6 - infra)
//   Step 4: Stack them into batches   (Layer 4 - data)
//   Step 5: Write model_inputs.jsonl  (one batch per line)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::data::{
    batcher::FeatureBatcher,
    features::{convert_examples_to_features, WindowConfig},
    loader::SquadLoader,
};
use crate::domain::{
    example::QaExample,
    feature::Feature,
    traits::{ExampleSource, SubwordTokenizer},
};
use crate::infra::{
    feature_cache::{CacheKey, FeatureCache},
    tokenizer_store::TokenizerStore,
};

pub const MODEL_INPUTS_FILE: &str = "model_inputs.jsonl";

// ─── Featurize Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturizeConfig {
    /// SQuAD JSON corpus
    pub input_file:    PathBuf,
    /// tokenizer.json or vocab.txt
    pub tokenizer:     PathBuf,
    pub output_dir:    PathBuf,
    /// No caching when unset
    pub cache_dir:     Option<PathBuf>,
    pub window:        WindowConfig,
    pub do_lower_case: bool,
    /// Read gold answers and emit gold positions
    pub is_training:   bool,
    pub batch_size:    usize,
}

impl Default for FeaturizeConfig {
    fn default() -> Self {
        Self {
            input_file:    PathBuf::from("data/train-v1.1.json"),
            tokenizer:     PathBuf::from("models/bert-base-uncased/vocab.txt"),
            output_dir:    PathBuf::from("output"),
            cache_dir:     None,
            window:        WindowConfig::default(),
            do_lower_case: true,
            is_training:   true,
            batch_size:    32,
        }
    }
}

/// What one featurize run produced
#[derive(Debug, Clone)]
pub struct FeaturizeSummary {
    pub examples:    usize,
    pub features:    usize,
    pub batches:     usize,
    pub model_inputs: PathBuf,
}

// ─── FeaturizeUseCase ─────────────────────────────────────────────────────────
pub struct FeaturizeUseCase {
    config: FeaturizeConfig,
}

impl FeaturizeUseCase {
    pub fn new(config: FeaturizeConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<FeaturizeSummary> {
        let cfg = &self.config;
        cfg.window.validate()?;

        // ── Steps 1-2 ─────────────────────────────────────────────────────────
        warn_on_case_mismatch(&cfg.tokenizer, cfg.do_lower_case);
        let tokenizer = TokenizerStore::load(&cfg.tokenizer, cfg.do_lower_case)?;
        let examples  = SquadLoader::new(&cfg.input_file, cfg.is_training).load_examples()?;

        // ── Step 3 ────────────────────────────────────────────────────────────
        let cache    = cfg.cache_dir.clone().map(FeatureCache::new);
        let key      = CacheKey::new(&cfg.input_file, &cfg.tokenizer, cfg.window, cfg.do_lower_case, cfg.is_training);
        let features = load_or_build_features(&examples, &tokenizer, cache.as_ref(), &key)?;

        // ── Steps 4-5 ─────────────────────────────────────────────────────────
        let batches = FeatureBatcher::new(cfg.batch_size).batches(&features)?;

        fs::create_dir_all(&cfg.output_dir)
            .with_context(|| format!("Cannot create output directory '{}'", cfg.output_dir.display()))?;
        let path = cfg.output_dir.join(MODEL_INPUTS_FILE);
        let file = fs::File::create(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        let mut writer = BufWriter::new(file);
        for batch in &batches {
            serde_json::to_writer(&mut writer, batch)?;
            writeln!(writer)?;
        }
        writer.flush()?;

        tracing::info!("Wrote {} batches to '{}'", batches.len(), path.display());

        Ok(FeaturizeSummary {
            examples:     examples.len(),
            features:     features.len(),
            batches:      batches.len(),
            model_inputs: path,
        })
    }
}

/// Reuse cached features for `key` when present, otherwise build
/// them and refresh the cache.
pub fn load_or_build_features<T: SubwordTokenizer + ?Sized>(
    examples:  &[QaExample],
    tokenizer: &T,
    cache:     Option<&FeatureCache>,
    key:       &CacheKey,
) -> Result<Vec<Feature>> {
    if let Some(cache) = cache {
        if let Some(features) = cache.load(key)? {
            return Ok(features);
        }
    }

    let features = convert_examples_to_features(examples, tokenizer, key.window, key.is_training)?;

    if let Some(cache) = cache {
        cache.save(key, &features)?;
    }
    Ok(features)
}

/// "uncased" vocabularies expect lowercased input and cased ones do not
pub fn warn_on_case_mismatch(tokenizer: &Path, do_lower_case: bool) {
    let name = tokenizer.to_string_lossy().to_lowercase();
    if name.contains("uncased") && !do_lower_case {
        tracing::warn!("Tokenizer '{}' looks uncased but lowercasing is off", tokenizer.display());
    } else if name.contains("cased") && !name.contains("uncased") && do_lower_case {
        tracing::warn!("Tokenizer '{}' looks cased but lowercasing is on", tokenizer.display());
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::TestWordPiece;

    fn examples() -> Vec<QaExample> {
        vec![QaExample::new("q1", "who", vec!["ada".into(), "wrote".into()], None)]
    }

    fn key(window: WindowConfig) -> CacheKey {
        CacheKey::new(Path::new("dev.json"), Path::new("vocab/vocab.txt"), window, true, false)
    }

    #[test]
    fn test_builds_without_cache() {
        let tok = TestWordPiece::new(&["who", "ada", "wrote"]);
        let features = load_or_build_features(&examples(), &tok, None, &key(WindowConfig::default())).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].tokens, vec!["[CLS]", "who", "[SEP]", "ada", "wrote", "[SEP]"]);
    }

    #[test]
    fn test_second_run_reads_cache() {
        let dir   = tempfile::tempdir().unwrap();
        let cache = FeatureCache::new(dir.path());
        let key   = key(WindowConfig::default());

        let tok   = TestWordPiece::new(&["who", "ada", "wrote"]);
        let built = load_or_build_features(&examples(), &tok, Some(&cache), &key).unwrap();
        assert!(cache.path_for(&key).exists());

        // a tokenizer that knows nothing would produce [UNK]s if it were used
        let empty  = TestWordPiece::new(&[]);
        let cached = load_or_build_features(&examples(), &empty, Some(&cache), &key).unwrap();
        assert_eq!(cached, built);
    }

    #[test]
    fn test_other_window_settings_rebuild() {
        let dir   = tempfile::tempdir().unwrap();
        let cache = FeatureCache::new(dir.path());
        let tok   = TestWordPiece::new(&["who", "ada", "wrote"]);

        let small = WindowConfig { max_seq_length: 8, doc_stride: 2, max_query_length: 2 };
        let a = load_or_build_features(&examples(), &tok, Some(&cache), &key(WindowConfig::default())).unwrap();
        let b = load_or_build_features(&examples(), &tok, Some(&cache), &key(small)).unwrap();
        assert_eq!(a[0].input_ids.len(), 384);
        assert_eq!(b[0].input_ids.len(), 8);
    }
}
