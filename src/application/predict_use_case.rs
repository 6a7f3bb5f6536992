// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Decodes answers from the external model's scores:
//
//   Step 1: Load the tokenizer                (Layer 6 - infra)
//   Step 2: Load the corpus, no gold answers  (Layer 4 - data)
//   Step 3: Build or reuse the same features  (Layer 4 - data)
//   Step 4: Read raw start/end scores         (Layer 6 - infra)
//   Step 5: Aggregate n-best predictions      (Layer 5 - ml)
//   Step 6: Write the prediction files        (Layer 6 - infra)
//
// The window settings must match the featurize run the scores
// came from, otherwise unique ids point at different windows.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::featurize_use_case::{load_or_build_features, warn_on_case_mismatch};
use crate::data::{features::WindowConfig, loader::SquadLoader};
use crate::domain::{error::PipelineError, traits::ExampleSource};
use crate::infra::{
    feature_cache::{CacheKey, FeatureCache},
    prediction_writer::{PredictionWriter, WrittenPredictions},
    raw_results::RawResultReader,
    tokenizer_store::TokenizerStore,
};
use crate::ml::aggregator::{aggregate_predictions, DecodeConfig};

// ─── Predict Configuration ────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictConfig {
    /// SQuAD JSON corpus the scores were produced for
    pub predict_file: PathBuf,
    pub tokenizer:    PathBuf,
    /// JSON array or JSON lines of {unique_id, start_logits, end_logits}
    pub raw_results:  PathBuf,
    pub output_dir:   PathBuf,
    pub cache_dir:    Option<PathBuf>,
    pub window:       WindowConfig,
    pub decode:       DecodeConfig,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            predict_file: PathBuf::from("data/dev-v1.1.json"),
            tokenizer:    PathBuf::from("models/bert-base-uncased/vocab.txt"),
            raw_results:  PathBuf::from("output/raw_results.json"),
            output_dir:   PathBuf::from("output"),
            cache_dir:    None,
            window:       WindowConfig::default(),
            decode:       DecodeConfig::default(),
        }
    }
}

impl PredictConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.window.validate()?;
        self.decode.validate()
    }
}

// ─── PredictUseCase ───────────────────────────────────────────────────────────
pub struct PredictUseCase {
    config: PredictConfig,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<WrittenPredictions> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Steps 1-3 ─────────────────────────────────────────────────────────
        warn_on_case_mismatch(&cfg.tokenizer, cfg.decode.do_lower_case);
        let tokenizer = TokenizerStore::load(&cfg.tokenizer, cfg.decode.do_lower_case)?;
        let examples  = SquadLoader::new(&cfg.predict_file, false).load_examples()?;

        let cache    = cfg.cache_dir.clone().map(FeatureCache::new);
        let key      = CacheKey::new(&cfg.predict_file, &cfg.tokenizer, cfg.window, cfg.decode.do_lower_case, false);
        let features = load_or_build_features(&examples, &tokenizer, cache.as_ref(), &key)?;

        // ── Steps 4-6 ─────────────────────────────────────────────────────────
        let results     = RawResultReader::read(&cfg.raw_results)?;
        let predictions = aggregate_predictions(&examples, &features, &results, &cfg.decode)?;

        PredictionWriter::new(&cfg.output_dir).write(&predictions, cfg.decode.version_2_with_negative)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PredictConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_n_best_is_rejected() {
        let mut cfg = PredictConfig::default();
        cfg.decode.n_best_size = 0;
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_window_settings_are_checked() {
        let mut cfg = PredictConfig::default();
        cfg.window.doc_stride = 0;
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(_))));
    }
}
