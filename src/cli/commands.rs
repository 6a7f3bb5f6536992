// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `featurize` and `predict`,
// and all their configurable flags.
//
// Window flags are shared through WindowArgs so that both
// commands cut documents the same way by default.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{featurize_use_case::FeaturizeConfig, predict_use_case::PredictConfig};
use crate::data::features::WindowConfig;
use crate::ml::aggregator::DecodeConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cut a SQuAD corpus into windows and write model inputs
    Featurize(FeaturizeArgs),

    /// Decode answers from per-window model scores
    Predict(PredictArgs),
}

/// Sliding-window settings
#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Window length in subwords: [CLS] question [SEP] document [SEP] + padding
    #[arg(long, default_value_t = 384)]
    pub max_seq_length: usize,

    /// Maximum step between consecutive document windows
    #[arg(long, default_value_t = 128)]
    pub doc_stride: usize,

    /// Questions longer than this many subwords are truncated
    #[arg(long, default_value_t = 64)]
    pub max_query_length: usize,

    /// Must be false for cased vocabularies
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub do_lower_case: bool,
}

impl From<&WindowArgs> for WindowConfig {
    fn from(a: &WindowArgs) -> Self {
        WindowConfig {
            max_seq_length:   a.max_seq_length,
            doc_stride:       a.doc_stride,
            max_query_length: a.max_query_length,
        }
    }
}

/// All arguments for the `featurize` command
#[derive(Args, Debug)]
pub struct FeaturizeArgs {
    /// SQuAD JSON corpus
    #[arg(long)]
    pub input_file: PathBuf,

    /// tokenizer.json or WordPiece vocab.txt
    #[arg(long)]
    pub tokenizer: PathBuf,

    /// Where model_inputs.jsonl is written
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Reuse features from this directory across runs
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Read gold answers and emit gold positions
    #[arg(long)]
    pub is_training: bool,

    /// Windows per line of model_inputs.jsonl
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[command(flatten)]
    pub window: WindowArgs,
}

impl From<FeaturizeArgs> for FeaturizeConfig {
    fn from(a: FeaturizeArgs) -> Self {
        FeaturizeConfig {
            window:        WindowConfig::from(&a.window),
            do_lower_case: a.window.do_lower_case,
            input_file:    a.input_file,
            tokenizer:     a.tokenizer,
            output_dir:    a.output_dir,
            cache_dir:     a.cache_dir,
            is_training:   a.is_training,
            batch_size:    a.batch_size,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// SQuAD JSON corpus the scores belong to
    #[arg(long)]
    pub predict_file: PathBuf,

    /// Same tokenizer as used for `featurize`
    #[arg(long)]
    pub tokenizer: PathBuf,

    /// Raw scores: JSON array or .jsonl of {unique_id, start_logits, end_logits}
    #[arg(long)]
    pub raw_results: PathBuf,

    /// Where predictions.json, nbest_predictions.json and null_odds.json go
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Candidates kept in nbest_predictions.json
    #[arg(long, default_value_t = 20)]
    pub n_best_size: usize,

    /// Longest answer in subwords
    #[arg(long, default_value_t = 30)]
    pub max_answer_length: usize,

    /// Allow "no answer" predictions (SQuAD 2.0)
    #[arg(long)]
    pub version_2_with_negative: bool,

    /// Predict "no answer" when null score - best score exceeds this
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub null_score_diff_threshold: f32,

    #[command(flatten)]
    pub window: WindowArgs,
}

impl From<PredictArgs> for PredictConfig {
    fn from(a: PredictArgs) -> Self {
        PredictConfig {
            window: WindowConfig::from(&a.window),
            decode: DecodeConfig {
                n_best_size:               a.n_best_size,
                max_answer_length:         a.max_answer_length,
                do_lower_case:             a.window.do_lower_case,
                version_2_with_negative:   a.version_2_with_negative,
                null_score_diff_threshold: a.null_score_diff_threshold,
            },
            predict_file: a.predict_file,
            tokenizer:    a.tokenizer,
            raw_results:  a.raw_results,
            output_dir:   a.output_dir,
            cache_dir:    a.cache_dir,
        }
    }
}
