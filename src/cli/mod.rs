// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2.
//
// Two commands are supported:
//   1. `featurize` — SQuAD corpus → model_inputs.jsonl
//   2. `predict`   — corpus + raw model scores → prediction files
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, FeaturizeArgs, PredictArgs};

use crate::application::{featurize_use_case::FeaturizeUseCase, predict_use_case::PredictUseCase};

#[derive(Parser, Debug)]
#[command(
    name = "squad-span",
    version,
    about = "Window SQuAD corpora for a BERT-style reader and decode its span scores into answers."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Featurize(args) => run_featurize(args),
            Commands::Predict(args)   => run_predict(args),
        }
    }
}

fn run_featurize(args: FeaturizeArgs) -> Result<()> {
    tracing::info!("Featurizing '{}'", args.input_file.display());

    let summary = FeaturizeUseCase::new(args.into()).execute()?;

    println!(
        "{} examples → {} features in {} batches: {}",
        summary.examples,
        summary.features,
        summary.batches,
        summary.model_inputs.display()
    );
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    tracing::info!("Decoding '{}' with scores from '{}'", args.predict_file.display(), args.raw_results.display());

    let written = PredictUseCase::new(args.into()).execute()?;

    println!("Predictions: {}", written.predictions.display());
    println!("N-best:      {}", written.nbest.display());
    if let Some(null_odds) = &written.null_odds {
        println!("Null odds:   {}", null_odds.display());
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{featurize_use_case::FeaturizeConfig, predict_use_case::PredictConfig};

    #[test]
    fn test_featurize_defaults() {
        let cli = Cli::try_parse_from([
            "squad-span", "featurize", "--input-file", "train.json", "--tokenizer", "vocab.txt",
        ])
        .unwrap();
        let Commands::Featurize(args) = cli.command else { panic!("expected featurize") };
        let cfg = FeaturizeConfig::from(args);

        assert_eq!(cfg.window.max_seq_length, 384);
        assert_eq!(cfg.window.doc_stride, 128);
        assert_eq!(cfg.window.max_query_length, 64);
        assert!(cfg.do_lower_case);
        assert!(!cfg.is_training);
        assert!(cfg.cache_dir.is_none());
    }

    #[test]
    fn test_predict_flags_reach_decode_config() {
        let cli = Cli::try_parse_from([
            "squad-span", "predict",
            "--predict-file", "dev.json",
            "--tokenizer", "vocab.txt",
            "--raw-results", "scores.jsonl",
            "--version-2-with-negative",
            "--null-score-diff-threshold", "-1.5",
            "--n-best-size", "5",
            "--do-lower-case", "false",
        ])
        .unwrap();
        let Commands::Predict(args) = cli.command else { panic!("expected predict") };
        let cfg = PredictConfig::from(args);

        assert_eq!(cfg.decode.n_best_size, 5);
        assert_eq!(cfg.decode.max_answer_length, 30);
        assert!(cfg.decode.version_2_with_negative);
        assert_eq!(cfg.decode.null_score_diff_threshold, -1.5);
        assert!(!cfg.decode.do_lower_case);
    }
}
