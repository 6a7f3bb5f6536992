// ============================================================
// Layer 6 — Prediction Writer
// ============================================================
// Writes the decoded answers to the output directory.
//
// Output files:
//   predictions.json       → { qas_id: answer }
//   nbest_predictions.json → { qas_id: [ {text, probability,
//                                         start_logit, end_logit}, .. ] }
//   null_odds.json         → { qas_id: null score diff }
//                            (only when null answers are enabled)
//
// All maps keep the example order of the input corpus and are
// pretty-printed with 4-space indentation.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::prediction::ExamplePrediction;

pub const PREDICTIONS_FILE: &str = "predictions.json";
pub const NBEST_FILE: &str       = "nbest_predictions.json";
pub const NULL_ODDS_FILE: &str   = "null_odds.json";

/// Paths of the files written by one run
#[derive(Debug, Clone)]
pub struct WrittenPredictions {
    pub predictions: PathBuf,
    pub nbest:       PathBuf,
    pub null_odds:   Option<PathBuf>,
}

pub struct PredictionWriter {
    dir: PathBuf,
}

impl PredictionWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn write(&self, predictions: &[ExamplePrediction], with_null_odds: bool) -> Result<WrittenPredictions> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create output directory '{}'", self.dir.display()))?;

        let mut answers   = Map::new();
        let mut nbest     = Map::new();
        let mut null_odds = Map::new();

        for pred in predictions {
            answers.insert(pred.qas_id.clone(), Value::String(pred.answer.clone()));
            nbest.insert(pred.qas_id.clone(), serde_json::to_value(&pred.nbest)?);
            if let Some(diff) = pred.null_score_diff {
                null_odds.insert(pred.qas_id.clone(), serde_json::to_value(diff)?);
            }
        }

        let written = WrittenPredictions {
            predictions: write_pretty(&self.dir.join(PREDICTIONS_FILE), &answers)?,
            nbest:       write_pretty(&self.dir.join(NBEST_FILE), &nbest)?,
            null_odds:   if with_null_odds {
                Some(write_pretty(&self.dir.join(NULL_ODDS_FILE), &null_odds)?)
            } else {
                None
            },
        };

        tracing::info!(
            "Wrote {} predictions to '{}'",
            predictions.len(),
            written.predictions.display()
        );
        Ok(written)
    }
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf> {
    let file = fs::File::create(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser   = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value
        .serialize(&mut ser)
        .with_context(|| format!("Cannot serialise '{}'", path.display()))?;
    writeln!(writer)?;
    writer.flush()?;

    tracing::debug!("Wrote '{}'", path.display());
    Ok(path.to_path_buf())
}
