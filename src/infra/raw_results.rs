// ============================================================
// Layer 6 — Raw Result Reader
// ============================================================
// Reads the per-window start/end scores produced by the external
// model. Two layouts are accepted:
//
//   *.json  → one array   [{"unique_id": .., "start_logits": [..], "end_logits": [..]}, ..]
//   *.jsonl → one record per line, same fields
//
// Results are joined to features by unique_id later, so their
// order in the file does not matter.

use anyhow::{Context, Result};
use std::{
    fs,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::domain::feature::RawResult;

pub struct RawResultReader;

impl RawResultReader {
    pub fn read(path: &Path) -> Result<Vec<RawResult>> {
        let file = fs::File::open(path)
            .with_context(|| format!("Cannot open raw results '{}'", path.display()))?;

        let is_lines = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"));

        let results: Vec<RawResult> = if is_lines {
            let mut results = Vec::new();
            for (line_no, line) in BufReader::new(file).lines().enumerate() {
                let line = line.with_context(|| format!("Cannot read '{}'", path.display()))?;
                if line.trim().is_empty() {
                    continue;
                }
                let result = serde_json::from_str(&line).with_context(|| {
                    format!("Malformed raw result on line {} of '{}'", line_no + 1, path.display())
                })?;
                results.push(result);
            }
            results
        } else {
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Malformed raw results in '{}'", path.display()))?
        };

        tracing::info!("Read {} raw results from '{}'", results.len(), path.display());
        Ok(results)
    }
}
