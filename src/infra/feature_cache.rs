// ============================================================
// Layer 6 — Feature Cache
// ============================================================
// Persists built features so a corpus is only windowed once per
// (corpus, tokenizer, window settings, mode) combination.
//
// The key holds the full corpus and tokenizer paths, the
// lowercasing flag and the window settings.
//
// File naming convention:
//   <cache dir>/
//     train-v1.1_bert-base-uncased_384_128_64_train_3f9a0c12d4e5.features.json
//     dev-v1.1_bert-base-uncased_384_128_64_predict_81b7e2a90c3d.features.json
//   the trailing hex is a SHA-256 prefix of the whole key
//
// Each file also stores the key it was built for. A file whose
// stored key differs from the requested one is treated as a
// miss and overwritten by the next save.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};

use crate::data::features::WindowConfig;
use crate::domain::feature::Feature;

/// Hex characters of the key digest kept in the file name
const DIGEST_CHARS: usize = 12;

/// Everything the cached features depend on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    /// Corpus file, canonicalised when it exists
    pub source:        PathBuf,
    /// tokenizer.json or vocab.txt, canonicalised when it exists
    pub tokenizer:     PathBuf,
    pub do_lower_case: bool,
    pub window:        WindowConfig,
    pub is_training:   bool,
}

impl CacheKey {
    pub fn new(
        corpus:        &Path,
        tokenizer:     &Path,
        window:        WindowConfig,
        do_lower_case: bool,
        is_training:   bool,
    ) -> Self {
        Self {
            source: canonical(corpus),
            tokenizer: canonical(tokenizer),
            do_lower_case,
            window,
            is_training,
        }
    }

    /// Readable prefix plus a digest of the whole key, so keys that
    /// share a corpus stem or model directory never share a file.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}_{}.features.json",
            slug(&stem_of(&self.source)),
            slug(&model_name(&self.tokenizer)),
            self.window.max_seq_length,
            self.window.doc_stride,
            self.window.max_query_length,
            if self.is_training { "train" } else { "predict" },
            self.digest(),
        )
    }

    fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.tokenizer.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update([u8::from(self.do_lower_case), u8::from(self.is_training)]);
        for value in [self.window.max_seq_length, self.window.doc_stride, self.window.max_query_length] {
            hasher.update((value as u64).to_le_bytes());
        }
        let hex = format!("{:x}", hasher.finalize());
        hex[..DIGEST_CHARS].to_string()
    }
}

/// On-disk layout of one cache file
#[derive(Serialize, Deserialize)]
struct CacheFile {
    key:      CacheKey,
    features: Vec<Feature>,
}

pub struct FeatureCache {
    dir: PathBuf,
}

impl FeatureCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// `Ok(None)` on a miss: no file, or a file built for another key.
    pub fn load(&self, key: &CacheKey) -> Result<Option<Vec<Feature>>> {
        let path = self.path_for(key);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("Feature cache miss: '{}'", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Cannot open feature cache '{}'", path.display()));
            }
        };

        let cached: CacheFile = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Cannot parse feature cache '{}'", path.display()))?;

        if cached.key != *key {
            tracing::warn!(
                "Feature cache '{}' was built for {:?}, rebuilding",
                path.display(),
                cached.key
            );
            return Ok(None);
        }

        tracing::info!("Loaded {} features from cache '{}'", cached.features.len(), path.display());
        Ok(Some(cached.features))
    }

    /// Write the features for `key`, replacing any previous file.
    pub fn save(&self, key: &CacheKey, features: &[Feature]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create cache directory '{}'", self.dir.display()))?;

        let path = self.path_for(key);
        let file = fs::File::create(&path)
            .with_context(|| format!("Cannot write feature cache '{}'", path.display()))?;

        let cached = CacheFile { key: key.clone(), features: features.to_vec() };
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &cached)
            .with_context(|| format!("Cannot serialise features to '{}'", path.display()))?;
        writer.flush()?;

        tracing::info!("Saved {} features to cache '{}'", features.len(), path.display());
        Ok(path)
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Tokenizer directory name, or the file stem at the top level
fn model_name(tokenizer: &Path) -> String {
    tokenizer
        .parent()
        .and_then(|dir| dir.file_name())
        .or_else(|| tokenizer.file_stem())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Keep the name file-system and separator safe
fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '-' })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn key_for(corpus: &str, tokenizer: &str, do_lower_case: bool, is_training: bool) -> CacheKey {
        CacheKey::new(
            Path::new(corpus),
            Path::new(tokenizer),
            WindowConfig::default(),
            do_lower_case,
            is_training,
        )
    }

    fn key(is_training: bool) -> CacheKey {
        key_for("data/dev-v1.1.json", "models/bert-base-uncased/vocab.txt", true, is_training)
    }

    fn feature(unique_id: u64) -> Feature {
        Feature {
            unique_id,
            example_index: 0,
            doc_span_index: 0,
            tokens: vec!["[CLS]".into(), "q".into(), "[SEP]".into(), "a".into(), "[SEP]".into()],
            token_to_orig_map: vec![None, None, None, Some(0), None],
            token_is_max_context: vec![false, false, false, true, false],
            input_ids: vec![101, 7, 102, 9, 102, 0],
            input_mask: vec![1, 1, 1, 1, 1, 0],
            segment_ids: vec![0, 0, 0, 1, 1, 0],
            start_position: None,
            end_position: None,
            is_impossible: false,
        }
    }

    #[test]
    fn test_file_name_has_readable_prefix_and_digest() {
        let name = key(true).file_name();
        assert!(name.starts_with("dev-v1.1_bert-base-uncased_384_128_64_train_"), "{name}");
        assert!(name.ends_with(".features.json"));
        assert_ne!(key(true).file_name(), key(false).file_name());
        // stable for equal keys
        assert_eq!(key(false).file_name(), key(false).file_name());
    }

    #[test]
    fn test_same_stem_in_other_directory_is_another_key() {
        let a = key_for("squad1/dev.json", "models/bert/vocab.txt", true, false);
        let b = key_for("squad2/dev.json", "models/bert/vocab.txt", true, false);
        assert_ne!(a, b);
        assert_ne!(a.file_name(), b.file_name());
    }

    #[test]
    fn test_other_tokenizer_file_in_same_directory_is_another_key() {
        let a = key_for("dev.json", "models/bert/vocab.txt", true, false);
        let b = key_for("dev.json", "models/bert/tokenizer.json", true, false);
        assert_ne!(a, b);
        assert_ne!(a.file_name(), b.file_name());
    }

    #[test]
    fn test_lowercasing_is_part_of_the_key() {
        let a = key_for("dev.json", "models/bert/vocab.txt", true, false);
        let b = key_for("dev.json", "models/bert/vocab.txt", false, false);
        assert_ne!(a, b);
        assert_ne!(a.file_name(), b.file_name());
    }

    #[test]
    fn test_existing_paths_are_canonicalised() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dev.json"), "{}").unwrap();
        fs::write(dir.path().join("vocab.txt"), "[UNK]").unwrap();

        let direct = CacheKey::new(
            &dir.path().join("dev.json"),
            &dir.path().join("vocab.txt"),
            WindowConfig::default(),
            true,
            false,
        );
        let dotted = CacheKey::new(
            &dir.path().join(".").join("dev.json"),
            &dir.path().join(".").join("vocab.txt"),
            WindowConfig::default(),
            true,
            false,
        );
        assert_eq!(direct, dotted);
        assert!(direct.source.is_absolute());
    }

    #[test]
    fn test_key_change_misses_saved_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FeatureCache::new(dir.path());
        cache.save(&key_for("squad1/dev.json", "bert/vocab.txt", true, false), &[feature(1)]).unwrap();

        let other = key_for("squad2/dev.json", "bert/vocab.txt", true, false);
        assert!(cache.load(&other).unwrap().is_none());
    }

    #[test]
    fn test_missing_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FeatureCache::new(dir.path());
        assert!(cache.load(&key(false)).unwrap().is_none());
    }

    #[test]
    fn test_saved_features_are_loaded_back() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FeatureCache::new(dir.path().join("cache"));
        let features = vec![feature(1_000_000_000), feature(1_000_000_001)];

        let path = cache.save(&key(false), &features).unwrap();
        assert!(path.exists());
        assert_eq!(cache.load(&key(false)).unwrap(), Some(features));
    }

    #[test]
    fn test_foreign_key_in_file_invalidates_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FeatureCache::new(dir.path());
        let wanted = key(false);
        let other  = CacheKey { tokenizer: PathBuf::from("other-model/vocab.txt"), ..wanted.clone() };

        // place other's content under wanted's file name
        let bytes = serde_json::to_vec(&CacheFile { key: other, features: vec![feature(1)] }).unwrap();
        fs::write(cache.path_for(&wanted), bytes).unwrap();

        assert!(cache.load(&wanted).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FeatureCache::new(dir.path());
        fs::write(cache.path_for(&key(true)), "not json").unwrap();
        assert!(cache.load(&key(true)).is_err());
    }
}
