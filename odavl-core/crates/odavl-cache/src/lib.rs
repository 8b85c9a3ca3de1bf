//! # Incremental Cache (C2)
//!
//! Maps file fingerprint → per-detector issue list; invalidates on hash
//! mismatch (§4.2). A corrupt cache file is never fatal: it is treated as
//! a miss and silently rebuilt (§4.2 failure policy, error kind
//! `CacheCorrupt`).

use chrono::{DateTime, Utc};
use odavl_types::atomic::write_atomic;
use odavl_types::Issue;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    path: String,
    hash: String,
    timestamp: DateTime<Utc>,
    detectors: HashMap<String, Vec<Issue>>,
}

/// Content-hash incremental cache rooted at `<workspace>/.odavl/cache`
/// (§6 on-disk layout).
pub struct IncrementalCache {
    root: PathBuf,
}

impl IncrementalCache {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        IncrementalCache { root: root.into() }
    }

    fn hashes_path(&self) -> PathBuf {
        self.root.join("file-hashes.json")
    }

    fn result_path(&self, normalized_path: &str) -> PathBuf {
        self.root.join("results").join(format!("{normalized_path}.json"))
    }

    fn read_hashes(&self) -> HashMap<String, String> {
        let path = self.hashes_path();
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, path = %path.display(), "corrupt file-hashes.json, treating as empty");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    fn write_hashes(&self, hashes: &HashMap<String, String>) -> std::io::Result<()> {
        let bytes = serde_json::to_vec_pretty(hashes)?;
        write_atomic(&self.hashes_path(), &bytes)
    }

    fn read_entry(&self, normalized_path: &str) -> Option<CacheEntry> {
        let path = self.result_path(normalized_path);
        let bytes = fs::read(&path).ok()?;
        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "corrupt cache entry, treating as miss");
                None
            }
        }
    }

    /// Looks up a detector's cached result for `path` at `current_hash`.
    /// A hit requires the stored hash to match AND every detector in
    /// `detector_set` to have a stored slot (§4.2 `lookup`).
    pub fn lookup(
        &self,
        path: &str,
        current_hash: &str,
        detector_set: &[String],
    ) -> Option<HashMap<String, Vec<Issue>>> {
        let entry = self.read_entry(path)?;
        if entry.hash != current_hash {
            return None;
        }
        let have: HashSet<&String> = entry.detectors.keys().collect();
        if !detector_set.iter().all(|d| have.contains(d)) {
            return None;
        }
        Some(
            detector_set
                .iter()
                .map(|d| (d.clone(), entry.detectors[d].clone()))
                .collect(),
        )
    }

    /// Overwrites `detector`'s slot for `path`, updating the entry's
    /// timestamp and the global hash index (§4.2 `store`).
    pub fn store(
        &self,
        path: &str,
        hash: &str,
        detector: &str,
        issues: Vec<Issue>,
    ) -> std::io::Result<()> {
        let mut entry = self.read_entry(path).unwrap_or_else(|| CacheEntry {
            path: path.to_string(),
            hash: hash.to_string(),
            timestamp: Utc::now(),
            detectors: HashMap::new(),
        });
        if entry.hash != hash {
            entry.detectors.clear();
            entry.hash = hash.to_string();
        }
        entry.timestamp = Utc::now();
        entry.detectors.insert(detector.to_string(), issues);

        let bytes = serde_json::to_vec_pretty(&entry)?;
        write_atomic(&self.result_path(path), &bytes)?;

        let mut hashes = self.read_hashes();
        hashes.insert(path.to_string(), hash.to_string());
        self.write_hashes(&hashes)
    }

    /// Clears the entire cache.
    pub fn clear(&self) -> std::io::Result<()> {
        let results_dir = self.root.join("results");
        if results_dir.exists() {
            fs::remove_dir_all(&results_dir)?;
        }
        let hashes_path = self.hashes_path();
        if hashes_path.exists() {
            fs::remove_file(&hashes_path)?;
        }
        Ok(())
    }

    /// Clears a single file's cached entry.
    pub fn clear_path(&self, path: &str) -> std::io::Result<()> {
        let result_path = self.result_path(path);
        if result_path.exists() {
            fs::remove_file(&result_path)?;
        }
        let mut hashes = self.read_hashes();
        if hashes.remove(path).is_some() {
            self.write_hashes(&hashes)?;
        }
        Ok(())
    }

    /// The stored hash for `path`, if any, without validating detector
    /// coverage. Used by the executor to decide whether a file changed at
    /// all before consulting `lookup` per detector.
    pub fn stored_hash(&self, path: &str) -> Option<String> {
        self.read_hashes().get(path).cloned()
    }
}
