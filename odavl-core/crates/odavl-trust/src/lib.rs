//! # Recipe Trust Scorer (C8)
//!
//! Tracks per-recipe confidence as a pure, replayable function of the
//! outcome stream (§4.8, invariant I7): given the same ordered sequence
//! of outcomes, `update` always produces the same `RecipeTrust`,
//! independent of wall-clock time or process restarts.

use chrono::Utc;
use odavl_types::atomic::write_atomic;
use odavl_types::{OdavlError, OdavlResult, RecipeOutcome, RecipeTrust};
use std::fs;
use std::path::PathBuf;

const SUCCESS_DELTA: f64 = 0.05;
const FAILURE_DELTA: f64 = -0.10;
const ROLLBACK_DELTA: f64 = -0.05;

/// Recipe trust storage rooted at `<workspace>/.odavl/trust` (§6), one
/// JSON file per recipe id.
pub struct TrustStore {
    root: PathBuf,
}

impl TrustStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        TrustStore { root: root.into() }
    }

    fn path_for(&self, recipe_id: &str) -> PathBuf {
        self.root.join(format!("{recipe_id}.json"))
    }

    /// Loads a recipe's trust record, or a fresh zero-confidence record
    /// if none has been persisted yet.
    pub fn load(&self, recipe_id: &str) -> OdavlResult<RecipeTrust> {
        let path = self.path_for(recipe_id);
        match fs::read(&path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| OdavlError::ConfigInvalid(e.to_string()))
            }
            Err(_) => Ok(RecipeTrust::new(recipe_id)),
        }
    }

    /// Applies one outcome to a recipe's running trust record and
    /// persists the result atomically (§4.8 update rule).
    pub fn record(&self, recipe_id: &str, outcome: RecipeOutcome) -> OdavlResult<RecipeTrust> {
        let mut trust = self.load(recipe_id)?;
        apply_outcome(&mut trust, outcome);
        fs::create_dir_all(&self.root)?;
        let bytes = odavl_types::to_canonical_json_bytes(&trust)?;
        write_atomic(&self.path_for(recipe_id), &bytes)?;
        Ok(trust)
    }

    /// Loads every recipe's trust record under this store, ranked by
    /// confidence descending, then runs descending, then recipe id
    /// ascending (§4.8 `rank`).
    pub fn rank(&self) -> OdavlResult<Vec<RecipeTrust>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(entry.path())?;
            let trust: RecipeTrust =
                serde_json::from_slice(&bytes).map_err(|e| OdavlError::ConfigInvalid(e.to_string()))?;
            entries.push(trust);
        }
        entries.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.runs.cmp(&a.runs))
                .then_with(|| a.recipe_id.cmp(&b.recipe_id))
        });
        Ok(entries)
    }
}

/// The confidence update rule itself, factored out so it can be exercised
/// directly against a bare `RecipeTrust` without going through storage —
/// this is what invariant I7's replayability is actually about: replaying
/// the same outcome sequence through this function always lands on the
/// same confidence, regardless of when or how many times it's called.
pub fn apply_outcome(trust: &mut RecipeTrust, outcome: RecipeOutcome) {
    trust.runs += 1;
    let delta = match outcome {
        RecipeOutcome::Success => {
            trust.successes += 1;
            SUCCESS_DELTA
        }
        RecipeOutcome::Failure => {
            trust.failures += 1;
            FAILURE_DELTA
        }
        RecipeOutcome::Rollback => {
            trust.rollbacks += 1;
            ROLLBACK_DELTA
        }
    };
    trust.confidence = (trust.confidence + delta).max(0.0);
    trust.last_updated = Utc::now();
}

/// Replays an ordered outcome history from a fresh record, for callers
/// (e.g. the attestation verifier) that need to recompute trust without
/// touching the store (§4.8, I7).
pub fn replay(recipe_id: &str, outcomes: &[RecipeOutcome]) -> RecipeTrust {
    let mut trust = RecipeTrust::new(recipe_id);
    for &outcome in outcomes {
        apply_outcome(&mut trust, outcome);
    }
    trust
}
