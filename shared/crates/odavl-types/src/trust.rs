use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-recipe outcome an applied plan produced, fed into C8's confidence
/// update (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipeOutcome {
    Success,
    Failure,
    Rollback,
}

/// Per-recipe trust statistics (§3). `confidence` is unbounded above and
/// floored at 0 (§4.8); updates must be a pure, replayable function of the
/// outcome stream (invariant I7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeTrust {
    pub recipe_id: String,
    pub runs: u64,
    pub successes: u64,
    pub failures: u64,
    pub rollbacks: u64,
    pub confidence: f64,
    pub last_updated: DateTime<Utc>,
}

impl RecipeTrust {
    pub fn new(recipe_id: impl Into<String>) -> Self {
        RecipeTrust {
            recipe_id: recipe_id.into(),
            runs: 0,
            successes: 0,
            failures: 0,
            rollbacks: 0,
            confidence: 0.0,
            last_updated: Utc::now(),
        }
    }
}
