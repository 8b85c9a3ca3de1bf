use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A file captured into a [`Snapshot`] prior to a destructive action (§3,
/// §4.6). `pre_bytes` is the exact byte content so `restore` can write it
/// back atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub path: String,
    pub pre_bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanType {
    RecipeApply,
    Manual,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub files_modified: usize,
    pub lines_changed: usize,
}

/// Pre-action filesystem state captured by C6, keyed by UUID under the
/// recovery directory (§3, §6 `undo/snapshot-<uuid>/`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub plan_type: PlanType,
    pub files: Vec<SnapshotFile>,
    pub unified_diff: String,
    pub metadata: SnapshotMetadata,
}

/// Outcome of a [`Snapshot`] restore (§4.6 `restore(uuid)`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreReport {
    pub snapshot_id: Uuid,
    pub files_restored: usize,
    pub recovery_latency_ms: u64,
    pub trigger_reason: String,
}

/// A single file this recipe's plan intends to modify, carrying the bytes
/// it would write so C6 can snapshot before and C7 can estimate LOC delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedFileChange {
    pub path: String,
    pub new_bytes: Vec<u8>,
    pub lines_changed: usize,
}

/// A closed-box modification plan returned by a [`crate::Recipe`] (§3
/// "Recipe"). The orchestrator never inspects how the plan was derived,
/// only what it intends to touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModificationPlan {
    pub recipe_id: String,
    pub changes: Vec<PlannedFileChange>,
    pub risk_score: f64,
}

impl ModificationPlan {
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.path.as_str())
    }

    pub fn total_lines_changed(&self) -> usize {
        self.changes.iter().map(|c| c.lines_changed).sum()
    }
}
