use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyEvent {
    AdaptiveAdjustment,
    ManualOverride,
    Reset,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: f64,
    pub new: f64,
    pub delta_pct: f64,
}

/// Append-only entry recording a risk-budget change (§3, §4.11). Never
/// rewritten (invariant I3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyLedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub event: PolicyEvent,
    pub changes: BTreeMap<String, FieldChange>,
    pub reason: String,
    pub trust_score_at_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Success,
    Failure,
    RolledBack,
    Noop,
    Cancelled,
}

/// Append-only run record (§3, §4.9 LEARN).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub trust_before: f64,
    pub trust_after: f64,
    pub recipes_applied: Vec<String>,
    pub attestation_id: Option<String>,
}
