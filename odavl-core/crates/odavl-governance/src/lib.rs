//! # Policy Ledger & Adaptive Governance (C11)
//!
//! On LEARN, inspects recent run history and, when the trust trend
//! crosses a threshold, scales `maxFilesPerRun`/`maxLinesOfCodeChange`
//! and appends an immutable ledger entry plus a governance attestation
//! (§4.11). `maxTypeErrorsAfter` and forbidden paths are never adjusted
//! here; they require an explicit `ManualOverride` entry.

use chrono::Utc;
use odavl_types::atomic::write_atomic;
use odavl_types::{
    FieldChange, OdavlResult, PolicyEvent, PolicyLedgerEntry, RiskBudget, RunHistoryEntry, RunOutcome,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::info;

const RAISE_WINDOW: usize = 5;
const RAISE_THRESHOLD: f64 = 0.90;
const LOWER_WINDOW: usize = 3;
const LOWER_THRESHOLD: f64 = 0.80;

/// Policy ledger storage rooted at `<workspace>/.odavl/policy-ledger.json`
/// (§6), an append-only list never rewritten in place except to grow
/// (invariant I3).
pub struct PolicyStore {
    path: PathBuf,
}

impl PolicyStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        PolicyStore {
            path: root.into().join("policy-ledger.json"),
        }
    }

    pub fn load(&self) -> OdavlResult<Vec<PolicyLedgerEntry>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(_) => Ok(Vec::new()),
        }
    }

    /// Appends an already-computed ledger entry (adaptive or manual) to
    /// storage.
    pub fn append(&self, entry: PolicyLedgerEntry) -> OdavlResult<()> {
        let mut entries = self.load()?;
        entries.push(entry);
        let bytes = odavl_types::to_canonical_json_bytes(&entries)?;
        write_atomic(&self.path, &bytes)
    }

    /// Records an explicit, non-automatic change to fields this crate's
    /// automatic rule never touches (§4.11).
    pub fn manual_override(
        &self,
        changes: BTreeMap<String, FieldChange>,
        reason: impl Into<String>,
        trust_score_at_time: f64,
    ) -> OdavlResult<PolicyLedgerEntry> {
        let entry = PolicyLedgerEntry {
            timestamp: Utc::now(),
            event: PolicyEvent::ManualOverride,
            changes,
            reason: reason.into(),
            trust_score_at_time,
        };
        self.append(entry.clone())?;
        Ok(entry)
    }
}

fn scale_up(value: u32) -> u32 {
    ((value as f64) * 1.1).ceil() as u32
}

fn scale_down(value: u32) -> u32 {
    (((value as f64) * 0.9).floor() as u32).max(1)
}

/// Evaluates the adaptive-governance rule against recent run history
/// (§4.11). Returns the adjusted budget and the ledger entry to append
/// when a threshold crossing fires, or `None` when neither condition
/// applies.
pub fn evaluate(history: &[RunHistoryEntry], budget: &RiskBudget) -> Option<(RiskBudget, PolicyLedgerEntry)> {
    let last_n = |n: usize| -> Vec<&RunHistoryEntry> { history.iter().rev().take(n).collect() };

    let last_five_successful: Vec<&RunHistoryEntry> = history
        .iter()
        .rev()
        .filter(|e| e.outcome == RunOutcome::Success)
        .take(RAISE_WINDOW)
        .collect();
    let raise = last_five_successful.len() == RAISE_WINDOW
        && mean_trust(&last_five_successful) >= RAISE_THRESHOLD;

    let last_three = last_n(LOWER_WINDOW);
    let lower = !raise
        && last_three.len() == LOWER_WINDOW
        && mean_trust(&last_three) < LOWER_THRESHOLD;

    if !raise && !lower {
        return None;
    }

    let trust_score_at_time = history.last().map(|e| e.trust_after).unwrap_or(0.0);
    let mut adjusted = budget.clone();
    let mut changes = BTreeMap::new();

    if raise {
        adjusted.max_files_per_run = scale_up(budget.max_files_per_run);
        adjusted.max_lines_of_code_change = scale_up(budget.max_lines_of_code_change);
    } else {
        adjusted.max_files_per_run = scale_down(budget.max_files_per_run);
        adjusted.max_lines_of_code_change = scale_down(budget.max_lines_of_code_change);
    }

    changes.insert(
        "maxFilesPerRun".to_string(),
        field_change(budget.max_files_per_run, adjusted.max_files_per_run),
    );
    changes.insert(
        "maxLinesOfCodeChange".to_string(),
        field_change(budget.max_lines_of_code_change, adjusted.max_lines_of_code_change),
    );

    let reason = if raise {
        format!("rolling mean trust over last {RAISE_WINDOW} successful runs >= {RAISE_THRESHOLD}")
    } else {
        format!("rolling mean trust over last {LOWER_WINDOW} runs < {LOWER_THRESHOLD}")
    };
    info!(raise, lower, reason = %reason, "adaptive governance adjustment");

    let entry = PolicyLedgerEntry {
        timestamp: Utc::now(),
        event: PolicyEvent::AdaptiveAdjustment,
        changes,
        reason,
        trust_score_at_time,
    };
    Some((adjusted, entry))
}

fn field_change(old: u32, new: u32) -> FieldChange {
    let delta_pct = if old == 0 {
        0.0
    } else {
        ((new as f64) - (old as f64)) / (old as f64) * 100.0
    };
    FieldChange {
        old: old as f64,
        new: new as f64,
        delta_pct,
    }
}

fn mean_trust(entries: &[&RunHistoryEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    entries.iter().map(|e| e.trust_after).sum::<f64>() / entries.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(outcome: RunOutcome, trust_after: f64) -> RunHistoryEntry {
        RunHistoryEntry {
            timestamp: Utc::now(),
            outcome,
            trust_before: trust_after,
            trust_after,
            recipes_applied: vec!["unused-import".into()],
            attestation_id: None,
        }
    }

    #[test]
    fn raises_budget_when_five_successful_runs_average_above_threshold() {
        let history: Vec<RunHistoryEntry> = std::iter::repeat_with(|| entry(RunOutcome::Success, 0.95))
            .take(5)
            .collect();
        let budget = RiskBudget {
            max_files_per_run: 10,
            max_lines_of_code_change: 40,
            ..Default::default()
        };
        let (adjusted, ledger_entry) = evaluate(&history, &budget).expect("should adjust");
        assert_eq!(adjusted.max_files_per_run, 11);
        assert_eq!(adjusted.max_lines_of_code_change, 44);
        assert_eq!(ledger_entry.event, PolicyEvent::AdaptiveAdjustment);
    }

    #[test]
    fn lowers_budget_when_last_three_runs_average_below_threshold() {
        let history = vec![
            entry(RunOutcome::Failure, 0.5),
            entry(RunOutcome::Failure, 0.6),
            entry(RunOutcome::RolledBack, 0.55),
        ];
        let budget = RiskBudget {
            max_files_per_run: 10,
            max_lines_of_code_change: 40,
            ..Default::default()
        };
        let (adjusted, _) = evaluate(&history, &budget).expect("should adjust");
        assert_eq!(adjusted.max_files_per_run, 9);
        assert_eq!(adjusted.max_lines_of_code_change, 36);
    }

    #[test]
    fn lower_bound_never_drops_below_one() {
        let history = vec![
            entry(RunOutcome::Failure, 0.1),
            entry(RunOutcome::Failure, 0.1),
            entry(RunOutcome::Failure, 0.1),
        ];
        let budget = RiskBudget {
            max_files_per_run: 1,
            max_lines_of_code_change: 1,
            ..Default::default()
        };
        let (adjusted, _) = evaluate(&history, &budget).unwrap();
        assert_eq!(adjusted.max_files_per_run, 1);
        assert_eq!(adjusted.max_lines_of_code_change, 1);
    }

    #[test]
    fn no_change_when_neither_condition_is_met() {
        let history = vec![entry(RunOutcome::Success, 0.85), entry(RunOutcome::Success, 0.85)];
        let budget = RiskBudget::default();
        assert!(evaluate(&history, &budget).is_none());
    }

    #[test]
    fn insufficient_history_never_adjusts() {
        let history = vec![entry(RunOutcome::Success, 0.99)];
        let budget = RiskBudget::default();
        assert!(evaluate(&history, &budget).is_none());
    }

    #[test]
    fn manual_override_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::open(dir.path());
        let mut changes = BTreeMap::new();
        changes.insert(
            "maxTypeErrorsAfter".to_string(),
            FieldChange {
                old: 0.0,
                new: 2.0,
                delta_pct: 0.0,
            },
        );
        store.manual_override(changes, "operator requested relaxed gate", 0.5).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].event, PolicyEvent::ManualOverride);
    }
}
