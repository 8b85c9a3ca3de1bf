use odavl_types::{fingerprint_issue, Baseline, BaselineIssue, ComparisonResult, Issue};
use std::collections::HashMap;

const FUZZY_LINE_WINDOW: i64 = 3;

/// Compares `current` issues against `baseline` per §4.5:
///
/// 1. Index baseline by `(normalized-path, ruleId)`.
/// 2. Exact fingerprint match ⇒ unchanged.
/// 3. Else a unique baseline entry within ±3 lines in the same bucket ⇒
///    unchanged (fuzzy match), and that entry is consumed so it cannot
///    also match a different current issue.
/// 4. Remaining current issues are new; remaining baseline entries are
///    resolved.
///
/// Property P10: `new ∪ resolved ∪ unchanged` partitions
/// `current ∪ baseline`; property P11: fuzzy matching never crosses the
/// ±3-line window or a differing `(file, ruleId)` bucket.
pub fn compare(current: &[Issue], baseline: &Baseline) -> ComparisonResult {
    let mut buckets: HashMap<(String, String), Vec<usize>> = HashMap::new();
    for (idx, entry) in baseline.issues.iter().enumerate() {
        let key = bucket_key(&entry.issue.file, entry.issue.rule_id.as_deref());
        buckets.entry(key).or_default().push(idx);
    }

    let mut consumed = vec![false; baseline.issues.len()];
    let mut new = Vec::new();
    let mut unchanged = Vec::new();

    for issue in current {
        let fp = fingerprint_issue(issue);
        let key = bucket_key(&issue.file, issue.rule_id.as_deref());
        let Some(candidates) = buckets.get(&key) else {
            new.push(issue.clone());
            continue;
        };

        let exact = candidates
            .iter()
            .find(|&&idx| !consumed[idx] && baseline.issues[idx].fingerprint == fp);
        if let Some(&idx) = exact {
            consumed[idx] = true;
            unchanged.push(issue.clone());
            continue;
        }

        let fuzzy: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&idx| {
                !consumed[idx]
                    && (baseline.issues[idx].issue.line as i64 - issue.line as i64).abs()
                        <= FUZZY_LINE_WINDOW
            })
            .collect();

        if fuzzy.len() == 1 {
            consumed[fuzzy[0]] = true;
            unchanged.push(issue.clone());
        } else {
            new.push(issue.clone());
        }
    }

    let resolved: Vec<BaselineIssue> = baseline
        .issues
        .iter()
        .enumerate()
        .filter(|(idx, _)| !consumed[*idx])
        .map(|(_, entry)| entry.clone())
        .collect();

    let delta_percent = if baseline.total_issues == 0 {
        if new.is_empty() {
            0.0
        } else {
            100.0
        }
    } else {
        ((new.len() as f64 - resolved.len() as f64) / baseline.total_issues as f64) * 100.0
    };

    ComparisonResult {
        new,
        resolved,
        unchanged,
        delta_percent,
    }
}

fn bucket_key(file: &str, rule_id: Option<&str>) -> (String, String) {
    (file.to_string(), rule_id.unwrap_or("").to_string())
}

/// Exit-code contract for CLI integration (§4.5): non-zero only if the
/// set of new issues at or above `fail_level` is non-empty, or if
/// `fail_on_new` is set and any new issue exists.
pub fn should_fail(
    result: &ComparisonResult,
    fail_level: odavl_types::Severity,
    fail_on_new: bool,
) -> bool {
    if fail_on_new && !result.new.is_empty() {
        return true;
    }
    result.new.iter().any(|i| i.severity >= fail_level)
}
