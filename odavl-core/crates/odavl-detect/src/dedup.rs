use odavl_types::{issue_sort_key, Issue};
use std::collections::HashMap;

/// Key under which two issues are considered the same finding (§4.4):
/// equal `{normalized-path, line, column, normalized ruleId}`.
fn dedupe_key(issue: &Issue) -> (String, u32, Option<u32>, String) {
    let rule = issue
        .rule_id
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    (issue.file.clone(), issue.line, issue.column, rule)
}

/// Collapses issues sharing a `dedupe_key`, keeping the highest severity
/// survivor, then sorts the result by `(file asc, line asc, column asc,
/// detector asc)` (§4.4). The sort is the single source of the
/// determinism guaranteed by invariant I6 / property P2: it does not
/// depend on detector or file enumeration order, only on issue content.
pub fn dedupe_and_sort(issues: Vec<Issue>) -> Vec<Issue> {
    let mut by_key: HashMap<(String, u32, Option<u32>, String), Issue> = HashMap::new();
    for issue in issues {
        let key = dedupe_key(&issue);
        match by_key.get(&key) {
            Some(existing) if existing.severity >= issue.severity => {}
            _ => {
                by_key.insert(key, issue);
            }
        }
    }
    let mut result: Vec<Issue> = by_key.into_values().collect();
    result.sort_by(|a, b| issue_sort_key(a).cmp(&issue_sort_key(b)));
    result
}
