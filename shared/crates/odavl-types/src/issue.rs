use serde::{Deserialize, Serialize};

/// Five-level severity scale, totally ordered `critical > high > medium >
/// low > info` (§3). Variants are declared weakest-first so the derived
/// `Ord` agrees with that relation directly: `Severity::Critical >
/// Severity::High` holds under plain `>` comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single issue reported by a detector. Issues are value objects: once
/// emitted for a run they are immutable (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Workspace-relative, forward-slash-normalized path.
    pub file: String,
    pub line: u32,
    pub column: Option<u32>,
    pub end_line: Option<u32>,
    pub severity: Severity,
    pub message: String,
    pub detector: String,
    pub rule_id: Option<String>,
    pub code_snippet: Option<String>,
    pub category: Option<String>,
}

impl Issue {
    /// The three-line snippet window used by tier-1 fingerprinting:
    /// `code_snippet` itself is expected to already hold (up to) three
    /// lines centered on `line`; detectors that do not supply one leave
    /// tier-1 fingerprinting to fall through to tier-2/3 (§3).
    pub fn snippet_for_fingerprint(&self) -> Option<&str> {
        self.code_snippet.as_deref().filter(|s| !s.is_empty())
    }
}

/// Ordering key used by C4's final sort: (file asc, line asc, column asc,
/// detector asc) (§4.4).
pub fn issue_sort_key(issue: &Issue) -> (String, u32, u32, String) {
    (
        issue.file.clone(),
        issue.line,
        issue.column.unwrap_or(0),
        issue.detector.clone(),
    )
}
