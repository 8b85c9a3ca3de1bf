use crate::fingerprint::IssueFingerprint;
use crate::issue::Issue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current on-disk baseline schema version (§3, §6). Bumped whenever a
/// field is added or reinterpreted; [`crate::error::OdavlError::ConfigInvalid`]
/// is raised on mismatch during load.
pub const BASELINE_SCHEMA_VERSION: u32 = 1;

/// A baseline issue carries its fingerprint (and the tier that produced
/// it) plus the timestamp it was first observed (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineIssue {
    #[serde(flatten)]
    pub issue: Issue,
    pub fingerprint: IssueFingerprint,
    pub first_seen: DateTime<Utc>,
}

/// Versioned, append-only-from-the-core's-perspective document (§3).
/// Named baselines may be overwritten by explicit user action only
/// (`create(..., force=true)`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub vcs_commit: Option<String>,
    pub vcs_branch: Option<String>,
    pub detector_set: Vec<String>,
    pub total_issues: usize,
    pub issues: Vec<BaselineIssue>,
}

impl Baseline {
    pub fn new(
        created_by: impl Into<String>,
        detector_set: Vec<String>,
        issues: Vec<BaselineIssue>,
    ) -> Self {
        Baseline {
            schema_version: BASELINE_SCHEMA_VERSION,
            created_at: Utc::now(),
            created_by: created_by.into(),
            vcs_commit: None,
            vcs_branch: None,
            detector_set,
            total_issues: issues.len(),
            issues,
        }
    }
}

/// Output of [`crate::capability`]-independent baseline comparison (§3,
/// §4.5). `new ∪ resolved ∪ unchanged` partitions the union of current and
/// baseline issues per invariant/property P10.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub new: Vec<Issue>,
    pub resolved: Vec<BaselineIssue>,
    pub unchanged: Vec<Issue>,
    pub delta_percent: f64,
}
