use crate::issue::Issue;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A file's content-addressed identity: a normalized workspace-relative
/// path paired with the SHA-256 hex of its raw bytes (§3 "File
/// fingerprint"). Equal hash implies equal bytes (invariant I1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct FileFingerprint {
    pub path: String,
    pub hash: String,
}

/// Which fingerprint tier produced an [`IssueFingerprint`] (§3). The first
/// tier whose inputs are all non-empty is the one used; recorded so
/// [`crate::Baseline`] comparisons can explain a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FingerprintTier {
    /// `SHA-256(ruleId|detector|severity|3-line snippet)`.
    RuleSeveritySnippet,
    /// `SHA-256(normalized-path|line|ruleId)` truncated to 16 hex.
    PathLineRule,
    /// `SHA-256(normalized-path|line|message)` truncated to 16 hex.
    PathLineMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFingerprint {
    pub tier: FingerprintTier,
    pub value: String,
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Computes the issue fingerprint per §3's multi-tier rule, trying tier 1
/// first and falling through only when an input is missing.
pub fn fingerprint_issue(issue: &Issue) -> IssueFingerprint {
    if let (Some(rule_id), Some(snippet)) = (&issue.rule_id, issue.snippet_for_fingerprint()) {
        if !rule_id.is_empty() {
            let input = format!(
                "{}|{}|{}|{}",
                rule_id,
                issue.detector,
                issue.severity.as_str(),
                snippet
            );
            return IssueFingerprint {
                tier: FingerprintTier::RuleSeveritySnippet,
                value: sha256_hex(&input),
            };
        }
    }

    if let Some(rule_id) = issue.rule_id.as_deref().filter(|r| !r.is_empty()) {
        let input = format!("{}|{}|{}", issue.file, issue.line, rule_id);
        let full = sha256_hex(&input);
        return IssueFingerprint {
            tier: FingerprintTier::PathLineRule,
            value: full[..16].to_string(),
        };
    }

    let input = format!("{}|{}|{}", issue.file, issue.line, issue.message);
    let full = sha256_hex(&input);
    IssueFingerprint {
        tier: FingerprintTier::PathLineMessage,
        value: full[..16].to_string(),
    }
}
