use serde::{Deserialize, Serialize};

/// Risk budget mutated only through policy-ledger transitions (§3, §6
/// `gates.yml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBudget {
    pub max_files_per_run: u32,
    pub max_lines_of_code_change: u32,
    pub max_type_errors_after: u32,
    pub max_warnings_after: u32,
    pub forbidden_path_patterns: Vec<String>,
    pub risk_score_budget: f64,
    pub max_risk_per_action: f64,
}

impl Default for RiskBudget {
    fn default() -> Self {
        RiskBudget {
            max_files_per_run: 10,
            max_lines_of_code_change: 40,
            max_type_errors_after: 0,
            max_warnings_after: 0,
            forbidden_path_patterns: Vec::new(),
            risk_score_budget: 1.0,
            max_risk_per_action: 0.5,
        }
    }
}

/// Workspace quality metrics captured at OBSERVE and re-captured at
/// VERIFY (§4.9) for the gate's post-action comparison (§4.7).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    pub critical_issues: u32,
    pub high_issues: u32,
    pub medium_issues: u32,
    pub low_issues: u32,
    pub info_issues: u32,
    pub type_errors: u32,
    pub warnings: u32,
}

impl RunMetrics {
    pub fn total_issues(&self) -> u32 {
        self.critical_issues + self.high_issues + self.medium_issues + self.low_issues + self.info_issues
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GateDecision {
    Admit,
    Reject { reason: String },
}

impl GateDecision {
    pub fn is_admit(&self) -> bool {
        matches!(self, GateDecision::Admit)
    }
}

/// What the gate evaluates (§4.7): the files a plan touches, its
/// estimated LOC change, the recipes composing it, and the pre-/post-
/// action metrics used for the Verify-phase comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatePlan {
    pub files_to_modify: Vec<String>,
    pub estimated_loc_change: u32,
    pub recipe_ids: Vec<String>,
    pub recipe_risk_scores: Vec<f64>,
    pub pre_action_metrics: RunMetrics,
    pub post_action_metrics: Option<RunMetrics>,
}
