//! # Risk-Budget Gate (C7)
//!
//! Enforces per-run and per-action limits and vetoes forbidden paths
//! (§4.7). `evaluate_pre` runs in DECIDE before a snapshot is taken;
//! `evaluate_post` runs in VERIFY after the re-analysis and decides
//! whether ACT's changes are committed or rolled back.

use glob::Pattern;
use odavl_types::{GateDecision, GatePlan, RiskBudget};
use tracing::warn;

/// No plan touching a forbidden path is ever admitted, for any budget
/// (§4.7, property P12, invariant I5).
fn forbidden_match<'a>(budget: &'a RiskBudget, path: &str) -> Option<&'a str> {
    budget
        .forbidden_path_patterns
        .iter()
        .find(|pattern| {
            Pattern::new(pattern)
                .map(|p| p.matches(path))
                .unwrap_or(false)
        })
        .map(|s| s.as_str())
}

/// Pre-action checks (§4.7): forbidden paths, file count, LOC budget,
/// and per-recipe / aggregate risk-score budgets.
pub fn evaluate_pre(plan: &GatePlan, budget: &RiskBudget) -> GateDecision {
    for path in &plan.files_to_modify {
        if let Some(pattern) = forbidden_match(budget, path) {
            return GateDecision::Reject {
                reason: format!("path '{path}' matches forbidden pattern '{pattern}'"),
            };
        }
    }

    if plan.files_to_modify.len() as u32 > budget.max_files_per_run {
        return GateDecision::Reject {
            reason: format!(
                "{} files exceeds maxFilesPerRun {}",
                plan.files_to_modify.len(),
                budget.max_files_per_run
            ),
        };
    }

    if plan.estimated_loc_change > budget.max_lines_of_code_change {
        return GateDecision::Reject {
            reason: format!(
                "{} LOC change exceeds maxLinesOfCodeChange {}",
                plan.estimated_loc_change, budget.max_lines_of_code_change
            ),
        };
    }

    let total_risk: f64 = plan.recipe_risk_scores.iter().sum();
    if total_risk > budget.risk_score_budget {
        return GateDecision::Reject {
            reason: format!(
                "total risk score {total_risk:.3} exceeds riskScoreBudget {:.3}",
                budget.risk_score_budget
            ),
        };
    }
    if let Some(&over) = plan
        .recipe_risk_scores
        .iter()
        .find(|&&r| r > budget.max_risk_per_action)
    {
        return GateDecision::Reject {
            reason: format!(
                "recipe risk {over:.3} exceeds maxRiskPerAction {:.3}",
                budget.max_risk_per_action
            ),
        };
    }

    GateDecision::Admit
}

/// Post-action checks (§4.7, Verify phase): compares `post_action_metrics`
/// (required to be set by this point) against the budget's error/warning
/// ceilings. Any failure here is a gate violation mandating rollback via
/// C6 and a trust penalty via C8.
pub fn evaluate_post(plan: &GatePlan, budget: &RiskBudget) -> GateDecision {
    let Some(post) = plan.post_action_metrics else {
        warn!("evaluate_post called without post_action_metrics");
        return GateDecision::Reject {
            reason: "post-action metrics missing".to_string(),
        };
    };
    let pre = plan.pre_action_metrics;

    let new_type_errors = post.type_errors.saturating_sub(pre.type_errors);
    if new_type_errors > budget.max_type_errors_after {
        return GateDecision::Reject {
            reason: format!(
                "{new_type_errors} new type errors exceeds maxTypeErrorsAfter {}",
                budget.max_type_errors_after
            ),
        };
    }

    let new_warnings = post.warnings.saturating_sub(pre.warnings);
    if new_warnings > budget.max_warnings_after {
        return GateDecision::Reject {
            reason: format!(
                "{new_warnings} new warnings exceeds maxWarningsAfter {}",
                budget.max_warnings_after
            ),
        };
    }

    GateDecision::Admit
}
