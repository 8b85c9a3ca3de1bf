//! # Phase Orchestrator (C9)
//!
//! Sequences one ODAVL cycle — OBSERVE, DECIDE, ACT, VERIFY, LEARN —
//! branching to ROLLBACK on a gate violation and short-circuiting to
//! LEARN(no-op) when DECIDE finds no admissible plan (§4.9). Runs are
//! strictly serial; the only concurrency is inside C3's detector
//! executor. Cross-component state is passed explicitly through
//! [`OrchestratorContext`] rather than module-level singletons (§9
//! Design Notes).

mod history;

pub use history::RunHistoryStore;

use chrono::Utc;
use odavl_attest::AttestationStore;
use odavl_baseline::compare;
use odavl_cache::IncrementalCache;
use odavl_detect::{execute, DetectorRegistry, ExecutorConfig};
use odavl_governance::{evaluate as evaluate_governance, PolicyStore};
use odavl_snapshot::SnapshotStore;
use odavl_trust::TrustStore;
use odavl_types::atomic::write_atomic;
use odavl_types::{
    Attestation, Baseline, GateDecision, GatePlan, Issue, ModificationPlan, OdavlResult, Recipe,
    RecipeContext, RecipeOutcome, RiskBudget, RunHistoryEntry, RunMetrics, RunOutcome, RunType, Severity,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything one run needs, bundled explicitly so no component reaches
/// for ambient state (§9).
pub struct OrchestratorContext {
    pub workspace_root: PathBuf,
    pub registry: DetectorRegistry,
    pub recipes: Vec<Arc<dyn Recipe>>,
    pub cache: IncrementalCache,
    pub snapshot_store: SnapshotStore,
    pub trust_store: TrustStore,
    pub attestation_store: AttestationStore,
    pub policy_store: PolicyStore,
    pub run_history_store: RunHistoryStore,
    pub executor_config: ExecutorConfig,
    /// Loaded once per run if a named baseline is configured; OBSERVE
    /// logs the comparison but DECIDE does not gate on it (baseline
    /// diffing is primarily the `verify` CLI command's concern, §4.5).
    pub baseline: Option<Baseline>,
}

/// Outcome of one full ODAVL cycle (§4.9, §7 "every run terminates with
/// a typed outcome plus a human-readable reason and a pointer to the
/// run's attestation").
#[derive(Debug)]
pub struct RunReport {
    pub run_id: u64,
    pub outcome: RunOutcome,
    pub reason: String,
    pub issues: Vec<Issue>,
    pub metrics_before: RunMetrics,
    pub metrics_after: Option<RunMetrics>,
    pub attestation: Option<Attestation>,
    pub recovery_attestation: Option<Attestation>,
    pub governance_attestation: Option<Attestation>,
    pub adjusted_budget: Option<RiskBudget>,
}

fn metrics_from_issues(issues: &[Issue]) -> RunMetrics {
    let mut m = RunMetrics::default();
    for issue in issues {
        match issue.severity {
            Severity::Critical => m.critical_issues += 1,
            Severity::High => m.high_issues += 1,
            Severity::Medium => m.medium_issues += 1,
            Severity::Low => m.low_issues += 1,
            Severity::Info => m.info_issues += 1,
        }
        match issue.category.as_deref() {
            Some("type-error") => m.type_errors += 1,
            Some("warning") => m.warnings += 1,
            _ => {}
        }
    }
    m
}

/// Orders `ctx.recipes` by C8 confidence descending, runs descending,
/// id ascending — recipes with no persisted trust record default to
/// zero confidence (§4.9 DECIDE "using C8 rankings").
fn ranked_recipes(ctx: &OrchestratorContext) -> OdavlResult<Vec<Arc<dyn Recipe>>> {
    let ranked = ctx.trust_store.rank()?;
    let confidence: std::collections::HashMap<String, (f64, u64)> = ranked
        .into_iter()
        .map(|t| (t.recipe_id, (t.confidence, t.runs)))
        .collect();

    let mut recipes = ctx.recipes.clone();
    recipes.sort_by(|a, b| {
        let (ca, ra) = confidence.get(a.id()).copied().unwrap_or((0.0, 0));
        let (cb, rb) = confidence.get(b.id()).copied().unwrap_or((0.0, 0));
        cb.partial_cmp(&ca)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| rb.cmp(&ra))
            .then_with(|| a.id().cmp(b.id()))
    });
    Ok(recipes)
}

/// Composes a plan within `budget` (§4.9 DECIDE): walk recipes in trust
/// order, skip any that disclaim protected-path respect or exceed their
/// own declared per-recipe limits, and take the first whose plan is
/// admitted by the pre-action gate. Returns `None` when no recipe yields
/// an admissible plan.
fn decide(
    ctx: &OrchestratorContext,
    issues: &[Issue],
    files: &[String],
    budget: &RiskBudget,
    pre_action_metrics: RunMetrics,
) -> OdavlResult<Option<(ModificationPlan, GatePlan, bool)>> {
    let workspace_root = ctx.workspace_root.clone();
    let read_file = move |p: &str| -> std::io::Result<Vec<u8>> { fs::read(workspace_root.join(p)) };
    let recipe_ctx = RecipeContext {
        files,
        issues,
        read_file: &read_file,
    };

    for recipe in ranked_recipes(ctx)? {
        if !recipe.declared_protected_respect() {
            continue;
        }
        let plan = match recipe.plan(&recipe_ctx) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(recipe = recipe.id(), error = %e, "recipe declined to plan");
                continue;
            }
        };

        if plan.changes.len() as u32 > recipe.max_files_touched() {
            continue;
        }
        if plan.total_lines_changed() as u32 > recipe.max_lines_changed() {
            continue;
        }

        let gate_plan = GatePlan {
            files_to_modify: plan.files().map(|s| s.to_string()).collect(),
            estimated_loc_change: plan.total_lines_changed() as u32,
            recipe_ids: vec![plan.recipe_id.clone()],
            recipe_risk_scores: vec![plan.risk_score],
            pre_action_metrics,
            post_action_metrics: None,
        };

        if odavl_gate::evaluate_pre(&gate_plan, budget).is_admit() {
            return Ok(Some((plan, gate_plan, recipe.requires_workspace_type_check())));
        }
    }
    Ok(None)
}

/// LEARN (§4.9): updates C8 with the recipe outcome (if any), appends a
/// run-history entry, signs and appends the run's `core` attestation,
/// and hands the updated history to C11 for an adaptive-adjustment
/// check.
#[allow(clippy::too_many_arguments)]
fn learn(
    ctx: &OrchestratorContext,
    run_id: u64,
    outcome: RunOutcome,
    reason: String,
    recipe_update: Option<(String, RecipeOutcome)>,
    issues: Vec<Issue>,
    metrics_before: RunMetrics,
    metrics_after: Option<RunMetrics>,
    history: &[RunHistoryEntry],
    budget: &RiskBudget,
    recovery_attestation: Option<Attestation>,
) -> OdavlResult<RunReport> {
    let trust_before = match &recipe_update {
        Some((id, _)) => ctx.trust_store.load(id)?.confidence,
        None => 0.0,
    };

    let mut recipes_applied = Vec::new();
    let trust_after = if let Some((recipe_id, recipe_outcome)) = &recipe_update {
        let trust = ctx.trust_store.record(recipe_id, *recipe_outcome)?;
        recipes_applied.push(recipe_id.clone());
        trust.confidence
    } else {
        trust_before
    };

    let payload = serde_json::json!({
        "runId": run_id,
        "outcome": outcome,
        "reason": reason,
        "metricsBefore": metrics_before,
        "metricsAfter": metrics_after,
        "issueCount": issues.len(),
        "recipesApplied": recipes_applied,
    });
    let attestation = ctx.attestation_store.append(run_id, RunType::Core, &payload)?;

    let history_entry = RunHistoryEntry {
        timestamp: Utc::now(),
        outcome,
        trust_before,
        trust_after,
        recipes_applied,
        attestation_id: Some(attestation.payload_hash.clone()),
    };
    ctx.run_history_store.append(history_entry.clone())?;
    info!(run_id, outcome = ?outcome, reason = %reason, "learn complete");

    let mut full_history = history.to_vec();
    full_history.push(history_entry);

    let (adjusted_budget, governance_attestation) = match evaluate_governance(&full_history, budget) {
        Some((adjusted, entry)) => {
            ctx.policy_store.append(entry.clone())?;
            let gov_attestation = ctx.attestation_store.append(run_id, RunType::Governance, &entry)?;
            (Some(adjusted), Some(gov_attestation))
        }
        None => (None, None),
    };

    Ok(RunReport {
        run_id,
        outcome,
        reason,
        issues,
        metrics_before,
        metrics_after,
        attestation: Some(attestation),
        recovery_attestation,
        governance_attestation,
        adjusted_budget,
    })
}

/// Runs one full ODAVL cycle against `files` under `budget`, given the
/// run history accumulated so far. `is_cancelled` is polled between
/// phases (§4.9 Cancellation): a cancel before ACT begins ends the run
/// at LEARN(cancelled) with no snapshot; a cancel after ACT has begun
/// triggers ROLLBACK before LEARN(cancelled).
pub fn run(
    ctx: &OrchestratorContext,
    budget: &RiskBudget,
    history: &[RunHistoryEntry],
    run_id: u64,
    files: &[PathBuf],
    is_cancelled: &dyn Fn() -> bool,
) -> OdavlResult<RunReport> {
    // OBSERVE
    let observe_report = execute(&ctx.workspace_root, files, &ctx.registry, &ctx.cache, &ctx.executor_config);
    let metrics_before = metrics_from_issues(&observe_report.issues);
    info!(run_id, issues = observe_report.issues.len(), "observe complete");

    if let Some(baseline) = &ctx.baseline {
        let comparison = compare(&observe_report.issues, baseline);
        info!(
            run_id,
            new = comparison.new.len(),
            resolved = comparison.resolved.len(),
            unchanged = comparison.unchanged.len(),
            "baseline comparison"
        );
    }

    if is_cancelled() {
        return learn(
            ctx,
            run_id,
            RunOutcome::Cancelled,
            "cancelled before DECIDE".to_string(),
            None,
            observe_report.issues,
            metrics_before,
            None,
            history,
            budget,
            None,
        );
    }

    // DECIDE
    let sorted_files: Vec<String> = {
        let mut v: Vec<String> = files.iter().map(|f| odavl_hash::normalize(&ctx.workspace_root, f)).collect();
        v.sort();
        v
    };
    let decision = decide(ctx, &observe_report.issues, &sorted_files, budget, metrics_before)?;

    let Some((plan, gate_plan, requires_workspace_type_check)) = decision else {
        return learn(
            ctx,
            run_id,
            RunOutcome::Noop,
            "no recipe produced a plan admissible under the current risk budget".to_string(),
            None,
            observe_report.issues,
            metrics_before,
            None,
            history,
            budget,
            None,
        );
    };

    if is_cancelled() {
        return learn(
            ctx,
            run_id,
            RunOutcome::Cancelled,
            "cancelled before ACT".to_string(),
            None,
            observe_report.issues,
            metrics_before,
            None,
            history,
            budget,
            None,
        );
    }

    act_verify_and_learn(
        ctx,
        run_id,
        plan,
        gate_plan,
        requires_workspace_type_check,
        files,
        observe_report.issues,
        metrics_before,
        history,
        budget,
        is_cancelled,
    )
}

/// ACT (apply an already-admitted `plan`) followed by VERIFY under
/// `budget`, restoring on violation and committing otherwise. Shared by
/// [`run`]'s DECIDE-driven path and [`apply`]'s caller-supplied-plan
/// path (§6 `apply --plan`) — both reach ACT with a plan the pre-action
/// gate has already admitted.
#[allow(clippy::too_many_arguments)]
fn act_verify_and_learn(
    ctx: &OrchestratorContext,
    run_id: u64,
    plan: ModificationPlan,
    mut gate_plan: GatePlan,
    requires_workspace_type_check: bool,
    files: &[PathBuf],
    issues_before: Vec<Issue>,
    metrics_before: RunMetrics,
    history: &[RunHistoryEntry],
    budget: &RiskBudget,
    is_cancelled: &dyn Fn() -> bool,
) -> OdavlResult<RunReport> {
    let workspace_root = ctx.workspace_root.clone();
    let read_current = move |p: &str| fs::read(workspace_root.join(p));
    let snapshot = ctx.snapshot_store.capture(&plan, read_current)?;
    for change in &plan.changes {
        let dest = ctx.workspace_root.join(&change.path);
        write_atomic(&dest, &change.new_bytes)?;
    }
    info!(run_id, recipe = %plan.recipe_id, snapshot = %snapshot.id, files = plan.changes.len(), "act applied");

    if is_cancelled() {
        let restore = ctx
            .snapshot_store
            .restore(snapshot.id, &ctx.workspace_root, "cancelled during ACT")?;
        let recovery = ctx.attestation_store.append(run_id, RunType::Recovery, &restore)?;
        return learn(
            ctx,
            run_id,
            RunOutcome::Cancelled,
            "cancelled during ACT; restored pre-action state".to_string(),
            Some((plan.recipe_id.clone(), RecipeOutcome::Rollback)),
            issues_before,
            metrics_before,
            None,
            history,
            budget,
            Some(recovery),
        );
    }

    // VERIFY
    let verify_files: Vec<PathBuf> = if requires_workspace_type_check {
        files.to_vec()
    } else {
        plan.changes.iter().map(|c| ctx.workspace_root.join(&c.path)).collect()
    };
    let verify_report = execute(&ctx.workspace_root, &verify_files, &ctx.registry, &ctx.cache, &ctx.executor_config);
    let metrics_after = metrics_from_issues(&verify_report.issues);
    gate_plan.post_action_metrics = Some(metrics_after);

    let post_decision = odavl_gate::evaluate_post(&gate_plan, budget);
    if !post_decision.is_admit() {
        let reason = match post_decision {
            GateDecision::Reject { reason } => reason,
            GateDecision::Admit => unreachable!(),
        };
        let restore = ctx.snapshot_store.restore(snapshot.id, &ctx.workspace_root, &reason)?;
        let recovery = ctx.attestation_store.append(run_id, RunType::Recovery, &restore)?;
        return learn(
            ctx,
            run_id,
            RunOutcome::RolledBack,
            reason,
            Some((plan.recipe_id.clone(), RecipeOutcome::Failure)),
            verify_report.issues,
            metrics_before,
            Some(metrics_after),
            history,
            budget,
            Some(recovery),
        );
    }

    // commit: snapshot retained for undo, pruned to configured retention
    ctx.snapshot_store.prune()?;
    learn(
        ctx,
        run_id,
        RunOutcome::Success,
        format!("recipe '{}' applied and verified", plan.recipe_id),
        Some((plan.recipe_id.clone(), RecipeOutcome::Success)),
        verify_report.issues,
        metrics_before,
        Some(metrics_after),
        history,
        budget,
        None,
    )
}

/// Executes a single caller-supplied plan under gate enforcement (§6
/// `apply --plan <file>`), independent of a full OBSERVE/DECIDE cycle.
/// The plan's own target files are re-analyzed first to establish
/// pre-action metrics for the gate, then ACT/VERIFY/LEARN proceed
/// exactly as inside [`run`].
pub fn apply(
    ctx: &OrchestratorContext,
    budget: &RiskBudget,
    history: &[RunHistoryEntry],
    run_id: u64,
    plan: ModificationPlan,
    requires_workspace_type_check: bool,
    is_cancelled: &dyn Fn() -> bool,
) -> OdavlResult<RunReport> {
    let target_files: Vec<PathBuf> = plan.files().map(|f| ctx.workspace_root.join(f)).collect();
    let pre_report = execute(&ctx.workspace_root, &target_files, &ctx.registry, &ctx.cache, &ctx.executor_config);
    let metrics_before = metrics_from_issues(&pre_report.issues);

    let gate_plan = GatePlan {
        files_to_modify: plan.files().map(|s| s.to_string()).collect(),
        estimated_loc_change: plan.total_lines_changed() as u32,
        recipe_ids: vec![plan.recipe_id.clone()],
        recipe_risk_scores: vec![plan.risk_score],
        pre_action_metrics: metrics_before,
        post_action_metrics: None,
    };

    if !odavl_gate::evaluate_pre(&gate_plan, budget).is_admit() {
        return learn(
            ctx,
            run_id,
            RunOutcome::Noop,
            "plan rejected by pre-action gate".to_string(),
            None,
            pre_report.issues,
            metrics_before,
            None,
            history,
            budget,
            None,
        );
    }

    if is_cancelled() {
        return learn(
            ctx,
            run_id,
            RunOutcome::Cancelled,
            "cancelled before ACT".to_string(),
            None,
            pre_report.issues,
            metrics_before,
            None,
            history,
            budget,
            None,
        );
    }

    act_verify_and_learn(
        ctx,
        run_id,
        plan,
        gate_plan,
        requires_workspace_type_check,
        &target_files,
        pre_report.issues,
        metrics_before,
        history,
        budget,
        is_cancelled,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use odavl_types::{
        DetectError, Detector, DetectorScope, FileContext, Language, PlannedFileChange, RecipeError,
    };
    use tempfile::tempdir;

    struct UnusedImportDetector;

    impl Detector for UnusedImportDetector {
        fn name(&self) -> &str {
            "unused-import"
        }
        fn scope(&self) -> DetectorScope {
            DetectorScope::File
        }
        fn supports(&self, language: &Language) -> bool {
            language.0 == "ts"
        }
        fn analyze_file(&self, ctx: &FileContext<'_>) -> Result<Vec<Issue>, DetectError> {
            let text = String::from_utf8_lossy(ctx.content);
            if text.contains("import { unused }") {
                Ok(vec![Issue {
                    file: ctx.path.to_string(),
                    line: 1,
                    column: None,
                    end_line: None,
                    severity: Severity::Low,
                    message: "'unused' is declared but never used".into(),
                    detector: self.name().to_string(),
                    rule_id: Some("no-unused-vars".into()),
                    code_snippet: Some(text.lines().next().unwrap_or("").to_string()),
                    category: None,
                }])
            } else {
                Ok(Vec::new())
            }
        }
    }

    struct BrokenTypeCheckDetector;

    impl Detector for BrokenTypeCheckDetector {
        fn name(&self) -> &str {
            "type-checker"
        }
        fn scope(&self) -> DetectorScope {
            DetectorScope::File
        }
        fn supports(&self, language: &Language) -> bool {
            language.0 == "ts"
        }
        fn analyze_file(&self, ctx: &FileContext<'_>) -> Result<Vec<Issue>, DetectError> {
            let text = String::from_utf8_lossy(ctx.content);
            let declares = text.contains("export const needsExport");
            let uses = text.contains("console.log(needsExport)");
            if uses && !declares {
                Ok(vec![Issue {
                    file: ctx.path.to_string(),
                    line: 2,
                    column: None,
                    end_line: None,
                    severity: Severity::High,
                    message: "'needsExport' is not exported".into(),
                    detector: self.name().to_string(),
                    rule_id: Some("ts2305".into()),
                    code_snippet: None,
                    category: Some("type-error".into()),
                }])
            } else {
                Ok(Vec::new())
            }
        }
    }

    /// Removes the `import { unused }` line, respecting protected paths
    /// (§8 scenario 2).
    struct UnusedImportRecipe {
        also_break_export: bool,
    }

    impl Recipe for UnusedImportRecipe {
        fn id(&self) -> &str {
            "unused-import"
        }
        fn risk_score(&self) -> f64 {
            0.1
        }
        fn declared_protected_respect(&self) -> bool {
            true
        }
        fn max_files_touched(&self) -> u32 {
            5
        }
        fn max_lines_changed(&self) -> u32 {
            20
        }
        fn requires_workspace_type_check(&self) -> bool {
            self.also_break_export
        }
        fn plan(&self, ctx: &RecipeContext<'_>) -> Result<ModificationPlan, RecipeError> {
            let target = ctx
                .issues
                .iter()
                .find(|i| i.rule_id.as_deref() == Some("no-unused-vars"))
                .ok_or_else(|| RecipeError::NoPlan("no unused-import issue".into()))?;

            let original = (ctx.read_file)(&target.file).map_err(|e| RecipeError::Failed(e.to_string()))?;
            let text = String::from_utf8_lossy(&original);
            let mut lines: Vec<&str> = text.lines().collect();
            lines.retain(|l| !l.contains("import { unused }"));
            if self.also_break_export {
                lines.retain(|l| !l.contains("export const needsExport"));
            }
            let mut new_text = lines.join("\n");
            new_text.push('\n');

            Ok(ModificationPlan {
                recipe_id: self.id().to_string(),
                changes: vec![PlannedFileChange {
                    path: target.file.clone(),
                    new_bytes: new_text.into_bytes(),
                    lines_changed: 1,
                }],
                risk_score: self.risk_score(),
            })
        }
    }

    fn base_ctx(workspace: &std::path::Path, also_break_export: bool) -> OrchestratorContext {
        let mut registry = DetectorRegistry::new();
        registry.register(Arc::new(UnusedImportDetector));
        registry.register(Arc::new(BrokenTypeCheckDetector));

        OrchestratorContext {
            workspace_root: workspace.to_path_buf(),
            registry,
            recipes: vec![Arc::new(UnusedImportRecipe { also_break_export })],
            cache: IncrementalCache::open(workspace.join(".odavl/cache")),
            snapshot_store: SnapshotStore::open(workspace.join(".odavl/undo"), 10),
            trust_store: TrustStore::open(workspace.join(".odavl/trust")),
            attestation_store: AttestationStore::open(workspace.join(".odavl")),
            policy_store: PolicyStore::open(workspace.join(".odavl")),
            run_history_store: RunHistoryStore::open(workspace.join(".odavl")),
            executor_config: ExecutorConfig {
                deterministic: true,
                ..Default::default()
            },
            baseline: None,
        }
    }

    /// Scenario 1 from §8: one clean file, no issues, one `core`
    /// attestation, trust unchanged.
    #[test]
    fn scenario_1_cold_run_no_issues() {
        let workspace = tempdir().unwrap();
        let file = workspace.path().join("src/a.ts");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "export const x = 1;\n").unwrap();

        let ctx = base_ctx(workspace.path(), false);
        let report = run(&ctx, &RiskBudget::default(), &[], 1, &[file], &|| false).unwrap();

        assert_eq!(report.outcome, RunOutcome::Noop);
        assert!(report.issues.is_empty());
        assert!(report.attestation.is_some());
    }

    /// Scenario 2 from §8: the unused-import recipe fixes the only
    /// issue; VERIFY reports 0 warnings; outcome success; trust +0.05.
    #[test]
    fn scenario_2_single_fixable_warning_succeeds() {
        let workspace = tempdir().unwrap();
        let file = workspace.path().join("src/a.ts");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "import { unused } from 'x';\nexport const y = 1;\n").unwrap();

        let ctx = base_ctx(workspace.path(), false);
        let report = run(&ctx, &RiskBudget::default(), &[], 1, &[file.clone()], &|| false).unwrap();

        assert_eq!(report.outcome, RunOutcome::Success);
        assert!(report.issues.is_empty());
        let trust = ctx.trust_store.load("unused-import").unwrap();
        assert!((trust.confidence - 0.05).abs() < 1e-9);

        let contents = fs::read_to_string(&file).unwrap();
        assert!(!contents.contains("unused"));
    }

    /// `apply --plan` (§6): a caller-supplied plan that never went through
    /// DECIDE is still admitted, applied, verified, and committed exactly
    /// like the DECIDE-driven path.
    #[test]
    fn apply_commits_a_caller_supplied_plan_under_gate_enforcement() {
        let workspace = tempdir().unwrap();
        let file = workspace.path().join("src/a.ts");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "import { unused } from 'x';\nexport const y = 1;\n").unwrap();

        let ctx = base_ctx(workspace.path(), false);
        let plan = ModificationPlan {
            recipe_id: "unused-import".into(),
            changes: vec![PlannedFileChange {
                path: "src/a.ts".into(),
                new_bytes: b"export const y = 1;\n".to_vec(),
                lines_changed: 1,
            }],
            risk_score: 0.1,
        };

        let report = apply(&ctx, &RiskBudget::default(), &[], 1, plan, false, &|| false).unwrap();

        assert_eq!(report.outcome, RunOutcome::Success);
        let trust = ctx.trust_store.load("unused-import").unwrap();
        assert!((trust.confidence - 0.05).abs() < 1e-9);
        let contents = fs::read_to_string(&file).unwrap();
        assert!(!contents.contains("unused"));
    }

    /// Scenario 3 from §8: the recipe also deletes a needed export;
    /// VERIFY sees +1 type error (maxTypeErrorsAfter = 0); ROLLBACK
    /// restores the file byte-identically; outcome rolledBack; trust
    /// -0.10.
    #[test]
    fn scenario_3_gate_violation_rolls_back() {
        let workspace = tempdir().unwrap();
        let file = workspace.path().join("src/a.ts");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        let original =
            "import { unused } from 'x';\nexport const needsExport = 1;\nconsole.log(needsExport);\n";
        fs::write(&file, original).unwrap();

        let ctx = base_ctx(workspace.path(), true);
        let budget = RiskBudget {
            max_type_errors_after: 0,
            ..Default::default()
        };
        let report = run(&ctx, &budget, &[], 1, &[file.clone()], &|| false).unwrap();

        assert_eq!(report.outcome, RunOutcome::RolledBack);
        assert!(report.recovery_attestation.is_some());
        let trust = ctx.trust_store.load("unused-import").unwrap();
        assert_eq!(trust.confidence, 0.0);

        let contents = fs::read_to_string(&file).unwrap();
        assert_eq!(contents, original);
    }

    #[test]
    fn cancellation_before_decide_yields_cancelled_outcome_with_no_snapshot() {
        let workspace = tempdir().unwrap();
        let file = workspace.path().join("src/a.ts");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "import { unused } from 'x';\n").unwrap();

        let ctx = base_ctx(workspace.path(), false);
        let report = run(&ctx, &RiskBudget::default(), &[], 1, &[file], &|| true).unwrap();

        assert_eq!(report.outcome, RunOutcome::Cancelled);
        assert!(ctx.snapshot_store.list().unwrap().is_empty());
    }
}
