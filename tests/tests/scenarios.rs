//! End-to-end coverage of the scenarios and properties in the
//! specification's testable-properties section, driven entirely through
//! each crate's public API against real temporary workspaces — no mocks.

use chrono::Utc;
use odavl_attest::AttestationStore;
use odavl_baseline::compare;
use odavl_cache::IncrementalCache;
use odavl_detect::{execute, DetectorRegistry, ExecutorConfig};
use odavl_gate::{evaluate_pre, evaluate_post};
use odavl_governance::PolicyStore;
use odavl_orchestrator::{apply as apply_plan, OrchestratorContext, RunHistoryStore};
use odavl_snapshot::SnapshotStore;
use odavl_trust::{apply_outcome, replay, RecipeTrust, TrustStore};
use odavl_types::{
    Baseline, BaselineIssue, DetectError, Detector, DetectorScope, FileContext, GatePlan, Issue,
    Language, ModificationPlan, PlannedFileChange, RecipeOutcome, RiskBudget, RunMetrics,
    RunOutcome, RunType, Severity,
};
use std::fs;
use std::path::PathBuf;
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

fn workspace_with_files(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    for (path, content) in files {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, content).unwrap();
    }
    dir
}

/// Scenario 6 / P1 / P2: two OBSERVE passes over a shuffled file list
/// produce a bit-identical sorted issue list.
#[test]
fn determinism_holds_under_file_list_reordering() {
    let workspace = workspace_with_files(&[
        ("src/a.ts", "import { unused } from 'x';\n"),
        ("src/b.ts", "import { unused } from 'x';\n"),
        ("src/c.ts", "export const ok = 1;\n"),
    ]);

    let mut registry = DetectorRegistry::new();
    registry.register(std::sync::Arc::new(UnusedImportDetector));
    let cache = IncrementalCache::open(workspace.path().join(".odavl/cache"));
    let config = ExecutorConfig {
        deterministic: true,
        ..Default::default()
    };

    let forward: Vec<PathBuf> = ["src/a.ts", "src/b.ts", "src/c.ts"]
        .iter()
        .map(|f| workspace.path().join(f))
        .collect();
    let shuffled: Vec<PathBuf> = ["src/c.ts", "src/a.ts", "src/b.ts"]
        .iter()
        .map(|f| workspace.path().join(f))
        .collect();

    let report_a = execute(workspace.path(), &forward, &registry, &cache, &config);
    let report_b = execute(workspace.path(), &shuffled, &registry, &cache, &config);

    assert_eq!(report_a.issues, report_b.issues);
    assert_eq!(report_a.issues.len(), 2);
}

/// P3: a warm cache never changes the issue set OBSERVE reports.
#[test]
fn cache_transparency_cold_vs_warm() {
    let workspace = workspace_with_files(&[("src/a.ts", "import { unused } from 'x';\n")]);
    let mut registry = DetectorRegistry::new();
    registry.register(std::sync::Arc::new(UnusedImportDetector));
    let cache = IncrementalCache::open(workspace.path().join(".odavl/cache"));
    let config = ExecutorConfig {
        deterministic: true,
        ..Default::default()
    };
    let files = vec![workspace.path().join("src/a.ts")];

    let cold = execute(workspace.path(), &files, &registry, &cache, &config);
    let warm = execute(workspace.path(), &files, &registry, &cache, &config);
    assert_eq!(cold.issues, warm.issues);
}

/// P5: capturing a snapshot then restoring it returns the workspace to
/// its exact pre-action bytes.
#[test]
fn snapshot_round_trip_restores_original_bytes() {
    let workspace = workspace_with_files(&[("src/a.ts", "original contents\n")]);
    let store = SnapshotStore::open(workspace.path().join(".odavl/undo"), 10);

    let plan = ModificationPlan {
        recipe_id: "demo".into(),
        changes: vec![PlannedFileChange {
            path: "src/a.ts".into(),
            new_bytes: b"modified contents\n".to_vec(),
            lines_changed: 1,
        }],
        risk_score: 0.1,
    };

    let workspace_root = workspace.path().to_path_buf();
    let read_current = move |p: &str| fs::read(workspace_root.join(p));
    let snapshot = store.capture(&plan, read_current).unwrap();

    fs::write(workspace.path().join("src/a.ts"), b"modified contents\n").unwrap();
    store.restore(snapshot.id, workspace.path(), "test rollback").unwrap();

    let restored = fs::read_to_string(workspace.path().join("src/a.ts")).unwrap();
    assert_eq!(restored, "original contents\n");
}

/// P12: no plan touching a forbidden path is ever admitted, regardless
/// of how generous the rest of the budget is.
#[test]
fn forbidden_path_veto_holds_for_any_budget() {
    let budget = RiskBudget {
        max_files_per_run: 1000,
        max_lines_of_code_change: 1_000_000,
        risk_score_budget: 1000.0,
        max_risk_per_action: 1000.0,
        forbidden_path_patterns: vec!["**/secrets/**".into()],
        ..Default::default()
    };
    let plan = GatePlan {
        files_to_modify: vec!["config/secrets/keys.ts".into()],
        estimated_loc_change: 1,
        recipe_ids: vec!["demo".into()],
        recipe_risk_scores: vec![0.01],
        pre_action_metrics: RunMetrics::default(),
        post_action_metrics: None,
    };
    assert!(!evaluate_pre(&plan, &budget).is_admit());
}

/// P6: a VERIFY-phase gate violation is atomic — post-action metrics
/// showing new type errors are rejected outright.
#[test]
fn gate_rejects_any_new_type_errors_when_budget_is_zero() {
    let budget = RiskBudget {
        max_type_errors_after: 0,
        ..Default::default()
    };
    let plan = GatePlan {
        files_to_modify: vec!["src/a.ts".into()],
        estimated_loc_change: 1,
        recipe_ids: vec!["demo".into()],
        recipe_risk_scores: vec![0.1],
        pre_action_metrics: RunMetrics::default(),
        post_action_metrics: Some(RunMetrics {
            type_errors: 2,
            ..Default::default()
        }),
    };
    assert!(!evaluate_post(&plan, &budget).is_admit());
}

/// Scenario 5: a current report with a fuzzily-shifted match, an
/// unshifted match, and a brand-new issue against a three-entry
/// baseline classifies as documented.
#[test]
fn baseline_diff_matches_scenario_five() {
    fn issue(line: u32, rule: &str) -> Issue {
        Issue {
            file: "src/x.ts".into(),
            line,
            column: None,
            end_line: None,
            severity: Severity::Medium,
            message: format!("{rule} triggered"),
            detector: "eslint".into(),
            rule_id: Some(rule.into()),
            code_snippet: Some("same snippet".into()),
            category: None,
        }
    }

    let a = issue(10, "rule-a");
    let b = issue(20, "rule-b");
    let c = issue(30, "rule-c");
    let baseline = Baseline::new(
        "ci",
        vec!["eslint".into()],
        vec![a.clone(), b.clone(), c.clone()]
            .into_iter()
            .map(|issue| BaselineIssue {
                fingerprint: odavl_types::fingerprint_issue(&issue),
                issue,
                first_seen: Utc::now(),
            })
            .collect(),
    );

    let b_prime = issue(22, "rule-b");
    let c_again = issue(30, "rule-c");
    let d = issue(40, "rule-d");
    let current = vec![b_prime, c_again, d];

    let result = compare(&current, &baseline);
    assert_eq!(result.new.len(), 1);
    assert_eq!(result.new[0].rule_id.as_deref(), Some("rule-d"));
    assert_eq!(result.unchanged.len(), 2);
    assert_eq!(result.resolved.len(), 1);
    assert_eq!(result.resolved[0].issue.rule_id.as_deref(), Some("rule-a"));
}

/// P9: replaying the outcome stream for a recipe from zero reproduces
/// its currently-persisted confidence exactly.
#[test]
fn trust_replay_matches_incremental_updates() {
    let outcomes = vec![
        RecipeOutcome::Success,
        RecipeOutcome::Success,
        RecipeOutcome::Failure,
        RecipeOutcome::Rollback,
        RecipeOutcome::Success,
    ];

    let mut incremental = RecipeTrust::new("demo-recipe");
    for outcome in &outcomes {
        apply_outcome(&mut incremental, *outcome);
    }

    let replayed = replay("demo-recipe", &outcomes);
    assert!((incremental.confidence - replayed.confidence).abs() < 1e-9);
    assert_eq!(incremental.runs, replayed.runs);
}

/// P7 / P8: appending several attestations of the same run type forms a
/// chain whose links verify, and tampering with one payload breaks the
/// chain from that point on.
#[test]
fn attestation_chain_detects_tampering() {
    let workspace = tempdir().unwrap();
    let store = AttestationStore::open(workspace.path().to_path_buf());

    store.append(1, RunType::Core, &serde_json::json!({"n": 1})).unwrap();
    store.append(2, RunType::Core, &serde_json::json!({"n": 2})).unwrap();
    store.append(3, RunType::Core, &serde_json::json!({"n": 3})).unwrap();

    let verification = store.verify_all(RunType::Core).unwrap();
    assert!(verification.is_fully_intact());
    assert_eq!(verification.integrity_ratio(), 1.0);

    // Corrupt the middle record's payload hash directly on disk: still
    // well-formed JSON, so only the HMAC/link check should catch it.
    let path = workspace.path().join("attestations/core.json");
    let mut chain: Vec<serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    chain[1]["payload_hash"] = serde_json::Value::String("f".repeat(64));
    fs::write(&path, serde_json::to_vec(&chain).unwrap()).unwrap();

    let after_tamper = store.verify_all(RunType::Core).unwrap();
    assert!(!after_tamper.is_fully_intact());
}

/// `apply --plan` (§6): a plan built outside any `run` cycle is still
/// admitted, applied, verified, and committed under full gate enforcement.
#[test]
fn apply_executes_a_standalone_plan_under_gate_enforcement() {
    let workspace = workspace_with_files(&[("src/a.ts", "import { unused } from 'x';\nexport const y = 1;\n")]);
    let odavl_dir = workspace.path().join(".odavl");

    let mut registry = DetectorRegistry::new();
    registry.register(std::sync::Arc::new(UnusedImportDetector));
    let ctx = OrchestratorContext {
        workspace_root: workspace.path().to_path_buf(),
        registry,
        recipes: Vec::new(),
        cache: IncrementalCache::open(odavl_dir.join("cache")),
        snapshot_store: SnapshotStore::open(odavl_dir.join("undo"), 10),
        trust_store: TrustStore::open(odavl_dir.join("trust")),
        attestation_store: AttestationStore::open(odavl_dir.clone()),
        policy_store: PolicyStore::open(odavl_dir.clone()),
        run_history_store: RunHistoryStore::open(odavl_dir),
        executor_config: ExecutorConfig {
            deterministic: true,
            ..Default::default()
        },
        baseline: None,
    };

    let plan = ModificationPlan {
        recipe_id: "unused-import".into(),
        changes: vec![PlannedFileChange {
            path: "src/a.ts".into(),
            new_bytes: b"export const y = 1;\n".to_vec(),
            lines_changed: 1,
        }],
        risk_score: 0.1,
    };

    let report = apply_plan(&ctx, &RiskBudget::default(), &[], 1, plan, false, &|| false).unwrap();

    assert_eq!(report.outcome, RunOutcome::Success);
    let contents = fs::read_to_string(workspace.path().join("src/a.ts")).unwrap();
    assert!(!contents.contains("unused"));
}
