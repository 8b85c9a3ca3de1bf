use crate::commands::build_context;
use crate::manifest::Gates;
use anyhow::{Context, Result};
use odavl_orchestrator::apply as apply_plan;
use odavl_types::{ModificationPlan, RunOutcome};
use std::fs;
use std::path::Path;
use tracing::info;

/// `odavl apply --plan <file>`: executes one caller-supplied plan under
/// gate enforcement (§6), bypassing OBSERVE/DECIDE entirely — the plan's
/// own declared files are re-analyzed to seed pre-action metrics before
/// ACT/VERIFY/LEARN run exactly as they would inside a full `run` cycle.
/// Returns the cycle's outcome so the caller can map it to the §6 exit-code
/// contract.
pub fn execute(
    workspace_root: &Path,
    plan_path: &Path,
    gates_path: &Path,
    run_id: u64,
    snapshot_retention: usize,
    full_verify: bool,
) -> Result<RunOutcome> {
    let gates = Gates::load(gates_path).context("loading gates.yml")?;
    let plan_bytes = fs::read(plan_path)
        .with_context(|| format!("reading plan file {}", plan_path.display()))?;
    let plan: ModificationPlan =
        serde_json::from_slice(&plan_bytes).context("parsing plan file as JSON")?;

    let ctx = build_context(workspace_root, snapshot_retention);
    let history = ctx.run_history_store.load().context("loading run history")?;

    info!(run_id, recipe = %plan.recipe_id, files = plan.changes.len(), "applying plan");
    let report = apply_plan(
        &ctx,
        &gates.risk_budget,
        &history,
        run_id,
        plan,
        full_verify,
        &|| false,
    )?;

    println!("outcome: {:?}", report.outcome);
    println!("reason: {}", report.reason);
    if let Some(attestation) = &report.attestation {
        println!("attestation: {}", attestation.payload_hash);
    }
    if report.recovery_attestation.is_some() {
        println!("rolled back: plan's changes were reverted");
    }

    Ok(report.outcome)
}
