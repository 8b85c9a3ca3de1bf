use crate::commands::{build_context, discover_files};
use crate::manifest::Gates;
use anyhow::{Context, Result};
use odavl_orchestrator::run as run_cycle;
use odavl_types::RunOutcome;
use std::path::Path;
use tracing::info;

/// `odavl run`: one full ODAVL cycle over every file under `workspace_root`
/// (§4.9). Reads the risk budget from `gates.yml`, replays run history so
/// C11's rolling-mean rules see the real trend, and prints the outcome.
/// Returns the cycle's outcome so the caller can map it to the §6 exit-code
/// contract (rollback must exit non-zero even though this call itself
/// succeeded).
pub fn execute(
    workspace_root: &Path,
    gates_path: &Path,
    run_id: u64,
    snapshot_retention: usize,
) -> Result<RunOutcome> {
    let gates = Gates::load(gates_path).context("loading gates.yml")?;
    let ctx = build_context(workspace_root, snapshot_retention);
    let history = ctx.run_history_store.load().context("loading run history")?;
    let files = discover_files(workspace_root);

    info!(run_id, files = files.len(), "starting run");
    let report = run_cycle(&ctx, &gates.risk_budget, &history, run_id, &files, &|| false)?;

    println!("outcome: {:?}", report.outcome);
    println!("reason: {}", report.reason);
    println!("issues observed: {}", report.issues.len());
    if let Some(attestation) = &report.attestation {
        println!("attestation: {}", attestation.payload_hash);
    }
    if let Some(adjusted) = &report.adjusted_budget {
        println!(
            "budget adjusted: maxFilesPerRun={} maxLinesOfCodeChange={}",
            adjusted.max_files_per_run, adjusted.max_lines_of_code_change
        );
    }
    Ok(report.outcome)
}
