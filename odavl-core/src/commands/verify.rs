use crate::commands::{build_context, discover_files};
use anyhow::{Context, Result};
use odavl_baseline::{compare, should_fail, BaselineStore};
use odavl_detect::execute as run_detectors;
use odavl_types::Severity;
use std::path::Path;

/// `odavl verify --baseline <name>`: OBSERVEs the workspace, diffs the
/// result against a named baseline (§4.5), prints the new/resolved/
/// unchanged counts, and returns a non-zero-worthy error when the
/// fail-level contract is tripped (§4.5 exit-code contract).
pub fn execute(workspace_root: &Path, baseline_name: &str, fail_level: Severity, fail_on_new: bool) -> Result<()> {
    let ctx = build_context(workspace_root, 10);
    let store = BaselineStore::open(workspace_root.join(".odavl/baselines"));
    let baseline = store.load(baseline_name).context("loading baseline")?;

    let files = discover_files(workspace_root);
    let report = run_detectors(workspace_root, &files, &ctx.registry, &ctx.cache, &ctx.executor_config);

    let comparison = compare(&report.issues, &baseline);
    println!(
        "new={} resolved={} unchanged={} delta={:.1}%",
        comparison.new.len(),
        comparison.resolved.len(),
        comparison.unchanged.len(),
        comparison.delta_percent
    );
    for issue in &comparison.new {
        println!("  + {}:{} [{}] {}", issue.file, issue.line, issue.severity, issue.message);
    }

    if should_fail(&comparison, fail_level, fail_on_new) {
        anyhow::bail!(
            "verify failed: new issues at or above {fail_level} (or fail-on-new) were introduced"
        );
    }
    Ok(())
}
