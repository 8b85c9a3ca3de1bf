use crate::commands::{build_context, discover_files};
use anyhow::{Context, Result};
use odavl_baseline::BaselineStore;
use odavl_detect::execute as run_detectors;
use std::path::Path;

fn store_for(workspace_root: &Path) -> BaselineStore {
    BaselineStore::open(workspace_root.join(".odavl/baselines"))
}

/// `odavl baseline create <name>`: OBSERVEs the current workspace and
/// freezes it as a named baseline (§4.5 `create`).
pub fn create(workspace_root: &Path, name: &str, created_by: &str, force: bool) -> Result<()> {
    let ctx = build_context(workspace_root, 10);
    let files = discover_files(workspace_root);
    let report = run_detectors(workspace_root, &files, &ctx.registry, &ctx.cache, &ctx.executor_config);
    let detector_set = ctx.registry.names();

    let baseline = store_for(workspace_root)
        .create(name, report.issues, created_by, detector_set, force)
        .context("creating baseline")?;
    println!("baseline '{name}' created with {} issue(s)", baseline.total_issues);
    Ok(())
}

/// `odavl baseline list`.
pub fn list(workspace_root: &Path) -> Result<()> {
    for name in store_for(workspace_root).list().context("listing baselines")? {
        println!("{name}");
    }
    Ok(())
}

/// `odavl baseline delete <name>`.
pub fn delete(workspace_root: &Path, name: &str) -> Result<()> {
    store_for(workspace_root).delete(name).context("deleting baseline")?;
    println!("baseline '{name}' deleted");
    Ok(())
}
