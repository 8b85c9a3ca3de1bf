use crate::commands::build_context;
use anyhow::{Context, Result};
use std::path::Path;
use uuid::Uuid;

/// `odavl undo <snapshot-id>`: restores a previously captured snapshot
/// (§4.6 `restore`). Intended for an operator reverting a run whose
/// effects were later judged unwanted, outside the gate's own automatic
/// rollback path.
pub fn execute(workspace_root: &Path, snapshot_id: Uuid, snapshot_retention: usize) -> Result<()> {
    let ctx = build_context(workspace_root, snapshot_retention);
    let report = ctx
        .snapshot_store
        .restore(snapshot_id, workspace_root, "manual undo requested")
        .context("restoring snapshot")?;
    println!(
        "restored {} file(s) from snapshot {snapshot_id} in {}ms",
        report.files_restored, report.recovery_latency_ms
    );
    Ok(())
}

/// `odavl undo --list`: prints committed snapshot ids, most useful
/// alongside each snapshot's recorded diff for an operator deciding what
/// to revert.
pub fn list(workspace_root: &Path, snapshot_retention: usize) -> Result<()> {
    let ctx = build_context(workspace_root, snapshot_retention);
    let mut ids = ctx.snapshot_store.list().context("listing snapshots")?;
    ids.sort();
    for id in ids {
        let snapshot = ctx.snapshot_store.load(id)?;
        println!(
            "{id}  {}  files={} lines={}",
            snapshot.created_at, snapshot.metadata.files_modified, snapshot.metadata.lines_changed
        );
    }
    Ok(())
}
