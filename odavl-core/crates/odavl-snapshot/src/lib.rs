//! # Snapshot/Undo Store (C6)
//!
//! Captures pre-action filesystem state and restores it atomically
//! (§4.6). A snapshot is staged under a hidden directory and only
//! `rename`d into its final `undo/snapshot-<uuid>/` name once every file
//! copy and `metadata.json` have been written — so a process aborted
//! mid-capture never leaves a partial snapshot visible at its real name
//! (§4.6 "scoped acquisition").

use chrono::Utc;
use odavl_types::atomic::write_atomic;
use odavl_types::{
    ModificationPlan, OdavlError, OdavlResult, PlanType, RestoreReport, Snapshot, SnapshotFile,
    SnapshotMetadata,
};
use similar::TextDiff;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

pub struct SnapshotStore {
    root: PathBuf,
    retention: usize,
}

impl SnapshotStore {
    /// `root` is `<workspace>/.odavl/undo` (§6). `retention` is how many
    /// committed snapshots to keep; the oldest are pruned after a
    /// success is committed (§4.6 "retained per configured retention").
    pub fn open(root: impl Into<PathBuf>, retention: usize) -> Self {
        SnapshotStore {
            root: root.into(),
            retention,
        }
    }

    fn staging_dir(&self, id: Uuid) -> PathBuf {
        self.root.join(format!(".staging-{id}"))
    }

    fn final_dir(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("snapshot-{id}"))
    }

    /// Captures the pre-action bytes of every file `plan` intends to
    /// touch, plus a unified diff of the intended change, and commits the
    /// snapshot atomically (§4.6 steps 1-4).
    pub fn capture(
        &self,
        plan: &ModificationPlan,
        read_current: impl Fn(&str) -> std::io::Result<Vec<u8>>,
    ) -> OdavlResult<Snapshot> {
        let id = Uuid::new_v4();
        let staging = self.staging_dir(id);
        fs::create_dir_all(&staging)?;

        let mut files = Vec::new();
        let mut diff_text = String::new();
        for change in &plan.changes {
            let pre_bytes = read_current(&change.path).unwrap_or_default();
            let dest = staging.join(&change.path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&dest, &pre_bytes)?;

            let before = String::from_utf8_lossy(&pre_bytes);
            let after = String::from_utf8_lossy(&change.new_bytes);
            let patch = TextDiff::from_lines(before.as_ref(), after.as_ref())
                .unified_diff()
                .header(&change.path, &change.path)
                .to_string();
            diff_text.push_str(&patch);

            files.push(SnapshotFile {
                path: change.path.clone(),
                pre_bytes,
            });
        }

        let metadata = SnapshotMetadata {
            files_modified: plan.changes.len(),
            lines_changed: plan.total_lines_changed(),
        };
        let snapshot = Snapshot {
            id,
            created_at: Utc::now(),
            plan_type: PlanType::RecipeApply,
            files,
            unified_diff: diff_text,
            metadata,
        };

        let metadata_bytes = odavl_types::to_canonical_json_bytes(&snapshot)?;
        fs::write(staging.join("metadata.json"), &metadata_bytes)?;

        // Single atomic commit: the snapshot is invisible under its real
        // name until this rename succeeds.
        fs::rename(&staging, self.final_dir(id))?;
        info!(snapshot_id = %id, files = snapshot.files.len(), "snapshot captured");
        Ok(snapshot)
    }

    /// Loads a committed snapshot's metadata without restoring it.
    pub fn load(&self, id: Uuid) -> OdavlResult<Snapshot> {
        let path = self.final_dir(id).join("metadata.json");
        let bytes = fs::read(&path).map_err(|_| OdavlError::NotFound(format!("snapshot {id}")))?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)
            .map_err(|e| OdavlError::SnapshotCorrupt(format!("{id}: {e}")))?;
        Ok(snapshot)
    }

    /// Restores every captured file back to its pre-action bytes,
    /// writing each one atomically (§4.6 `restore`). Per-file atomicity:
    /// either the restored bytes are fully present or the prior state on
    /// disk is untouched (write-temp + rename never leaves a half file).
    pub fn restore(
        &self,
        id: Uuid,
        workspace_root: &std::path::Path,
        trigger_reason: &str,
    ) -> OdavlResult<RestoreReport> {
        let started = Instant::now();
        let snapshot = self.load(id)?;

        for file in &snapshot.files {
            let dest = workspace_root.join(&file.path);
            write_atomic(&dest, &file.pre_bytes)?;
        }

        Ok(RestoreReport {
            snapshot_id: id,
            files_restored: snapshot.files.len(),
            recovery_latency_ms: started.elapsed().as_millis() as u64,
            trigger_reason: trigger_reason.to_string(),
        })
    }

    /// Lists committed snapshot ids, oldest first (by directory name,
    /// which embeds creation order only loosely — callers needing a
    /// precise order should consult each snapshot's `created_at`).
    pub fn list(&self) -> OdavlResult<Vec<Uuid>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(rest) = name.strip_prefix("snapshot-") {
                if let Ok(id) = Uuid::parse_str(rest) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    /// Prunes oldest committed snapshots beyond `retention`, called after
    /// a success is committed (§4.6).
    pub fn prune(&self) -> OdavlResult<()> {
        let mut entries: Vec<(Uuid, Snapshot)> = self
            .list()?
            .into_iter()
            .filter_map(|id| self.load(id).ok().map(|s| (id, s)))
            .collect();
        entries.sort_by_key(|(_, s)| s.created_at);
        if entries.len() <= self.retention {
            return Ok(());
        }
        let to_remove = entries.len() - self.retention;
        for (id, _) in entries.into_iter().take(to_remove) {
            let dir = self.final_dir(id);
            if dir.exists() {
                fs::remove_dir_all(dir)?;
            }
        }
        Ok(())
    }
}
