pub mod apply;
pub mod baseline;
pub mod run;
pub mod undo;
pub mod verify;

use odavl_attest::AttestationStore;
use odavl_cache::IncrementalCache;
use odavl_detect::{DetectorRegistry, ExecutorConfig};
use odavl_governance::PolicyStore;
use odavl_orchestrator::{OrchestratorContext, RunHistoryStore};
use odavl_snapshot::SnapshotStore;
use odavl_trust::TrustStore;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Builds the context shared by every command. The detector registry and
/// recipe list start empty: this binary wires the control loop, not a
/// catalog of language-specific detectors or fix recipes, which are a
/// consumer's concern (§2 non-goals name the plugin marketplace API as
/// explicitly out of scope; concrete detectors/recipes are the same kind
/// of pluggable extension, left to whoever embeds this crate).
pub fn build_context(workspace_root: &Path, snapshot_retention: usize) -> OrchestratorContext {
    let odavl_dir = workspace_root.join(".odavl");
    OrchestratorContext {
        workspace_root: workspace_root.to_path_buf(),
        registry: DetectorRegistry::new(),
        recipes: Vec::new(),
        cache: IncrementalCache::open(odavl_dir.join("cache")),
        snapshot_store: SnapshotStore::open(odavl_dir.join("undo"), snapshot_retention),
        trust_store: TrustStore::open(odavl_dir.join("trust")),
        attestation_store: AttestationStore::open(odavl_dir.clone()),
        policy_store: PolicyStore::open(odavl_dir.clone()),
        run_history_store: RunHistoryStore::open(odavl_dir),
        executor_config: ExecutorConfig::default(),
        baseline: None,
    }
}

/// Walks `workspace_root`, skipping `.odavl` and VCS directories, and
/// returns every regular file found (§4.2 OBSERVE's file discovery step).
pub fn discover_files(workspace_root: &Path) -> Vec<PathBuf> {
    WalkDir::new(workspace_root)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            name != ".odavl" && name != ".git" && name != "node_modules" && name != "target"
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .collect()
}
