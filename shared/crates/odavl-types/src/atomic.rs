//! Atomic-write helper shared by every component that persists to
//! `.odavl/` (§5 "All persisted files...are written by writing to a
//! sibling temp file and renaming over the target").

use std::fs;
use std::io;
use std::path::Path;

/// Writes `bytes` to `path` via a sibling temp file + rename, so readers
/// never observe a half-written file. Creates parent directories as
/// needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = tmp_sibling(path);
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

fn tmp_sibling(path: &Path) -> std::path::PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "tmp".to_string());
    path.with_file_name(format!(".{file_name}.tmp-{}", std::process::id()))
}
