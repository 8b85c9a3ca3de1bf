//! # Content Hasher (C1)
//!
//! SHA-256 of file bytes, workspace-relative path normalization, and
//! best-effort VCS rename detection (§4.1). This is the leaf of the
//! dependency graph: every other component consults it but it consults
//! nothing else in the workspace.

use odavl_types::FileFingerprint;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::process::Command;
use unicode_normalization::UnicodeNormalization;

/// SHA-256 of `bytes`, lowercase hex, 64 characters (§4.1 `hash`).
pub fn hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Normalizes a path relative to `workspace_root`: strips the root,
/// converts to forward slashes, drops a trailing slash, and applies
/// Unicode NFC normalization (§4.1 `normalize`).
pub fn normalize(workspace_root: &std::path::Path, path: &std::path::Path) -> String {
    let relative = path.strip_prefix(workspace_root).unwrap_or(path);
    let as_str = relative.to_string_lossy().replace('\\', "/");
    let trimmed = as_str.trim_end_matches('/');
    trimmed.nfc().collect::<String>()
}

/// Computes the [`FileFingerprint`] for `path` given its raw bytes,
/// normalizing the path relative to `workspace_root` first.
pub fn fingerprint(
    workspace_root: &std::path::Path,
    path: &std::path::Path,
    bytes: &[u8],
) -> FileFingerprint {
    FileFingerprint {
        path: normalize(workspace_root, path),
        hash: hash(bytes),
    }
}

/// Best-effort VCS rename detection between two commits (§4.1
/// `detectRenames`). Returns an empty map if no VCS is available or the
/// commits can't be resolved; callers must treat the result as a hint
/// only, never as ground truth.
pub fn detect_renames(
    workspace_root: &std::path::Path,
    prev_commit: Option<&str>,
    current_commit: Option<&str>,
) -> HashMap<String, String> {
    let (Some(prev), Some(curr)) = (prev_commit, current_commit) else {
        return HashMap::new();
    };

    let output = Command::new("git")
        .arg("-C")
        .arg(workspace_root)
        .arg("diff")
        .arg("--name-status")
        .arg("-M")
        .arg(format!("{prev}..{curr}"))
        .output();

    let Ok(output) = output else {
        return HashMap::new();
    };
    if !output.status.success() {
        return HashMap::new();
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut renames = HashMap::new();
    for line in stdout.lines() {
        let mut fields = line.split('\t');
        let Some(status) = fields.next() else { continue };
        if !status.starts_with('R') {
            continue;
        }
        if let (Some(old), Some(new)) = (fields.next(), fields.next()) {
            renames.insert(old.to_string(), new.to_string());
        }
    }
    renames
}
