use chrono::Utc;
use odavl_types::atomic::write_atomic;
use odavl_types::{fingerprint_issue, Baseline, BaselineIssue, Issue, OdavlError, OdavlResult, BASELINE_SCHEMA_VERSION};
use std::fs;
use std::path::PathBuf;

/// Baseline storage rooted at `<workspace>/.odavl/baselines` (§6).
pub struct BaselineStore {
    root: PathBuf,
}

impl BaselineStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        BaselineStore { root: root.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    /// Creates a named baseline from `current_issues`, refusing to
    /// overwrite an existing baseline unless `force` is set (§4.5
    /// `create`). Writes atomically (temp file + rename, §5).
    pub fn create(
        &self,
        name: &str,
        current_issues: Vec<Issue>,
        created_by: impl Into<String>,
        detector_set: Vec<String>,
        force: bool,
    ) -> OdavlResult<Baseline> {
        let path = self.path_for(name);
        if path.exists() && !force {
            return Err(OdavlError::ConfigInvalid(format!(
                "baseline '{name}' already exists; pass force=true to overwrite"
            )));
        }

        let now = Utc::now();
        let issues = current_issues
            .into_iter()
            .map(|issue| BaselineIssue {
                fingerprint: fingerprint_issue(&issue),
                issue,
                first_seen: now,
            })
            .collect();
        let baseline = Baseline::new(created_by, detector_set, issues);

        let bytes = odavl_types::to_canonical_json_bytes(&baseline)?;
        write_atomic(&path, &bytes)?;
        Ok(baseline)
    }

    /// Loads and schema-validates a named baseline (§4.5 `load`).
    pub fn load(&self, name: &str) -> OdavlResult<Baseline> {
        let path = self.path_for(name);
        let bytes = fs::read(&path).map_err(|_| OdavlError::NotFound(format!("baseline '{name}'")))?;
        let baseline: Baseline = serde_json::from_slice(&bytes)?;
        if baseline.schema_version != BASELINE_SCHEMA_VERSION {
            return Err(OdavlError::ConfigInvalid(format!(
                "baseline '{name}' schemaVersion {} unsupported (expected {})",
                baseline.schema_version, BASELINE_SCHEMA_VERSION
            )));
        }
        if baseline.total_issues != baseline.issues.len() {
            return Err(OdavlError::ConfigInvalid(format!(
                "baseline '{name}' totalIssues mismatch"
            )));
        }
        Ok(baseline)
    }

    pub fn list(&self) -> OdavlResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if let Some(stem) = entry.path().file_stem() {
                if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                    names.push(stem.to_string_lossy().to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn delete(&self, name: &str) -> OdavlResult<()> {
        let path = self.path_for(name);
        fs::remove_file(&path).map_err(|_| OdavlError::NotFound(format!("baseline '{name}'")))
    }
}
