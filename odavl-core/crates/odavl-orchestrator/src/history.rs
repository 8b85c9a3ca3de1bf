//! Append-only run-history storage (§4.9 LEARN, §3). Not its own spec
//! component; owned by the orchestrator because LEARN and C11 are the
//! only readers/writers.

use odavl_types::atomic::write_atomic;
use odavl_types::{OdavlResult, RunHistoryEntry};
use std::fs;
use std::path::PathBuf;

pub struct RunHistoryStore {
    path: PathBuf,
}

impl RunHistoryStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        RunHistoryStore {
            path: root.into().join("run-history.json"),
        }
    }

    pub fn load(&self) -> OdavlResult<Vec<RunHistoryEntry>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(_) => Ok(Vec::new()),
        }
    }

    pub fn append(&self, entry: RunHistoryEntry) -> OdavlResult<()> {
        let mut entries = self.load()?;
        entries.push(entry);
        let bytes = odavl_types::to_canonical_json_bytes(&entries)?;
        write_atomic(&self.path, &bytes)
    }
}
