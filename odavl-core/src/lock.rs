//! Exclusive file lock guarding `.odavl/` against concurrent runs from
//! another process (§5 shared-resource policy, §9 Design Notes: process-wide
//! state reduces to the trust anchor key and this lock).

use fs4::FileExt;
use odavl_types::{OdavlError, OdavlResult};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub struct WorkspaceLock {
    file: File,
    path: PathBuf,
}

impl WorkspaceLock {
    /// Acquires an exclusive lock on `<odavl_dir>/.lock`, creating the
    /// directory and file if needed. Fails fast (non-blocking) rather than
    /// waiting on a concurrent holder, so a second `odavl run` in the same
    /// workspace reports a clear error instead of hanging.
    pub fn acquire(odavl_dir: &Path) -> OdavlResult<Self> {
        std::fs::create_dir_all(odavl_dir)?;
        let path = odavl_dir.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        file.try_lock_exclusive().map_err(|_| {
            OdavlError::LockHeld(format!(
                "another odavl process holds the lock at {}",
                path.display()
            ))
        })?;
        Ok(WorkspaceLock { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_in_same_process_tree_fails_while_first_is_held() {
        let dir = tempdir().unwrap();
        let odavl_dir = dir.path().join(".odavl");
        let first = WorkspaceLock::acquire(&odavl_dir).unwrap();
        let second = WorkspaceLock::acquire(&odavl_dir);
        assert!(second.is_err());
        drop(first);
        assert!(WorkspaceLock::acquire(&odavl_dir).is_ok());
    }
}
