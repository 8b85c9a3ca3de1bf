use thiserror::Error;

/// Error kinds named in §7. Every fallible ODAVL operation resolves to one
/// of these, so that propagation policy (recoverable vs. fatal) can be
/// decided once, at the orchestrator, instead of per call site.
#[derive(Error, Debug)]
pub enum OdavlError {
    #[error("configuration invalid: {0}")]
    ConfigInvalid(String),

    #[error("cache corrupt at {path}: {reason}")]
    CacheCorrupt { path: String, reason: String },

    #[error("detector unavailable: {0}")]
    DetectorUnavailable(String),

    #[error("detector timed out: {detector} on {file}")]
    DetectorTimeout { detector: String, file: String },

    #[error("gate violation: {0}")]
    GateViolation(String),

    #[error("snapshot corrupt: {0}")]
    SnapshotCorrupt(String),

    #[error("attestation chain mismatch: {0}")]
    AttestationMismatch(String),

    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),

    #[error("forbidden path: {0}")]
    ForbiddenPath(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("workspace locked: {0}")]
    LockHeld(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Whether an error kind is recoverable in place (§7 propagation policy):
/// recoverable errors never escape the run; they degrade the affected unit
/// of work and are surfaced as a warning on the run's metadata.
impl OdavlError {
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            OdavlError::CacheCorrupt { .. }
                | OdavlError::DetectorUnavailable(_)
                | OdavlError::DetectorTimeout { .. }
        )
    }
}

pub type OdavlResult<T> = Result<T, OdavlError>;
