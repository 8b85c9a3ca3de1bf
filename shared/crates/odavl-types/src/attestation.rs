use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Secret HMAC key used to sign and verify attestations (§3, §4.10). The
/// key is created lazily on first attestation and persisted with
/// restricted filesystem permissions; rotation is an explicit operator
/// action outside this crate's scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustAnchor {
    pub id: Uuid,
    pub key: String,
    pub created_at: DateTime<Utc>,
}

/// Which per-type chain an attestation belongs to (§4.10). Each run type
/// forms its own `prevAttestationHash` chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Core,
    Governance,
    Recovery,
    Baseline,
    Peer,
    Verify,
}

impl RunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunType::Core => "core",
            RunType::Governance => "governance",
            RunType::Recovery => "recovery",
            RunType::Baseline => "baseline",
            RunType::Peer => "peer",
            RunType::Verify => "verify",
        }
    }
}

/// Thirty-two zero bytes, hex-encoded: the `prevAttestationHash` sentinel
/// for the first record of a chain (§4.10).
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// A signed, chain-linked record of a run or governance event (§3, §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    pub run_id: u64,
    pub run_type: RunType,
    pub timestamp: DateTime<Utc>,
    pub prev_attestation_hash: String,
    pub payload_hash: String,
    pub hmac: String,
}
