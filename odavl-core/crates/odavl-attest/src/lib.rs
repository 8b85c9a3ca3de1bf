//! # Attestation Chain (C10)
//!
//! Every run and governance event is recorded as an HMAC-signed,
//! chain-linked `Attestation` (§4.10). Each `RunType` forms its own
//! independent chain: record N's `prev_attestation_hash` must equal the
//! hash of record N-1 in the same chain, and `hmac` must verify against
//! the workspace's `TrustAnchor` key.

use chrono::Utc;
use hmac::{Hmac, Mac};
use odavl_types::atomic::write_atomic;
use odavl_types::{Attestation, OdavlError, OdavlResult, RunType, TrustAnchor, GENESIS_HASH};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Outcome of verifying one chain end to end (§4.10 `verifyAll`).
#[derive(Debug, Clone, PartialEq)]
pub struct ChainVerification {
    pub total: usize,
    pub valid: usize,
}

impl ChainVerification {
    pub fn integrity_ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.valid as f64 / self.total as f64
        }
    }

    pub fn is_fully_intact(&self) -> bool {
        self.total == self.valid
    }
}

/// Attestation storage rooted at `<workspace>/.odavl` (§6): the trust
/// anchor key at `trust-anchor.json`, one chain file per run type under
/// `attestations/<run_type>.json`.
pub struct AttestationStore {
    root: PathBuf,
}

impl AttestationStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        AttestationStore { root: root.into() }
    }

    fn anchor_path(&self) -> PathBuf {
        self.root.join("trust-anchor.json")
    }

    fn chain_path(&self, run_type: RunType) -> PathBuf {
        self.root.join("attestations").join(format!("{}.json", run_type.as_str()))
    }

    /// Loads the workspace's HMAC signing key, generating and persisting
    /// one on first use (§4.10 "created lazily on first attestation").
    pub fn load_or_create_anchor(&self) -> OdavlResult<TrustAnchor> {
        let path = self.anchor_path();
        if let Ok(bytes) = fs::read(&path) {
            let anchor: TrustAnchor =
                serde_json::from_slice(&bytes).map_err(|e| OdavlError::ConfigInvalid(e.to_string()))?;
            return Ok(anchor);
        }

        let mut key_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key_bytes);
        let anchor = TrustAnchor {
            id: Uuid::new_v4(),
            key: hex::encode(key_bytes),
            created_at: Utc::now(),
        };
        let bytes = odavl_types::to_canonical_json_bytes(&anchor)?;
        write_atomic(&path, &bytes)?;
        Ok(anchor)
    }

    fn load_chain(&self, run_type: RunType) -> OdavlResult<Vec<Attestation>> {
        match fs::read(self.chain_path(run_type)) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| OdavlError::ConfigInvalid(e.to_string()))
            }
            Err(_) => Ok(Vec::new()),
        }
    }

    fn save_chain(&self, run_type: RunType, chain: &[Attestation]) -> OdavlResult<()> {
        let bytes = odavl_types::to_canonical_json_bytes(&chain)?;
        write_atomic(&self.chain_path(run_type), &bytes)
    }

    /// Appends a new attestation to `run_type`'s chain, signing
    /// `payload`'s canonical JSON hash with the workspace's anchor
    /// (§4.10 steps: hash payload, link to previous, HMAC, append).
    /// `prevAttestationHash` chains to `hash(canonical(r_{i-1}))` — the
    /// hash of the entire previous record, not just its payload hash.
    pub fn append<T: serde::Serialize>(
        &self,
        run_id: u64,
        run_type: RunType,
        payload: &T,
    ) -> OdavlResult<Attestation> {
        let anchor = self.load_or_create_anchor()?;
        let mut chain = self.load_chain(run_type)?;

        let prev_attestation_hash = match chain.last() {
            Some(prev) => hash_payload(prev)?,
            None => GENESIS_HASH.to_string(),
        };
        let payload_hash = hash_payload(payload)?;
        let timestamp = Utc::now();
        let hmac = sign(&anchor, run_id, run_type, timestamp, &payload_hash, &prev_attestation_hash);

        let attestation = Attestation {
            run_id,
            run_type,
            timestamp,
            prev_attestation_hash,
            payload_hash,
            hmac,
        };
        chain.push(attestation.clone());
        self.save_chain(run_type, &chain)?;
        Ok(attestation)
    }

    /// Verifies one record's HMAC against the anchor and its own claimed
    /// fields (§4.10 `verify`).
    pub fn verify(&self, attestation: &Attestation) -> OdavlResult<bool> {
        let anchor = self.load_or_create_anchor()?;
        let expected = sign(
            &anchor,
            attestation.run_id,
            attestation.run_type,
            attestation.timestamp,
            &attestation.payload_hash,
            &attestation.prev_attestation_hash,
        );
        Ok(expected == attestation.hmac)
    }

    /// Walks `run_type`'s full chain, checking both the hash linkage
    /// between consecutive records and each record's HMAC, and reports
    /// the fraction intact (§4.10 `verifyAll`, property P7/P8).
    pub fn verify_all(&self, run_type: RunType) -> OdavlResult<ChainVerification> {
        let anchor = self.load_or_create_anchor()?;
        let chain = self.load_chain(run_type)?;

        let mut valid = 0;
        let mut expected_prev = GENESIS_HASH.to_string();
        for attestation in &chain {
            let links = attestation.prev_attestation_hash == expected_prev;
            let signed = sign(
                &anchor,
                attestation.run_id,
                attestation.run_type,
                attestation.timestamp,
                &attestation.payload_hash,
                &attestation.prev_attestation_hash,
            ) == attestation.hmac;
            if links && signed {
                valid += 1;
            }
            expected_prev = hash_payload(attestation)?;
        }

        Ok(ChainVerification {
            total: chain.len(),
            valid,
        })
    }
}

fn hash_payload<T: serde::Serialize>(payload: &T) -> OdavlResult<String> {
    let bytes = odavl_types::to_canonical_json_bytes(payload)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// HMAC-SHA256 over `runId || runType || timestamp || payloadHash ||
/// prevAttestationHash` (§4.10), binding every field of the record to
/// the signature so none can be altered independently of the others.
fn sign(
    anchor: &TrustAnchor,
    run_id: u64,
    run_type: RunType,
    timestamp: chrono::DateTime<Utc>,
    payload_hash: &str,
    prev_hash: &str,
) -> String {
    let mut mac = HmacSha256::new_from_slice(anchor.key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(run_id.to_string().as_bytes());
    mac.update(run_type.as_str().as_bytes());
    mac.update(timestamp.to_rfc3339().as_bytes());
    mac.update(payload_hash.as_bytes());
    mac.update(prev_hash.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn first_attestation_in_a_chain_links_to_genesis() {
        let dir = tempdir().unwrap();
        let store = AttestationStore::open(dir.path());
        let a = store.append(1, RunType::Core, &json!({"issues": 3})).unwrap();
        assert_eq!(a.prev_attestation_hash, GENESIS_HASH);
    }

    #[test]
    fn second_attestation_links_to_the_first() {
        let dir = tempdir().unwrap();
        let store = AttestationStore::open(dir.path());
        let a1 = store.append(1, RunType::Core, &json!({"issues": 3})).unwrap();
        let a2 = store.append(2, RunType::Core, &json!({"issues": 1})).unwrap();
        assert_eq!(a2.prev_attestation_hash, hash_payload(&a1).unwrap());
    }

    #[test]
    fn separate_run_types_form_independent_chains() {
        let dir = tempdir().unwrap();
        let store = AttestationStore::open(dir.path());
        store.append(1, RunType::Core, &json!({"a": 1})).unwrap();
        let gov = store.append(1, RunType::Governance, &json!({"b": 2})).unwrap();
        assert_eq!(gov.prev_attestation_hash, GENESIS_HASH);
    }

    #[test]
    fn verify_accepts_an_untampered_record() {
        let dir = tempdir().unwrap();
        let store = AttestationStore::open(dir.path());
        let a = store.append(1, RunType::Core, &json!({"issues": 3})).unwrap();
        assert!(store.verify(&a).unwrap());
    }

    #[test]
    fn verify_rejects_a_tampered_hmac() {
        let dir = tempdir().unwrap();
        let store = AttestationStore::open(dir.path());
        let mut a = store.append(1, RunType::Core, &json!({"issues": 3})).unwrap();
        a.hmac = "0".repeat(64);
        assert!(!store.verify(&a).unwrap());
    }

    #[test]
    fn verify_all_reports_full_integrity_for_an_untampered_chain() {
        let dir = tempdir().unwrap();
        let store = AttestationStore::open(dir.path());
        store.append(1, RunType::Core, &json!({"a": 1})).unwrap();
        store.append(2, RunType::Core, &json!({"a": 2})).unwrap();
        store.append(3, RunType::Core, &json!({"a": 3})).unwrap();

        let report = store.verify_all(RunType::Core).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.valid, 3);
        assert!(report.is_fully_intact());
        assert_eq!(report.integrity_ratio(), 1.0);
    }

    #[test]
    fn verify_all_detects_a_broken_link_mid_chain() {
        let dir = tempdir().unwrap();
        let store = AttestationStore::open(dir.path());
        store.append(1, RunType::Core, &json!({"a": 1})).unwrap();
        store.append(2, RunType::Core, &json!({"a": 2})).unwrap();
        store.append(3, RunType::Core, &json!({"a": 3})).unwrap();

        let mut chain = store.load_chain(RunType::Core).unwrap();
        chain[1].payload_hash = "deadbeef".repeat(8);
        store.save_chain(RunType::Core, &chain).unwrap();

        let report = store.verify_all(RunType::Core).unwrap();
        assert_eq!(report.total, 3);
        assert!(report.valid < 3);
        assert!(!report.is_fully_intact());
    }

    #[test]
    fn verify_all_on_an_empty_chain_is_fully_intact() {
        let dir = tempdir().unwrap();
        let store = AttestationStore::open(dir.path());
        let report = store.verify_all(RunType::Peer).unwrap();
        assert_eq!(report.total, 0);
        assert!(report.is_fully_intact());
    }

    #[test]
    fn anchor_is_created_once_and_reused() {
        let dir = tempdir().unwrap();
        let store = AttestationStore::open(dir.path());
        let a1 = store.load_or_create_anchor().unwrap();
        let a2 = store.load_or_create_anchor().unwrap();
        assert_eq!(a1.id, a2.id);
        assert_eq!(a1.key, a2.key);
    }
}
