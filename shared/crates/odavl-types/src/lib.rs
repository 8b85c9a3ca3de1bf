//! # ODAVL Types
//!
//! Shared data model for the ODAVL control-loop core: issues, baselines,
//! snapshots, risk budgets, the policy ledger, recipe trust, and
//! attestations. Every component crate (`odavl-cache`, `odavl-detect`,
//! `odavl-baseline`, `odavl-snapshot`, `odavl-gate`, `odavl-trust`,
//! `odavl-attest`, `odavl-governance`, `odavl-orchestrator`) depends on
//! this crate instead of on each other, so a run-context value can be
//! passed explicitly between them without cyclic crate references.

pub mod atomic;
mod capability;
mod error;
mod fingerprint;
mod issue;
mod baseline;
mod snapshot;
mod risk;
mod policy;
mod trust;
mod attestation;

pub use capability::*;
pub use error::*;
pub use fingerprint::*;
pub use issue::*;
pub use baseline::*;
pub use snapshot::*;
pub use risk::*;
pub use policy::*;
pub use trust::*;
pub use attestation::*;

/// Canonicalizes a `serde_json::Value` by recursively sorting object keys.
///
/// Used everywhere a payload is hashed or persisted as canonical JSON
/// (§6 on-disk layout: baselines, attestations, policy ledger, history).
pub fn canonicalize(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for k in keys {
                sorted.insert(k.clone(), canonicalize(&map[k]));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(canonicalize).collect())
        }
        other => other.clone(),
    }
}

/// Serializes `value` as canonical JSON bytes: sorted keys, UTF-8,
/// single trailing newline (§6 "Canonical JSON; sorted keys;
/// newline-terminated").
pub fn to_canonical_json_bytes<T: serde::Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let v = serde_json::to_value(value)?;
    let sorted = canonicalize(&v);
    let mut bytes = serde_json::to_vec(&sorted)?;
    bytes.push(b'\n');
    Ok(bytes)
}
