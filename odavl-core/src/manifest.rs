//! Project manifest and risk-gate configuration (§6 `manifest.yml`,
//! `gates.yml`). Both are schema-versioned YAML, loaded once at startup
//! and never written by the core itself outside of explicit policy-ledger
//! transitions (§3 "RiskBudget... mutated only through policy-ledger
//! transitions").

use odavl_types::{OdavlError, OdavlResult, RiskBudget, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const MANIFEST_SCHEMA_VERSION: u32 = 1;
pub const GATES_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub name: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default = "default_risk_profile")]
    pub risk_profile: String,
}

fn default_risk_profile() -> String {
    "balanced".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorsConfig {
    #[serde(default)]
    pub enabled: Vec<String>,
    #[serde(default)]
    pub disabled: Vec<String>,
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
}

fn default_min_severity() -> Severity {
    Severity::Info
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipesConfig {
    #[serde(default = "default_selection_strategy")]
    pub selection_strategy: String,
    #[serde(default)]
    pub trust_thresholds: HashMap<String, f64>,
}

fn default_selection_strategy() -> String {
    "highest-trust-first".to_string()
}

/// `.odavl/manifest.yml` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema_version: u32,
    pub project: ProjectInfo,
    #[serde(default)]
    pub file_taxonomy: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub detectors: DetectorsConfig,
    #[serde(default)]
    pub recipes: RecipesConfig,
}

impl Manifest {
    pub fn load(path: &Path) -> OdavlResult<Self> {
        let bytes = fs::read(path)
            .map_err(|_| OdavlError::NotFound(format!("manifest at {}", path.display())))?;
        let manifest: Manifest =
            serde_yaml::from_slice(&bytes).map_err(|e| OdavlError::ConfigInvalid(e.to_string()))?;
        if manifest.schema_version != MANIFEST_SCHEMA_VERSION {
            return Err(OdavlError::ConfigInvalid(format!(
                "manifest schemaVersion {} unsupported (expected {MANIFEST_SCHEMA_VERSION})",
                manifest.schema_version
            )));
        }
        Ok(manifest)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub max_risk_per_action: f64,
    pub min_success_rate: f64,
    pub max_consecutive_failures: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enforcement {
    #[serde(default = "default_true")]
    pub block_if_budget_exceeded: bool,
    #[serde(default = "default_true")]
    pub rollback_on_failure: bool,
    #[serde(default = "default_true")]
    pub require_attestation: bool,
}

fn default_true() -> bool {
    true
}

/// `.odavl/gates.yml` (§6): the risk budget plus the thresholds and
/// enforcement flags that govern how strictly it's applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gates {
    pub schema_version: u32,
    pub risk_budget: RiskBudget,
    pub thresholds: Thresholds,
    pub enforcement: Enforcement,
}

impl Gates {
    pub fn load(path: &Path) -> OdavlResult<Self> {
        let bytes =
            fs::read(path).map_err(|_| OdavlError::NotFound(format!("gates at {}", path.display())))?;
        let gates: Gates =
            serde_yaml::from_slice(&bytes).map_err(|e| OdavlError::ConfigInvalid(e.to_string()))?;
        if gates.schema_version != GATES_SCHEMA_VERSION {
            return Err(OdavlError::ConfigInvalid(format!(
                "gates schemaVersion {} unsupported (expected {GATES_SCHEMA_VERSION})",
                gates.schema_version
            )));
        }
        Ok(gates)
    }
}
