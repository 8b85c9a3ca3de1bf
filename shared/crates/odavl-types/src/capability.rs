use crate::issue::{Issue, Severity};
use crate::snapshot::ModificationPlan;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Declared scope of a detector (§4.3): `file`-scoped detectors run once
/// per file and may be cached; `workspace`-scoped detectors run once per
/// run against the full sorted file list and must be commutative;
/// `global`-scoped detectors run against named project configuration
/// files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorScope {
    File,
    Workspace,
    Global,
}

/// Source language/filetype a detector or recipe may declare support for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Language(pub String);

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        Language(ext.trim_start_matches('.').to_lowercase())
    }
}

/// Read-only view of a single file handed to a file-scoped detector.
pub struct FileContext<'a> {
    pub path: &'a str,
    pub content: &'a [u8],
    pub language: Option<Language>,
}

/// Read-only view of the whole sorted file list handed to workspace- and
/// global-scoped detectors (§4.3 step 4-5). Detectors must treat this as
/// immutable and must not depend on list order beyond what is already
/// encoded in the sort.
pub struct DetectorContext<'a> {
    pub files: &'a [String],
    pub read_file: &'a dyn Fn(&str) -> std::io::Result<Vec<u8>>,
}

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("detector timed out")]
    Timeout,
    #[error("detector unavailable: {0}")]
    Unavailable(String),
    #[error("detector failed: {0}")]
    Failed(String),
}

/// A pluggable analyzer (§1 "individual detector implementations...are
/// treated as pluggable analyzers"; §9 Design Notes capability set).
/// Implementations are registered explicitly at startup; there is no
/// runtime discovery.
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;
    fn scope(&self) -> DetectorScope;
    fn supports(&self, language: &Language) -> bool;

    /// Analyze a single file. Only called for `DetectorScope::File`
    /// detectors.
    fn analyze_file(&self, _ctx: &FileContext<'_>) -> Result<Vec<Issue>, DetectError> {
        Ok(Vec::new())
    }

    /// Analyze the whole sorted file list in one pass. Only called for
    /// `DetectorScope::Workspace` detectors; must be commutative under
    /// file-list permutation (§4.3 step 4).
    fn analyze_workspace(&self, _ctx: &DetectorContext<'_>) -> Result<Vec<Issue>, DetectError> {
        Ok(Vec::new())
    }

    /// Analyze named global configuration files. Only called for
    /// `DetectorScope::Global` detectors.
    fn analyze_global(&self, _ctx: &DetectorContext<'_>) -> Result<Vec<Issue>, DetectError> {
        Ok(Vec::new())
    }
}

/// Per-detector raw-severity → five-level mapping (§4.4, §9 open
/// question: "implementers MUST ship per-detector mappings but the shape
/// is fixed").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeverityTable {
    pub detector: String,
    pub mapping: HashMap<String, Severity>,
}

impl SeverityTable {
    pub fn normalize(&self, raw: &str) -> Option<Severity> {
        self.mapping.get(raw).copied()
    }
}

/// Run-scoped state a recipe's `plan` may consult: nothing the recipe
/// returns is trusted beyond the `ModificationPlan` it hands back (§3
/// "Recipe": "the core treats execution as a closed box").
pub struct RecipeContext<'a> {
    pub files: &'a [String],
    pub issues: &'a [Issue],
    pub read_file: &'a dyn Fn(&str) -> std::io::Result<Vec<u8>>,
}

#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("recipe produced no viable plan: {0}")]
    NoPlan(String),
    #[error("recipe failed: {0}")]
    Failed(String),
}

/// A pluggable action (§1 "individual fix recipes...treated as pluggable
/// actions"). `declared_protected_respect` and `max_files_touched` /
/// `max_lines_changed` are the recipe's own self-declared limits, checked
/// by the gate in addition to (not instead of) the run's `RiskBudget`.
pub trait Recipe: Send + Sync {
    fn id(&self) -> &str;
    fn risk_score(&self) -> f64;
    fn declared_protected_respect(&self) -> bool;
    fn max_files_touched(&self) -> u32;
    fn max_lines_changed(&self) -> u32;
    fn requires_workspace_type_check(&self) -> bool;

    fn plan(&self, ctx: &RecipeContext<'_>) -> Result<ModificationPlan, RecipeError>;
}
