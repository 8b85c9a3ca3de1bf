//! # Detector Executor & Issue Model (C3, C4)
//!
//! Runs file/workspace/global detectors deterministically, in parallel
//! where safe, consulting the incremental cache, and normalizes the
//! resulting issues into a deduplicated, canonically sorted list (§4.3,
//! §4.4).

mod dedup;
mod executor;

pub use dedup::dedupe_and_sort;
pub use executor::{DetectorRegistry, DetectorStatus, ExecutionReport, ExecutorConfig, execute};
