use crate::dedup::dedupe_and_sort;
use odavl_cache::IncrementalCache;
use odavl_types::{DetectError, Detector, DetectorContext, DetectorScope, FileContext, Issue, Language};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Registered detectors, explicit at startup — no runtime discovery (§9
/// Design Notes).
#[derive(Default, Clone)]
pub struct DetectorRegistry {
    detectors: Vec<Arc<dyn Detector>>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, detector: Arc<dyn Detector>) -> &mut Self {
        self.detectors.push(detector);
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.detectors.iter().map(|d| d.name().to_string()).collect()
    }

    fn of_scope(&self, scope: DetectorScope) -> Vec<&Arc<dyn Detector>> {
        self.detectors.iter().filter(|d| d.scope() == scope).collect()
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Bounded worker count for file-scoped parallel execution (§4.3,
    /// §5). `deterministic = true` forces sequential execution
    /// regardless of this value (CI mode, §4.3).
    pub worker_count: usize,
    pub deterministic: bool,
    pub per_file_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            worker_count: num_cpus::get().max(1),
            deterministic: false,
            per_file_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorStatus {
    Ok,
    Error,
    Skipped,
}

/// Final report handed from C3 to the caller: deduped, sorted issues plus
/// per-(file,detector) status so `DetectorTimeout`/`DetectorUnavailable`
/// surface as warnings without aborting the run (§4.3, §7).
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub issues: Vec<Issue>,
    pub warnings: Vec<String>,
    pub statuses: HashMap<(String, String), DetectorStatus>,
}

struct FileUnit {
    normalized: String,
    language: Option<Language>,
    hash: String,
}

/// Runs `detector.analyze_file` on a dedicated thread and enforces
/// `timeout` via a channel `recv_timeout`. If the deadline passes the
/// slot is marked an error but the spawned thread is left to finish on
/// its own — it does not block or abort other detectors (§4.3
/// `DetectorTimeout`).
fn run_file_detector_with_timeout(
    detector: Arc<dyn Detector>,
    path: String,
    content: Vec<u8>,
    language: Option<Language>,
    timeout: Duration,
) -> Result<Vec<Issue>, DetectError> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let ctx = FileContext {
            path: &path,
            content: &content,
            language,
        };
        let result = detector.analyze_file(&ctx);
        let _ = tx.send(result);
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(DetectError::Timeout),
    }
}

/// Executes all registered detectors against `files`, deterministically
/// (§4.3):
///
/// 1. Sort files by normalized path.
/// 2. Hash each file via `odavl-hash`.
/// 3. Run file-scoped detectors per file, consulting the cache first.
/// 4. Run workspace-scoped detectors once against the full sorted list.
/// 5. Run global-scoped detectors against the same list.
/// 6. Dedupe and sort the concatenation (C4) before returning.
///
/// Parallel and sequential (`config.deterministic = true`) modes produce
/// bit-identical `issues` output; only wall-clock time and `statuses`
/// ordering internals differ.
pub fn execute(
    workspace_root: &Path,
    files: &[PathBuf],
    registry: &DetectorRegistry,
    cache: &IncrementalCache,
    config: &ExecutorConfig,
) -> ExecutionReport {
    let mut units: Vec<FileUnit> = files
        .iter()
        .filter_map(|f| {
            let bytes = fs::read(f).ok()?;
            let normalized = odavl_hash::normalize(workspace_root, f);
            let hash = odavl_hash::hash(&bytes);
            let language = normalized
                .rsplit_once('.')
                .map(|(_, ext)| Language::from_extension(ext));
            Some(FileUnit {
                normalized,
                language,
                hash,
            })
        })
        .collect();
    units.sort_by(|a, b| a.normalized.cmp(&b.normalized));

    let sorted_paths: Vec<String> = units.iter().map(|u| u.normalized.clone()).collect();
    let file_detectors = registry.of_scope(DetectorScope::File);
    let worker_count = if config.deterministic { 1 } else { config.worker_count.max(1) };

    // Preallocated (file-index, detector-index) result grid; merging is an
    // in-order traversal regardless of completion order (§9 Design Notes).
    let grid: Vec<Vec<Option<Result<Vec<Issue>, DetectError>>>> =
        (0..units.len()).map(|_| vec![None; file_detectors.len()]).collect();

    let mut tasks: Vec<(usize, usize)> = Vec::new();
    for (fi, unit) in units.iter().enumerate() {
        for (di, detector) in file_detectors.iter().enumerate() {
            let applies = match &unit.language {
                Some(lang) => detector.supports(lang),
                None => false,
            };
            if applies {
                tasks.push((fi, di));
            } else {
                grid[fi][di] = Some(Ok(Vec::new()));
            }
        }
    }

    let (task_tx, task_rx) = mpsc::channel::<(usize, usize)>();
    for task in tasks {
        task_tx.send(task).unwrap();
    }
    drop(task_tx);

    let task_rx = std::sync::Mutex::new(task_rx);
    let results = std::sync::Mutex::new(grid);
    let paths_for_workers = &units;

    thread::scope(|scope| {
        for _ in 0..worker_count {
            scope.spawn(|| loop {
                let task = {
                    let rx = task_rx.lock().unwrap();
                    rx.recv()
                };
                let Ok((fi, di)) = task else { break };
                let unit = &paths_for_workers[fi];
                let detector: Arc<dyn Detector> = Arc::clone(file_detectors[di]);
                let detector_name = detector.name().to_string();

                let cached = cache.lookup(&unit.normalized, &unit.hash, &[detector_name.clone()]);
                let result = if let Some(mut hit) = cached {
                    Ok(hit.remove(&detector_name).unwrap_or_default())
                } else {
                    let path_for_read = workspace_root.join(&unit.normalized);
                    let content = fs::read(&path_for_read).unwrap_or_default();
                    let r = run_file_detector_with_timeout(
                        detector.clone(),
                        unit.normalized.clone(),
                        content,
                        unit.language.clone(),
                        config.per_file_timeout,
                    );
                    if let Ok(ref issues) = r {
                        let _ = cache.store(&unit.normalized, &unit.hash, &detector_name, issues.clone());
                    }
                    r
                };

                let mut grid = results.lock().unwrap();
                grid[fi][di] = Some(result);
            });
        }
    });

    let mut grid = results.into_inner().unwrap();
    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let mut statuses = HashMap::new();

    for (fi, unit) in units.iter().enumerate() {
        for (di, detector) in file_detectors.iter().enumerate() {
            let key = (unit.normalized.clone(), detector.name().to_string());
            match grid[fi][di].take() {
                Some(Ok(found)) => {
                    statuses.insert(key, DetectorStatus::Ok);
                    issues.extend(found);
                }
                Some(Err(DetectError::Timeout)) => {
                    warnings.push(format!(
                        "detector '{}' timed out on '{}'",
                        detector.name(),
                        unit.normalized
                    ));
                    statuses.insert(key, DetectorStatus::Error);
                }
                Some(Err(DetectError::Unavailable(reason))) => {
                    warnings.push(format!("detector '{}' unavailable: {reason}", detector.name()));
                    statuses.insert(key, DetectorStatus::Skipped);
                }
                Some(Err(DetectError::Failed(reason))) => {
                    warnings.push(format!(
                        "detector '{}' failed on '{}': {reason}",
                        detector.name(),
                        unit.normalized
                    ));
                    statuses.insert(key, DetectorStatus::Error);
                }
                None => {
                    statuses.insert(key, DetectorStatus::Skipped);
                }
            }
        }
    }

    let read_file = |p: &str| -> std::io::Result<Vec<u8>> { fs::read(workspace_root.join(p)) };
    let ctx = DetectorContext {
        files: &sorted_paths,
        read_file: &read_file,
    };

    for detector in registry.of_scope(DetectorScope::Workspace) {
        match detector.analyze_workspace(&ctx) {
            Ok(found) => issues.extend(found),
            Err(e) => {
                warn!(detector = detector.name(), error = %e, "workspace detector failed");
                warnings.push(format!("workspace detector '{}' failed: {e}", detector.name()));
            }
        }
    }

    for detector in registry.of_scope(DetectorScope::Global) {
        match detector.analyze_global(&ctx) {
            Ok(found) => issues.extend(found),
            Err(e) => {
                debug!(detector = detector.name(), error = %e, "global detector failed");
                warnings.push(format!("global detector '{}' failed: {e}", detector.name()));
            }
        }
    }

    ExecutionReport {
        issues: dedupe_and_sort(issues),
        warnings,
        statuses,
    }
}
