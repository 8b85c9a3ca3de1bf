use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use odavl_types::{OdavlError, RunOutcome, Severity};
use std::path::{Path, PathBuf};
use tracing::error;
use uuid::Uuid;

mod commands;
mod lock;
mod manifest;

/// ODAVL control-loop CLI: Observe, Decide, Act, Verify, Learn.
#[derive(Parser)]
#[command(name = "odavl")]
#[command(about = "Autonomous code-quality control loop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root to operate on.
    #[arg(long, global = true, default_value = ".")]
    workspace: PathBuf,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full Observe/Decide/Act/Verify/Learn cycle.
    Run {
        /// Path to the risk-gate configuration, relative to `--workspace`
        /// unless absolute.
        #[arg(long, default_value = ".odavl/gates.yml")]
        gates: PathBuf,

        /// Identifier for this run, recorded in the attestation chain.
        #[arg(long)]
        run_id: u64,

        /// Committed snapshots to retain after a successful run.
        #[arg(long, default_value_t = 10)]
        snapshot_retention: usize,
    },
    /// Execute a specific action plan under gate enforcement, bypassing
    /// OBSERVE/DECIDE.
    Apply {
        /// Path to a JSON-serialized `ModificationPlan`.
        #[arg(long)]
        plan: PathBuf,

        #[arg(long, default_value = ".odavl/gates.yml")]
        gates: PathBuf,

        #[arg(long)]
        run_id: u64,

        #[arg(long, default_value_t = 10)]
        snapshot_retention: usize,

        /// Re-run detectors over the whole workspace for VERIFY instead of
        /// just the plan's changed files.
        #[arg(long)]
        full_verify: bool,
    },
    /// Restore a previously captured snapshot.
    Undo {
        /// Snapshot id to restore. Omit with `--list` to see available ids.
        #[arg(required_unless_present = "list")]
        snapshot_id: Option<Uuid>,

        #[arg(long)]
        list: bool,

        #[arg(long, default_value_t = 10)]
        snapshot_retention: usize,
    },
    /// Compare the current workspace against a named baseline.
    Verify {
        #[arg(long)]
        baseline: String,

        /// Minimum severity of a new issue that fails the command.
        #[arg(long, value_enum, default_value = "high")]
        fail_level: SeverityArg,

        /// Fail on any new issue, regardless of severity.
        #[arg(long)]
        fail_on_new: bool,
    },
    /// Manage named baselines.
    Baseline {
        #[command(subcommand)]
        command: BaselineCommands,
    },
}

#[derive(Subcommand)]
enum BaselineCommands {
    /// Freeze the current workspace's issues as a named baseline.
    Create {
        name: String,
        #[arg(long, default_value = "cli")]
        created_by: String,
        #[arg(long)]
        force: bool,
    },
    /// List known baselines.
    List,
    /// Delete a named baseline.
    Delete { name: String },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum SeverityArg {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl From<SeverityArg> for Severity {
    fn from(value: SeverityArg) -> Self {
        match value {
            SeverityArg::Critical => Severity::Critical,
            SeverityArg::High => Severity::High,
            SeverityArg::Medium => Severity::Medium,
            SeverityArg::Low => Severity::Low,
            SeverityArg::Info => Severity::Info,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let workspace = resolve_workspace(&cli.workspace)?;
    let _lock = lock::WorkspaceLock::acquire(&workspace.join(".odavl")).context("acquiring workspace lock")?;

    let exit_code = match cli.command {
        Commands::Run {
            gates,
            run_id,
            snapshot_retention,
        } => {
            let gates_path = resolve(&workspace, &gates);
            run_exit_code(commands::run::execute(&workspace, &gates_path, run_id, snapshot_retention))
        }
        Commands::Apply {
            plan,
            gates,
            run_id,
            snapshot_retention,
            full_verify,
        } => {
            let plan_path = resolve(&workspace, &plan);
            let gates_path = resolve(&workspace, &gates);
            run_exit_code(commands::apply::execute(
                &workspace,
                &plan_path,
                &gates_path,
                run_id,
                snapshot_retention,
                full_verify,
            ))
        }
        Commands::Undo {
            snapshot_id,
            list,
            snapshot_retention,
        } => {
            if list {
                generic_exit_code(commands::undo::list(&workspace, snapshot_retention))
            } else {
                undo_exit_code(commands::undo::execute(
                    &workspace,
                    snapshot_id.expect("clap enforces presence"),
                    snapshot_retention,
                ))
            }
        }
        Commands::Verify {
            baseline,
            fail_level,
            fail_on_new,
        } => generic_exit_code(commands::verify::execute(&workspace, &baseline, fail_level.into(), fail_on_new)),
        Commands::Baseline { command } => generic_exit_code(match command {
            BaselineCommands::Create { name, created_by, force } => {
                commands::baseline::create(&workspace, &name, &created_by, force)
            }
            BaselineCommands::List => commands::baseline::list(&workspace),
            BaselineCommands::Delete { name } => commands::baseline::delete(&workspace, &name),
        }),
    };

    std::process::exit(exit_code);
}

/// §6 exit contract for `run`/`apply`: 0 on success (including noop), 1
/// on a gate violation that triggered rollback, 2 on any other error.
fn run_exit_code(result: Result<RunOutcome>) -> i32 {
    match result {
        Ok(RunOutcome::RolledBack) => 1,
        Ok(_) => 0,
        Err(e) => {
            error!("command failed: {e:#}");
            2
        }
    }
}

/// §6 exit contract for `undo --snapshot`: 0 if restored, 3 if the
/// snapshot doesn't exist, 2 on any other error.
fn undo_exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("command failed: {e:#}");
            match e.downcast_ref::<OdavlError>() {
                Some(OdavlError::NotFound(_)) => 3,
                _ => 2,
            }
        }
    }
}

fn generic_exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("command failed: {e:#}");
            1
        }
    }
}

fn resolve_workspace(path: &Path) -> Result<PathBuf> {
    path.canonicalize().with_context(|| format!("resolving workspace root {}", path.display()))
}

fn resolve(workspace: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_ansi(true))
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .init();
    Ok(())
}
