//! Coverage acquisition: obtain a normalized coverage tree for one revision.
//!
//! A tree either comes from an existing report file, or from running the
//! configured test command and reading the report it emits. A failing test
//! run is recorded but does not abandon measurement — partial coverage from
//! a failing run is still worth reporting.

use crate::coverage::CoverageTree;
use crate::sink::{ErrorSink, RunError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// How to obtain the coverage tree.
#[derive(Debug, Clone)]
pub enum AcquireMode<'a> {
    /// Read and parse an already-existing report file.
    ReadExisting(&'a Path),

    /// Run the test command, then read the report it emits at `report_path`.
    RunAndCollect {
        command: &'a str,
        report_path: &'a Path,
    },
}

/// Read a normalized coverage report from disk.
pub async fn read_coverage_file(path: &Path) -> Result<CoverageTree, RunError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RunError::CoverageFileUnreadable(format!("{}: {}", path.display(), e)))?;
    CoverageTree::from_json_str(&text)
        .map_err(|e| match e {
            RunError::CoverageFileMalformed(detail) => {
                RunError::CoverageFileMalformed(format!("{}: {}", path.display(), detail))
            }
            other => other,
        })
}

/// Run the external test command through the shell, observing its exit status.
///
/// The command is expected to emit a coverage report as a side effect; its
/// exit code alone does not determine acquisition success.
pub async fn run_test_command(command: &str, working_dir: Option<&Path>) -> Result<(), RunError> {
    info!(command = %command, "running test command");

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    let status = cmd
        .status()
        .await
        .map_err(|e| RunError::TestRunnerFailed(format!("failed to spawn '{}': {}", command, e)))?;

    if status.success() {
        Ok(())
    } else {
        Err(RunError::TestRunnerFailed(format!(
            "'{}' exited with code {}",
            command,
            status.code().unwrap_or(-1)
        )))
    }
}

/// Acquire a coverage tree for one revision.
///
/// In `RunAndCollect` mode a failing test run is appended to the sink
/// (tagged with `stage`) and the report is still read — complete or partial
/// coverage may exist even after a failing run.
pub async fn acquire(
    sink: &ErrorSink,
    stage: &str,
    mode: AcquireMode<'_>,
    working_dir: Option<&Path>,
) -> Result<CoverageTree, RunError> {
    match mode {
        AcquireMode::ReadExisting(path) => {
            let path = resolve(path, working_dir);
            debug!(path = %path.display(), "reading existing coverage report");
            read_coverage_file(&path).await
        }
        AcquireMode::RunAndCollect {
            command,
            report_path,
        } => {
            if let Err(error) = run_test_command(command, working_dir).await {
                sink.record(stage, error);
            }
            let path = resolve(report_path, working_dir);
            debug!(path = %path.display(), "reading emitted coverage report");
            read_coverage_file(&path).await
        }
    }
}

fn resolve(path: &Path, working_dir: Option<&Path>) -> PathBuf {
    match working_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}
