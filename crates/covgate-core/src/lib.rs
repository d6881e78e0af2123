//! covgate-core - Coverage pipeline engine
//!
//! Provides the pieces a coverage-gate CI run is composed of:
//! - Executes named pipeline stages with a three-valued outcome (succeed/skip/fail)
//! - Accumulates typed failures in an append-only sink instead of aborting
//! - Acquires normalized coverage trees (read a report file, or run the
//!   test command and collect its report)
//! - Evaluates absolute and delta thresholds against head/base coverage
//! - Assembles a deterministic Markdown report

pub mod acquire;
pub mod coverage;
pub mod report;
pub mod sink;
pub mod stage;
pub mod telemetry;
pub mod threshold;

// Re-export key types
pub use acquire::{acquire, read_coverage_file, run_test_command, AcquireMode};
pub use coverage::{CoverageTree, FileCoverage, MetricCounts, MetricKind};
pub use report::{assemble, Report};
pub use sink::{ErrorSink, RunError, Severity, SinkEntry};
pub use stage::{run_stage, StageFlow, StageOutcome};
pub use telemetry::init_tracing;
pub use threshold::{
    all_passed, evaluate, CheckScope, ThresholdConfig, ThresholdMode, ThresholdResult,
    ThresholdRule,
};
