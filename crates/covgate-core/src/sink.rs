//! Append-only failure accumulator for a single pipeline run.
//!
//! Instead of aborting on the first stage failure, the pipeline records
//! every failure here and keeps going, so a run still produces the
//! best-effort report. The overall exit status is decided once, at the
//! end, from the accumulated entries.

use std::sync::Mutex;
use thiserror::Error;

/// Closed taxonomy of run failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("coverage file unreadable: {0}")]
    CoverageFileUnreadable(String),

    #[error("coverage file malformed: {0}")]
    CoverageFileMalformed(String),

    #[error("test runner failed: {0}")]
    TestRunnerFailed(String),

    #[error("invalid threshold config: {0}")]
    ThresholdConfigInvalid(String),

    #[error("publish failed: {0}")]
    PublishFailed(String),
}

impl RunError {
    /// Stable kind label for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::ConfigurationInvalid(_) => "configuration_invalid",
            RunError::CoverageFileUnreadable(_) => "coverage_file_unreadable",
            RunError::CoverageFileMalformed(_) => "coverage_file_malformed",
            RunError::TestRunnerFailed(_) => "test_runner_failed",
            RunError::ThresholdConfigInvalid(_) => "threshold_config_invalid",
            RunError::PublishFailed(_) => "publish_failed",
        }
    }
}

/// Entry severity. Only `Error` entries fail the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One recorded failure, tagged with the stage that produced it.
/// Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEntry {
    pub stage: String,
    pub severity: Severity,
    pub error: RunError,
}

/// Append-only sink of run failures.
///
/// Created at run start, read at run end; never reset mid-run. The mutex
/// only makes the handle shareable across await points — all access
/// happens from the single pipeline control flow.
#[derive(Debug, Default)]
pub struct ErrorSink {
    entries: Mutex<Vec<SinkEntry>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error-severity entry.
    pub fn record(&self, stage: &str, error: RunError) {
        self.push(stage, Severity::Error, error);
    }

    /// Append a warning-severity entry. Warnings never fail the run.
    pub fn warn(&self, stage: &str, error: RunError) {
        self.push(stage, Severity::Warning, error);
    }

    fn push(&self, stage: &str, severity: Severity, error: RunError) {
        tracing::debug!(stage = %stage, kind = %error.kind(), "recording failure");
        self.entries
            .lock()
            .expect("error sink poisoned")
            .push(SinkEntry {
                stage: stage.to_string(),
                severity,
                error,
            });
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> Vec<SinkEntry> {
        self.entries.lock().expect("error sink poisoned").clone()
    }

    /// True iff at least one error-severity entry was recorded.
    pub fn has_errors(&self) -> bool {
        self.entries
            .lock()
            .expect("error sink poisoned")
            .iter()
            .any(|e| e.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().expect("error sink poisoned").is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("error sink poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sink_is_empty() {
        let sink = ErrorSink::new();
        assert!(sink.is_empty());
        assert!(!sink.has_errors());
    }

    #[test]
    fn test_record_preserves_insertion_order() {
        let sink = ErrorSink::new();
        sink.record("head_coverage", RunError::CoverageFileUnreadable("a".into()));
        sink.record("publish_report", RunError::PublishFailed("b".into()));

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].stage, "head_coverage");
        assert_eq!(entries[1].stage, "publish_report");
    }

    #[test]
    fn test_warnings_do_not_fail_the_run() {
        let sink = ErrorSink::new();
        sink.warn("head_coverage", RunError::TestRunnerFailed("exit 1".into()));

        assert!(!sink.is_empty());
        assert!(!sink.has_errors());

        sink.record("head_coverage", RunError::CoverageFileUnreadable("x".into()));
        assert!(sink.has_errors());
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(
            RunError::ConfigurationInvalid("x".into()).kind(),
            "configuration_invalid"
        );
        assert_eq!(
            RunError::ThresholdConfigInvalid("x".into()).kind(),
            "threshold_config_invalid"
        );
    }
}
