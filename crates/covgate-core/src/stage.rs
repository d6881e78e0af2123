//! Pipeline stage execution with three-valued outcomes.
//!
//! A stage either succeeds with a value, skips cooperatively, or fails.
//! Failures are recorded in the [`ErrorSink`] and never unwind past the
//! caller — the pipeline driver alone decides whether later stages run.

use crate::sink::{ErrorSink, RunError};
use std::future::Future;
use tracing::info;

/// Value returned by a stage body: produce a value, or bail out of the
/// remainder of the stage without failing it.
///
/// Skipping is a configuration decision, not an error; a skipped stage
/// must never append to the sink.
#[derive(Debug, Clone, PartialEq)]
pub enum StageFlow<T> {
    Done(T),
    Skip,
}

/// Recorded outcome of a stage. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Succeeded(T),
    Skipped,
    Failed(RunError),
}

impl<T> StageOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Succeeded(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StageOutcome::Skipped)
    }

    /// Decompose into the `(ok, value)` pair the driver branches on.
    pub fn parts(self) -> (bool, Option<T>) {
        match self {
            StageOutcome::Succeeded(value) => (true, Some(value)),
            StageOutcome::Skipped | StageOutcome::Failed(_) => (false, None),
        }
    }
}

/// Execute one named stage.
///
/// - `Ok(Done(v))` records success and yields the value.
/// - `Ok(Skip)` records a skip; no sink entry is made.
/// - `Err(e)` appends exactly one error entry tagged with `name` and
///   records a failure. The error never propagates to the caller.
///
/// Stages run strictly one at a time; the body may await, but the caller
/// does not proceed until this outcome is recorded.
pub async fn run_stage<T, F, Fut>(name: &str, sink: &ErrorSink, work: F) -> StageOutcome<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<StageFlow<T>, RunError>>,
{
    info!(stage = %name, "stage started");

    match work().await {
        Ok(StageFlow::Done(value)) => {
            info!(stage = %name, outcome = "succeeded", "stage finished");
            StageOutcome::Succeeded(value)
        }
        Ok(StageFlow::Skip) => {
            info!(stage = %name, outcome = "skipped", "stage finished");
            StageOutcome::Skipped
        }
        Err(error) => {
            info!(stage = %name, outcome = "failed", kind = %error.kind(), "stage finished");
            sink.record(name, error.clone());
            StageOutcome::Failed(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_stage_yields_value() {
        let sink = ErrorSink::new();

        let outcome = run_stage("parse_threshold", &sink, || async {
            Ok(StageFlow::Done(42))
        })
        .await;

        assert_eq!(outcome, StageOutcome::Succeeded(42));
        let (ok, value) = outcome.parts();
        assert!(ok);
        assert_eq!(value, Some(42));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_skipped_stage_never_touches_sink() {
        let sink = ErrorSink::new();

        let outcome: StageOutcome<i32> =
            run_stage("base_coverage", &sink, || async { Ok(StageFlow::Skip) }).await;

        assert!(outcome.is_skipped());
        let (ok, value) = outcome.parts();
        assert!(!ok);
        assert_eq!(value, None);
        assert!(sink.is_empty(), "skip must not append to the sink");
    }

    #[tokio::test]
    async fn test_failed_stage_appends_exactly_one_tagged_entry() {
        let sink = ErrorSink::new();

        let outcome: StageOutcome<i32> = run_stage("head_coverage", &sink, || async {
            Err(RunError::CoverageFileUnreadable("no such file".into()))
        })
        .await;

        assert!(matches!(outcome, StageOutcome::Failed(_)));
        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stage, "head_coverage");
        assert!(matches!(
            entries[0].error,
            RunError::CoverageFileUnreadable(_)
        ));
    }

    #[tokio::test]
    async fn test_stage_body_may_await() {
        let sink = ErrorSink::new();

        let outcome = run_stage("head_coverage", &sink, || async {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            Ok(StageFlow::Done("tree"))
        })
        .await;

        assert!(outcome.is_success());
    }
}
