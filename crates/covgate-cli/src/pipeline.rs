//! The coverage-gate pipeline driver.
//!
//! Runs the fixed stage sequence
//! `parse_threshold → base_coverage → head_coverage → check_threshold →
//! create_report → publish_report → set_outputs`, strictly one stage at a
//! time. A stage whose prerequisite failed skips instead of working with
//! missing data; every failure lands in the sink and the run carries on to
//! produce whatever outputs it still can.

use crate::options::{Options, OutputKind, SkipStep};
use crate::outputs;
use covgate_core::acquire::{acquire, AcquireMode};
use covgate_core::report::{assemble, Report};
use covgate_core::sink::{ErrorSink, RunError};
use covgate_core::stage::{run_stage, StageFlow};
use covgate_core::threshold::{all_passed, evaluate, ThresholdConfig, ThresholdResult};
use covgate_github::{report_marker, PublishTarget};
use tracing::info;

/// Everything a completed run produced. The final exit status combines
/// `checks_passed` with the sink's error state.
#[derive(Debug)]
pub struct PipelineRun {
    pub checks: Vec<ThresholdResult>,
    pub checks_passed: bool,
    pub report: Option<Report>,
}

/// Execute one run against an already-initialized configuration.
pub async fn run(
    options: &Options,
    sink: &ErrorSink,
    publisher: Option<&dyn PublishTarget>,
) -> PipelineRun {
    let working_dir = options.working_dir();

    let (_, threshold) = run_stage("parse_threshold", sink, || async {
        let Some(spec) = options.threshold_spec_text() else {
            return Ok(StageFlow::Skip);
        };
        let config = ThresholdConfig::from_spec(&spec?)?;
        Ok(StageFlow::Done(config))
    })
    .await
    .parts();

    let (_, base) = run_stage("base_coverage", sink, || async {
        // No base source configured is a configuration decision, not a failure.
        let Some(path) = &options.base_coverage_file else {
            return Ok(StageFlow::Skip);
        };
        let tree = acquire(
            sink,
            "base_coverage",
            AcquireMode::ReadExisting(path),
            working_dir,
        )
        .await?;
        Ok(StageFlow::Done(tree))
    })
    .await
    .parts();

    let (_, head) = run_stage("head_coverage", sink, || async {
        let mode = match (&options.coverage_file, &options.test_command) {
            (Some(path), _) => AcquireMode::ReadExisting(path),
            (None, Some(command)) if options.skip_step != SkipStep::All => {
                AcquireMode::RunAndCollect {
                    command,
                    report_path: &options.report_path,
                }
            }
            // skip-step=all: the report is expected to already exist.
            (None, Some(_)) => AcquireMode::ReadExisting(&options.report_path),
            (None, None) => return Ok(StageFlow::Skip),
        };
        let tree = acquire(sink, "head_coverage", mode, working_dir).await?;
        Ok(StageFlow::Done(tree))
    })
    .await
    .parts();

    let (_, checks) = run_stage("check_threshold", sink, || async {
        let (Some(threshold), Some(head)) = (threshold.as_ref(), head.as_ref()) else {
            return Ok(StageFlow::Skip);
        };
        Ok(StageFlow::Done(evaluate(head, base.as_ref(), threshold)))
    })
    .await
    .parts();

    if let Some(checks) = &checks {
        info!(
            checks = checks.len(),
            passed = all_passed(checks),
            "threshold evaluation complete"
        );
    }

    let (report_ok, report) = run_stage("create_report", sink, || async {
        let Some(head) = head.as_ref() else {
            return Ok(StageFlow::Skip);
        };
        let results = checks.as_deref().unwrap_or(&[]);
        Ok(StageFlow::Done(assemble(head, base.as_ref(), results)))
    })
    .await
    .parts();

    run_stage("publish_report", sink, || async {
        if !report_ok || !options.outputs.contains(&OutputKind::Comment) {
            return Ok(StageFlow::Skip);
        }
        let (Some(publisher), Some(report)) = (publisher, report.as_ref()) else {
            return Ok(StageFlow::Skip);
        };

        let marker = report_marker(&options.marker_scope());
        let result = match (options.pr_number, &options.sha) {
            (Some(pr_number), _) => {
                publisher
                    .upsert_pr_comment(pr_number, &marker, &report.text)
                    .await
            }
            (None, Some(sha)) => publisher.post_commit_comment(sha, &marker, &report.text).await,
            (None, None) => return Ok(StageFlow::Skip),
        };
        result.map_err(|e| RunError::PublishFailed(format!("{:#}", e)))?;
        Ok(StageFlow::Done(()))
    })
    .await;

    run_stage("set_outputs", sink, || async {
        if !report_ok || !options.outputs.contains(&OutputKind::ReportMarkdown) {
            return Ok(StageFlow::Skip);
        }
        let Some(report) = report.as_ref() else {
            return Ok(StageFlow::Skip);
        };
        outputs::set_output("report", &report.text)
            .map_err(|e| RunError::PublishFailed(format!("writing report output: {}", e)))?;
        Ok(StageFlow::Done(()))
    })
    .await;

    let checks = checks.unwrap_or_default();
    let checks_passed = all_passed(&checks);

    PipelineRun {
        checks,
        checks_passed,
        report,
    }
}
