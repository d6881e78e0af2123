//! Deterministic Markdown report assembly.
//!
//! Pure function of its inputs: identical coverage trees and threshold
//! results yield byte-identical text, so the published comment is stable
//! across reruns.

use crate::coverage::{CoverageTree, MetricKind};
use crate::threshold::{all_passed, ThresholdMode, ThresholdResult};

/// Assembled report artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub text: String,
}

fn fmt_pct(value: f64) -> String {
    // Trim a trailing ".00"-style zero tail so 80 renders as "80%".
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{}%", text)
}

/// Combine coverage data and threshold results into the report text.
pub fn assemble(
    head: &CoverageTree,
    base: Option<&CoverageTree>,
    results: &[ThresholdResult],
) -> Report {
    let mut text = String::from("# Coverage report\n");

    let verdict = if all_passed(results) {
        "✅ All coverage checks passed"
    } else {
        "❌ Coverage checks failed"
    };
    text.push_str(&format!("\n{}\n", verdict));

    // Aggregate coverage, head vs base.
    let head_root = head.aggregate();
    let base_root = base.map(|tree| tree.aggregate());

    text.push_str("\n## Totals\n\n");
    match &base_root {
        Some(base_root) => {
            text.push_str("| Metric | Head | Base | Diff |\n");
            text.push_str("| --- | --- | --- | --- |\n");
            for kind in MetricKind::ALL {
                let head_pct = head_root.metric(kind).percentage();
                let base_pct = base_root.metric(kind).percentage();
                let diff = head_pct - base_pct;
                let sign = if diff >= 0.0 { "+" } else { "" };
                text.push_str(&format!(
                    "| {} | {} | {} | {}{:.2} |\n",
                    kind,
                    fmt_pct(head_pct),
                    fmt_pct(base_pct),
                    sign,
                    diff
                ));
            }
        }
        None => {
            text.push_str("| Metric | Head |\n");
            text.push_str("| --- | --- |\n");
            for kind in MetricKind::ALL {
                text.push_str(&format!(
                    "| {} | {} |\n",
                    kind,
                    fmt_pct(head_root.metric(kind).percentage())
                ));
            }
        }
    }

    // Every threshold result appears, in evaluation order.
    if !results.is_empty() {
        text.push_str("\n## Threshold checks\n\n");
        text.push_str("| Scope | Metric | Mode | Actual | Bound | Status |\n");
        text.push_str("| --- | --- | --- | --- | --- | --- |\n");
        for result in results {
            let status = if result.passed { "✅" } else { "❌" };
            let bound = match result.mode {
                ThresholdMode::Absolute => format!("≥ {}", fmt_pct(result.bound)),
                ThresholdMode::Delta => format!("drop ≤ {:.2}", result.bound),
            };
            text.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                result.scope,
                result.metric,
                result.mode.name(),
                fmt_pct(result.actual),
                bound,
                status
            ));
        }
    }

    Report { text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::{FileCoverage, MetricCounts};
    use crate::threshold::CheckScope;

    fn tree(covered: u64, total: u64) -> CoverageTree {
        let mut tree = CoverageTree::new();
        tree.files.insert(
            "src/lib.rs".to_string(),
            FileCoverage {
                lines: MetricCounts::new(covered, total),
                ..Default::default()
            },
        );
        tree
    }

    fn result(passed: bool) -> ThresholdResult {
        ThresholdResult {
            scope: CheckScope::Global,
            metric: MetricKind::Lines,
            mode: ThresholdMode::Absolute,
            actual: 80.0,
            bound: 75.0,
            passed,
        }
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let head = tree(80, 100);
        let base = tree(75, 100);
        let results = vec![result(true)];

        let first = assemble(&head, Some(&base), &results);
        let second = assemble(&head, Some(&base), &results);
        assert_eq!(first.text, second.text, "identical inputs, identical bytes");
    }

    #[test]
    fn test_every_threshold_result_is_included() {
        let head = tree(80, 100);
        let results = vec![
            result(true),
            ThresholdResult {
                scope: CheckScope::File("src/lib.rs".to_string()),
                metric: MetricKind::Branches,
                mode: ThresholdMode::Delta,
                actual: 50.0,
                bound: 2.0,
                passed: false,
            },
        ];

        let report = assemble(&head, None, &results);
        assert!(report.text.contains("| total | lines |"));
        assert!(report.text.contains("| src/lib.rs | branches |"));
    }

    #[test]
    fn test_verdict_headline_follows_results() {
        let head = tree(80, 100);

        let passing = assemble(&head, None, &[result(true)]);
        assert!(passing.text.contains("All coverage checks passed"));

        let failing = assemble(&head, None, &[result(false)]);
        assert!(failing.text.contains("Coverage checks failed"));
    }

    #[test]
    fn test_base_column_only_with_base_tree() {
        let head = tree(80, 100);
        let base = tree(75, 100);

        let without = assemble(&head, None, &[]);
        assert!(!without.text.contains("Base"));

        let with = assemble(&head, Some(&base), &[]);
        assert!(with.text.contains("| Metric | Head | Base | Diff |"));
        assert!(with.text.contains("+5.00"));
    }

    #[test]
    fn test_no_checks_section_without_results() {
        let report = assemble(&tree(80, 100), None, &[]);
        assert!(!report.text.contains("Threshold checks"));
        assert!(report.text.contains("All coverage checks passed"));
    }
}
