//! Normalized coverage data model.
//!
//! A [`CoverageTree`] maps file paths to per-metric covered/total counts for
//! one revision. The serialized form is the normalized JSON consumed from
//! test runners:
//!
//! ```json
//! { "src/lib.rs": { "statements": { "covered": 8, "total": 10 }, ... } }
//! ```

use crate::sink::RunError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The four coverage metric kinds, in canonical order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Statements,
    Branches,
    Functions,
    Lines,
}

impl MetricKind {
    /// All metric kinds in canonical report order.
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Statements,
        MetricKind::Branches,
        MetricKind::Functions,
        MetricKind::Lines,
    ];

    /// Get the metric name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::Statements => "statements",
            MetricKind::Branches => "branches",
            MetricKind::Functions => "functions",
            MetricKind::Lines => "lines",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A covered/total pair for one metric.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricCounts {
    pub covered: u64,
    pub total: u64,
}

impl MetricCounts {
    pub fn new(covered: u64, total: u64) -> Self {
        Self { covered, total }
    }

    /// Coverage percentage in `[0, 100]`.
    ///
    /// A file with no instrumentable code (`total == 0`) counts as fully
    /// covered, never as a division fault.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.covered as f64 / self.total as f64 * 100.0
        }
    }

    fn add(&mut self, other: &MetricCounts) {
        self.covered += other.covered;
        self.total += other.total;
    }
}

/// Per-file coverage record: one counts pair per metric kind.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileCoverage {
    pub statements: MetricCounts,
    pub branches: MetricCounts,
    pub functions: MetricCounts,
    pub lines: MetricCounts,
}

impl FileCoverage {
    /// Counts for one metric kind.
    pub fn metric(&self, kind: MetricKind) -> MetricCounts {
        match kind {
            MetricKind::Statements => self.statements,
            MetricKind::Branches => self.branches,
            MetricKind::Functions => self.functions,
            MetricKind::Lines => self.lines,
        }
    }

    fn add(&mut self, other: &FileCoverage) {
        self.statements.add(&other.statements);
        self.branches.add(&other.branches);
        self.functions.add(&other.functions);
        self.lines.add(&other.lines);
    }
}

/// Normalized coverage for one revision: file path -> per-metric counts.
///
/// Backed by a sorted map so iteration order is deterministic regardless of
/// the order files appeared in the source report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CoverageTree {
    pub files: BTreeMap<String, FileCoverage>,
}

impl CoverageTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthetic root aggregate: sum of all per-file pairs per metric.
    pub fn aggregate(&self) -> FileCoverage {
        let mut root = FileCoverage::default();
        for file in self.files.values() {
            root.add(file);
        }
        root
    }

    /// Parse and validate a coverage tree from its normalized JSON form.
    pub fn from_json_str(text: &str) -> Result<Self, RunError> {
        let tree: CoverageTree = serde_json::from_str(text)
            .map_err(|e| RunError::CoverageFileMalformed(e.to_string()))?;
        tree.validate()?;
        Ok(tree)
    }

    /// Check the `covered <= total` invariant on every metric of every file.
    pub fn validate(&self) -> Result<(), RunError> {
        for (path, file) in &self.files {
            for kind in MetricKind::ALL {
                let counts = file.metric(kind);
                if counts.covered > counts.total {
                    return Err(RunError::CoverageFileMalformed(format!(
                        "{}: {} covered ({}) exceeds total ({})",
                        path, kind, counts.covered, counts.total
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
