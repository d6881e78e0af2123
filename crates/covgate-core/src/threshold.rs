//! Threshold configuration and coverage-delta evaluation.
//!
//! A threshold bounds a coverage metric either absolutely (head percentage
//! must be at least the bound) or as a delta (head must not regress from
//! base by more than the bound). Bounds apply at global scope and/or to
//! files matched by glob patterns.

use crate::coverage::{CoverageTree, MetricKind};
use crate::sink::RunError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Comparison mode for a threshold rule.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMode {
    /// Head percentage must be `>= bound`.
    #[default]
    Absolute,

    /// Head percentage must not drop below base percentage by more than
    /// `bound` points. Meaningless without a base tree.
    Delta,
}

impl ThresholdMode {
    pub fn name(&self) -> &'static str {
        match self {
            ThresholdMode::Absolute => "absolute",
            ThresholdMode::Delta => "delta",
        }
    }
}

/// One configured bound for one metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "RuleRepr")]
pub struct ThresholdRule {
    #[serde(default)]
    pub mode: ThresholdMode,
    pub bound: f64,
}

impl ThresholdRule {
    pub fn absolute(bound: f64) -> Self {
        Self {
            mode: ThresholdMode::Absolute,
            bound,
        }
    }

    pub fn delta(bound: f64) -> Self {
        Self {
            mode: ThresholdMode::Delta,
            bound,
        }
    }
}

/// Accepts either a bare number (absolute shorthand) or the full form.
#[derive(Deserialize)]
#[serde(untagged)]
enum RuleRepr {
    Bound(f64),
    Full {
        #[serde(default)]
        mode: ThresholdMode,
        bound: f64,
    },
}

impl From<RuleRepr> for ThresholdRule {
    fn from(repr: RuleRepr) -> Self {
        match repr {
            RuleRepr::Bound(bound) => ThresholdRule::absolute(bound),
            RuleRepr::Full { mode, bound } => ThresholdRule { mode, bound },
        }
    }
}

fn default_precision() -> u32 {
    2
}

/// Full threshold configuration: global per-metric rules plus per-glob
/// overrides, and the decimal precision percentages are rounded to before
/// comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdConfig {
    #[serde(default = "default_precision")]
    pub precision: u32,

    #[serde(default)]
    pub global: BTreeMap<MetricKind, ThresholdRule>,

    #[serde(default)]
    pub files: BTreeMap<String, BTreeMap<MetricKind, ThresholdRule>>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
            global: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }
}

impl ThresholdConfig {
    /// Parse a threshold specification string.
    ///
    /// A bare number is shorthand for a global absolute bound on all four
    /// metrics; otherwise the string must be the JSON configuration form.
    pub fn from_spec(spec: &str) -> Result<Self, RunError> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(RunError::ThresholdConfigInvalid(
                "empty threshold specification".to_string(),
            ));
        }

        let config = if let Ok(bound) = trimmed.parse::<f64>() {
            let mut global = BTreeMap::new();
            for kind in MetricKind::ALL {
                global.insert(kind, ThresholdRule::absolute(bound));
            }
            ThresholdConfig {
                precision: default_precision(),
                global,
                files: BTreeMap::new(),
            }
        } else {
            serde_json::from_str(trimmed)
                .map_err(|e| RunError::ThresholdConfigInvalid(e.to_string()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range bounds and unusable precision.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.precision > 6 {
            return Err(RunError::ThresholdConfigInvalid(format!(
                "precision {} exceeds 6 decimal places",
                self.precision
            )));
        }

        let global_rules = self.global.iter().map(|(k, r)| (k.name().to_string(), r));
        let file_rules = self
            .files
            .iter()
            .flat_map(|(pat, rules)| rules.iter().map(move |(k, r)| (format!("{pat}:{k}"), r)));

        for (scope, rule) in global_rules.chain(file_rules) {
            match rule.mode {
                ThresholdMode::Absolute if !(0.0..=100.0).contains(&rule.bound) => {
                    return Err(RunError::ThresholdConfigInvalid(format!(
                        "absolute bound {} for {} outside [0, 100]",
                        rule.bound, scope
                    )));
                }
                ThresholdMode::Delta if rule.bound < 0.0 => {
                    return Err(RunError::ThresholdConfigInvalid(format!(
                        "delta bound {} for {} is negative",
                        rule.bound, scope
                    )));
                }
                _ => {}
            }
        }

        for pattern in self.files.keys() {
            glob::Pattern::new(pattern).map_err(|e| {
                RunError::ThresholdConfigInvalid(format!("bad file pattern '{}': {}", pattern, e))
            })?;
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.files.is_empty()
    }
}

/// What a check applied to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckScope {
    Global,
    File(String),
}

impl std::fmt::Display for CheckScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckScope::Global => f.write_str("total"),
            CheckScope::File(path) => f.write_str(path),
        }
    }
}

/// One evaluated (scope, metric) check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdResult {
    pub scope: CheckScope,
    pub metric: MetricKind,
    pub mode: ThresholdMode,
    /// Head percentage, rounded to the configured precision.
    pub actual: f64,
    pub bound: f64,
    pub passed: bool,
}

/// Round half up at `precision` decimal places.
///
/// Percentages are non-negative, so adding 0.5 before flooring is the
/// half-up rule.
pub fn round_half_up(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor + 0.5).floor() / factor
}

/// Evaluate the configured thresholds against head (and optionally base)
/// coverage.
///
/// Output order is deterministic: global checks in canonical metric order,
/// then per-file checks sorted by path then metric — never the iteration
/// order of the source report. Delta checks without a usable baseline are
/// omitted entirely, not failed.
pub fn evaluate(
    head: &CoverageTree,
    base: Option<&CoverageTree>,
    config: &ThresholdConfig,
) -> Vec<ThresholdResult> {
    let mut results = Vec::new();
    let precision = config.precision;

    let head_root = head.aggregate();
    let base_root = base.map(|tree| tree.aggregate());

    for kind in MetricKind::ALL {
        let Some(rule) = config.global.get(&kind) else {
            continue;
        };
        let actual = round_half_up(head_root.metric(kind).percentage(), precision);
        match rule.mode {
            ThresholdMode::Absolute => {
                results.push(ThresholdResult {
                    scope: CheckScope::Global,
                    metric: kind,
                    mode: rule.mode,
                    actual,
                    bound: rule.bound,
                    passed: actual >= rule.bound,
                });
            }
            ThresholdMode::Delta => {
                // No baseline: the check is meaningless, omit it.
                let Some(base_root) = &base_root else {
                    continue;
                };
                let base_pct = round_half_up(base_root.metric(kind).percentage(), precision);
                results.push(ThresholdResult {
                    scope: CheckScope::Global,
                    metric: kind,
                    mode: rule.mode,
                    actual,
                    bound: rule.bound,
                    passed: actual >= base_pct - rule.bound,
                });
            }
        }
    }

    // Resolve per-glob overrides to concrete (path, metric) rules. Patterns
    // iterate in sorted order, so when several match the same pair the
    // lexicographically later pattern wins.
    let mut file_rules: BTreeMap<(String, MetricKind), ThresholdRule> = BTreeMap::new();
    for (pattern_text, rules) in &config.files {
        // Patterns were validated at parse time.
        let Ok(pattern) = glob::Pattern::new(pattern_text) else {
            continue;
        };
        let matched: BTreeSet<&String> = head
            .files
            .keys()
            .filter(|path| pattern.matches(path.as_str()))
            .collect();
        for path in matched {
            for (kind, rule) in rules {
                file_rules.insert((path.clone(), *kind), *rule);
            }
        }
    }

    // BTreeMap keys sort by path first; resolve metric canonical order
    // within each path explicitly.
    let mut paths: Vec<&String> = file_rules.keys().map(|(path, _)| path).collect();
    paths.dedup();
    for path in paths {
        for kind in MetricKind::ALL {
            let Some(rule) = file_rules.get(&(path.clone(), kind)) else {
                continue;
            };
            let Some(file) = head.files.get(path) else {
                continue;
            };
            let actual = round_half_up(file.metric(kind).percentage(), precision);
            match rule.mode {
                ThresholdMode::Absolute => {
                    results.push(ThresholdResult {
                        scope: CheckScope::File(path.clone()),
                        metric: kind,
                        mode: rule.mode,
                        actual,
                        bound: rule.bound,
                        passed: actual >= rule.bound,
                    });
                }
                ThresholdMode::Delta => {
                    let Some(base_file) = base.and_then(|tree| tree.files.get(path)) else {
                        continue;
                    };
                    let base_pct = round_half_up(base_file.metric(kind).percentage(), precision);
                    results.push(ThresholdResult {
                        scope: CheckScope::File(path.clone()),
                        metric: kind,
                        mode: rule.mode,
                        actual,
                        bound: rule.bound,
                        passed: actual >= base_pct - rule.bound,
                    });
                }
            }
        }
    }

    results
}

/// Overall verdict: logical AND of all checks. Nothing configured means
/// nothing to fail.
pub fn all_passed(results: &[ThresholdResult]) -> bool {
    results.iter().all(|r| r.passed)
}
