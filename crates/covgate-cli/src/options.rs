//! Command-line options and resolved run configuration.
//!
//! GitHub context (repository, SHA, token, API base) flows in through the
//! standard `GITHUB_*` environment variables and can be overridden by
//! flags. Resolution happens inside the `initialize` stage; a validation
//! failure there is the one fatal error of a run.

use clap::{Parser, ValueEnum};
use covgate_core::sink::RunError;
use covgate_github::GithubClient;
use std::path::{Path, PathBuf};

/// Requested process outputs.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputKind {
    /// Publish the report as a PR/commit comment.
    Comment,
    /// Emit the report text as the `report` output.
    ReportMarkdown,
}

/// Annotation mode, kept for configuration parity with existing CI setups.
/// Annotation publishing itself is not part of this pipeline.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum AnnotationMode {
    #[default]
    All,
    None,
    Coverage,
    FailedTests,
}

/// Which acquisition steps to skip.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum SkipStep {
    /// Run everything as configured.
    #[default]
    None,
    /// Never invoke the test command; only read existing report files.
    All,
}

#[derive(Parser, Debug)]
#[command(name = "covgate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Coverage gate and report pipeline for CI", long_about = None)]
pub struct Cli {
    /// Directory the test command runs in and relative paths resolve against
    #[arg(long)]
    pub working_directory: Option<PathBuf>,

    /// Shell command that runs the test suite and emits the coverage report
    #[arg(long)]
    pub test_command: Option<String>,

    /// Existing head coverage report to read instead of running tests
    #[arg(long)]
    pub coverage_file: Option<PathBuf>,

    /// Base revision coverage report for delta checks
    #[arg(long)]
    pub base_coverage_file: Option<PathBuf>,

    /// Where the test command emits its coverage report
    #[arg(long, default_value = "coverage-report.json")]
    pub report_path: PathBuf,

    /// Threshold spec: a bare percentage, inline JSON, or a path to a JSON file
    #[arg(long)]
    pub threshold: Option<String>,

    /// Outputs to produce (repeatable)
    #[arg(long = "output", value_enum, default_values_t = [OutputKind::Comment])]
    pub outputs: Vec<OutputKind>,

    /// Annotation mode
    #[arg(long, value_enum, default_value_t = AnnotationMode::All)]
    pub annotations: AnnotationMode,

    /// Skip acquisition steps
    #[arg(long, value_enum, default_value_t = SkipStep::None)]
    pub skip_step: SkipStep,

    /// Pull request number (present only when running against a PR)
    #[arg(long)]
    pub pr_number: Option<u64>,

    /// Repository as owner/name
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repo: Option<String>,

    /// Head commit SHA (commit-comment publishing when not in a PR)
    #[arg(long, env = "GITHUB_SHA")]
    pub sha: Option<String>,

    /// API token used for publishing
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub api_url: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    pub json: bool,
}

/// Validated run configuration, produced by the `initialize` stage.
#[derive(Debug, Clone)]
pub struct Options {
    pub working_directory: Option<PathBuf>,
    pub test_command: Option<String>,
    pub coverage_file: Option<PathBuf>,
    pub base_coverage_file: Option<PathBuf>,
    pub report_path: PathBuf,
    pub threshold: Option<String>,
    pub outputs: Vec<OutputKind>,
    pub annotations: AnnotationMode,
    pub skip_step: SkipStep,
    pub pr_number: Option<u64>,
    pub repo: Option<String>,
    pub sha: Option<String>,
    pub token: Option<String>,
    pub api_url: String,
}

impl Options {
    /// Validate the parsed command line into a usable configuration.
    pub fn resolve(cli: Cli) -> Result<Self, RunError> {
        if let Some(dir) = &cli.working_directory {
            if !dir.is_dir() {
                return Err(RunError::ConfigurationInvalid(format!(
                    "working directory {} does not exist",
                    dir.display()
                )));
            }
        }

        let mut outputs = cli.outputs;
        outputs.dedup();

        if outputs.contains(&OutputKind::Comment) {
            if cli.token.as_deref().unwrap_or("").is_empty() {
                return Err(RunError::ConfigurationInvalid(
                    "comment output requires a token (set GITHUB_TOKEN or --token)".to_string(),
                ));
            }
            if cli.repo.is_none() {
                return Err(RunError::ConfigurationInvalid(
                    "comment output requires a repository (set GITHUB_REPOSITORY or --repo)"
                        .to_string(),
                ));
            }
            if cli.pr_number.is_none() && cli.sha.is_none() {
                return Err(RunError::ConfigurationInvalid(
                    "comment output requires a PR number or a commit SHA".to_string(),
                ));
            }
        }

        Ok(Self {
            working_directory: cli.working_directory,
            test_command: cli.test_command,
            coverage_file: cli.coverage_file,
            base_coverage_file: cli.base_coverage_file,
            report_path: cli.report_path,
            threshold: cli.threshold,
            outputs,
            annotations: cli.annotations,
            skip_step: cli.skip_step,
            pr_number: cli.pr_number,
            repo: cli.repo,
            sha: cli.sha,
            token: cli.token,
            api_url: cli.api_url,
        })
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    /// The marker identity for published comments; distinguishes working
    /// directories in monorepo setups.
    pub fn marker_scope(&self) -> String {
        self.working_directory
            .as_ref()
            .map(|d| d.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string())
    }

    /// Build the publish client when repository identity is configured.
    pub fn github_client(&self) -> Option<GithubClient> {
        match (&self.repo, &self.token) {
            (Some(repo), Some(token)) => {
                Some(GithubClient::new(self.api_url.clone(), repo.clone(), token.clone()))
            }
            _ => None,
        }
    }

    /// Resolve the threshold option to the spec text to parse.
    ///
    /// Inline numbers and JSON pass straight through; anything else naming
    /// an existing file (relative to the working directory) is read from
    /// disk.
    pub fn threshold_spec_text(&self) -> Option<Result<String, RunError>> {
        let spec = self.threshold.as_deref()?;
        let trimmed = spec.trim();

        let inline = trimmed.parse::<f64>().is_ok() || trimmed.starts_with('{');
        if !inline {
            let candidate = match self.working_dir() {
                Some(dir) if Path::new(trimmed).is_relative() => dir.join(trimmed),
                _ => PathBuf::from(trimmed),
            };
            if candidate.is_file() {
                return Some(std::fs::read_to_string(&candidate).map_err(|e| {
                    RunError::ThresholdConfigInvalid(format!(
                        "{}: {}",
                        candidate.display(),
                        e
                    ))
                }));
            }
        }

        Some(Ok(spec.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn base_cli() -> Cli {
        Cli::parse_from(["covgate", "--output", "report-markdown"])
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_resolve_minimal() {
        let options = Options::resolve(base_cli()).expect("resolve failed");
        assert_eq!(options.outputs, vec![OutputKind::ReportMarkdown]);
        assert_eq!(options.skip_step, SkipStep::None);
    }

    #[test]
    fn test_comment_output_requires_token() {
        let cli = Cli::parse_from(["covgate", "--output", "comment", "--repo", "o/r", "--sha", "abc"]);
        let err = Options::resolve(Cli { token: None, ..cli }).unwrap_err();
        assert!(matches!(err, RunError::ConfigurationInvalid(_)));
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_comment_output_requires_identity() {
        let cli = Cli::parse_from(["covgate", "--output", "comment", "--repo", "o/r", "--token", "t"]);
        let err = Options::resolve(Cli { pr_number: None, sha: None, ..cli }).unwrap_err();
        assert!(err.to_string().contains("PR number or a commit SHA"));
    }

    #[test]
    fn test_missing_working_directory_rejected() {
        let mut cli = base_cli();
        cli.working_directory = Some(PathBuf::from("/nonexistent/covgate-wd"));
        let err = Options::resolve(cli).unwrap_err();
        assert!(matches!(err, RunError::ConfigurationInvalid(_)));
    }

    #[test]
    fn test_threshold_inline_number_passes_through() {
        let mut options = Options::resolve(base_cli()).expect("resolve failed");
        options.threshold = Some("80".to_string());
        let text = options.threshold_spec_text().expect("some").expect("ok");
        assert_eq!(text, "80");
    }

    #[test]
    fn test_threshold_file_is_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("coverage.thresholds.json"), r#"{ "global": { "lines": 75 } }"#)
            .expect("write spec");

        let mut options = Options::resolve(base_cli()).expect("resolve failed");
        options.working_directory = Some(dir.path().to_path_buf());
        options.threshold = Some("coverage.thresholds.json".to_string());

        let text = options.threshold_spec_text().expect("some").expect("ok");
        assert!(text.contains("\"lines\""));
    }
}
