//! covgate - coverage gate and report pipeline for CI
//!
//! Measures test coverage for a change, compares it against a base
//! revision and configured thresholds, publishes a Markdown report as a
//! PR or commit comment, and exits non-zero when any check or stage
//! failed.

use anyhow::Result;
use clap::Parser;
use covgate_cli::options::{Cli, Options};
use covgate_cli::pipeline;
use covgate_core::sink::ErrorSink;
use covgate_core::stage::{run_stage, StageFlow};
use covgate_github::PublishTarget;
use tracing::Level;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    covgate_core::init_tracing(cli.json, level);

    let sink = ErrorSink::new();

    // initialize is the only fatal stage: without a valid configuration no
    // later stage has a meaningful basis to run.
    let (initialized, options) = run_stage("initialize", &sink, || async {
        Options::resolve(cli).map(StageFlow::Done)
    })
    .await
    .parts();

    let Some(options) = options.filter(|_| initialized) else {
        anyhow::bail!("initialization failed");
    };

    let client = options.github_client();
    let publisher = client.as_ref().map(|c| c as &dyn PublishTarget);

    let outcome = pipeline::run(&options, &sink, publisher).await;

    // Print results
    for check in &outcome.checks {
        let status = if check.passed { "✓" } else { "✗" };
        println!(
            "  {} {} {} ({}: {} against {})",
            status,
            check.scope,
            check.metric,
            check.mode.name(),
            check.actual,
            check.bound
        );
    }

    let entries = sink.entries();
    if !entries.is_empty() {
        println!();
        for entry in &entries {
            println!("  [{}] {}", entry.stage, entry.error);
        }
    }

    if sink.has_errors() || !outcome.checks_passed {
        anyhow::bail!("coverage checks failed")
    }

    println!("\n✓ All coverage checks passed");
    Ok(())
}
