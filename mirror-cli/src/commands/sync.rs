//! `mirror sync`: make the bucket mirror the local tree.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use mirror_sync::{pipeline, Action, OutcomeStatus, SyncReport, TracingReporter};

use super::shared::{ConfigArgs, Session};

/// Arguments for `mirror sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub common: ConfigArgs,

    /// Retry a failed upload or delete up to N more times [default: 0].
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Delay before the first retry; doubles on each further retry.
    #[arg(long, value_name = "MS")]
    pub retry_delay_ms: Option<u64>,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let mut overrides = self.common.overrides();
        overrides.max_attempts = self.retries.map(|n| n.saturating_add(1));
        overrides.initial_backoff_ms = self.retry_delay_ms;

        let config = self.common.resolve(overrides)?;
        let session = Session::open(config)?;
        tracing::info!(
            bucket = %session.target.bucket,
            root = %session.target.local_root.display(),
            "starting sync"
        );

        let report = pipeline::run(
            &session.store,
            &session.target,
            &session.options,
            &mut TracingReporter,
        )
        .with_context(|| format!("sync into '{}' failed", session.target.bucket))?;

        if self.common.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report JSON")?
            );
        } else {
            print_report(&report);
        }

        if !report.is_success() {
            bail!("{} of {} actions failed", report.failed(), report.outcomes.len());
        }
        Ok(())
    }
}

fn print_report(report: &SyncReport) {
    let headline = format!(
        "'{}' synced from {} ({} uploaded, {} deleted, {} unchanged, {} failed)",
        report.bucket,
        report.local_root.display(),
        report.uploaded(),
        report.deleted(),
        report.skipped(),
        report.failed(),
    );
    if report.is_success() {
        println!("{} {headline}", "✓".green().bold());
    } else {
        println!("{} {headline}", "✗".red().bold());
    }

    for outcome in &report.outcomes {
        let action = &outcome.action;
        match (&outcome.status, action) {
            (OutcomeStatus::Succeeded, Action::Upload { .. }) => {
                println!("  ✎  {} ({})", action.key(), action.reason())
            }
            (OutcomeStatus::Succeeded, _) => println!("  -  {}", action.key()),
            (OutcomeStatus::Skipped, _) => {
                println!("  ·  {} ({})", action.key(), action.reason())
            }
            (OutcomeStatus::Failed { reason }, _) => println!(
                "  {}  {} {}: {}",
                "✗".red(),
                action.kind(),
                action.key(),
                reason
            ),
        }
    }

    let elapsed = report.finished_at - report.started_at;
    println!("took {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
}
