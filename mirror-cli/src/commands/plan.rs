//! `mirror plan`: compute and print the action plan without executing it.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use mirror_core::{BucketName, RemoteTimestamp};
use mirror_sync::{
    pipeline::{self, PlannedSync},
    staleness::format_datetime_age,
    Action, ActionPlan, PlanSummary,
};

use super::shared::{ConfigArgs, Session};

/// Arguments for `mirror plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub common: ConfigArgs,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let config = self.common.resolve(self.common.overrides())?;
        let session = Session::open(config)?;
        let planned = pipeline::plan(&session.store, &session.target, &session.options)
            .context("planning failed")?;

        if self.common.json {
            print_json(&session.config.bucket, &planned)
        } else {
            print_table(&session.config.bucket, &planned);
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct PlanJson<'a> {
    bucket: &'a BucketName,
    generated_at: DateTime<Utc>,
    summary: PlanSummary,
    actions: &'a ActionPlan,
}

#[derive(Tabled)]
struct PlanTableRow {
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "key")]
    key: String,
    #[tabled(rename = "reason")]
    reason: String,
    #[tabled(rename = "local age")]
    local_age: String,
    #[tabled(rename = "remote age")]
    remote_age: String,
}

fn print_json(bucket: &BucketName, planned: &PlannedSync) -> Result<()> {
    let payload = PlanJson {
        bucket,
        generated_at: Utc::now(),
        summary: planned.plan.summary(),
        actions: &planned.plan,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize plan JSON")?
    );
    Ok(())
}

fn print_table(bucket: &BucketName, planned: &PlannedSync) {
    let summary = planned.plan.summary();
    println!(
        "Plan for '{}' from {} | {} upload | {} delete | {} skip",
        bucket,
        planned.inventory.root.display(),
        summary.uploads,
        summary.deletes,
        summary.skips,
    );

    if planned.plan.is_empty() {
        println!("Nothing to mirror: local tree and bucket are both empty.");
        return;
    }

    let rows: Vec<PlanTableRow> = planned.plan.iter().map(|a| table_row(a, planned)).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if planned.plan.is_noop() {
        println!("{}", "✓ bucket is up to date".green());
    } else {
        println!("Run 'mirror sync' to apply.");
    }
}

fn table_row(action: &Action, planned: &PlannedSync) -> PlanTableRow {
    let key = action.key();
    let local_age = planned
        .inventory
        .get(key)
        .map(|entry| format_datetime_age(entry.modified))
        .unwrap_or_else(|| "-".to_string());
    let remote_age = match planned.remote_timestamp(key) {
        Some(RemoteTimestamp::At(at)) => format_datetime_age(at),
        Some(RemoteTimestamp::Unknown) => "unknown".to_string(),
        None => "-".to_string(),
    };
    PlanTableRow {
        action: action_label(action),
        key: key.to_string(),
        reason: action.reason(),
        local_age,
        remote_age,
    }
}

fn action_label(action: &Action) -> String {
    match action {
        Action::Upload { .. } => "UPLOAD".green().bold().to_string(),
        Action::Delete { .. } => "DELETE".red().bold().to_string(),
        Action::Skip { .. } => "SKIP".bright_black().to_string(),
    }
}
