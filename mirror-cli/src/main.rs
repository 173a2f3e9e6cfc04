//! Mirror: one-way sync of a local directory tree into an S3 bucket.
//!
//! # Usage
//!
//! ```text
//! mirror plan [--config <path>] [--endpoint-url <url>] [--bucket-name <name>]
//!             [--local-path <dir>] [--create-bucket] [--region <region>]
//!             [--ext <ext>]... [--json]
//! mirror sync [same flags] [--retries <n>] [--retry-delay-ms <ms>]
//! ```
//!
//! Credentials come from `S3_ACCESS_KEY` and `S3_SECRET_KEY`. Set `RUST_LOG`
//! to change log verbosity (default `info`, written to stderr).

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{plan::PlanArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "mirror",
    version,
    about = "Mirror a local directory tree into an S3-compatible bucket",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload new and changed files, delete objects with no local counterpart.
    Sync(SyncArgs),

    /// Show what `sync` would do without changing any object.
    Plan(PlanArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Plan(args) => args.run(),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
