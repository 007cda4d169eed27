//! A tool to collect GitHub repository activity and turn it into daily time series.
//!
//! # Overview
//!
//! `repo-pulse` builds per-repository activity data sets from the GitHub API.
//! It runs as a three-stage pipeline, each stage a subcommand reading the
//! previous stage's output from disk:
//!
//! 1. `fetch` collects raw per-event data (commits, issues and pull requests,
//!    forks, stargazers, watchers, contributors) plus a repository metadata
//!    snapshot, one CSV file per feature per repository.
//! 2. `process` transforms the raw event files into daily time series and
//!    outer-joins them into one combined table per repository.
//! 3. `aggregate` gathers every repository's metadata snapshot into a single
//!    cross-repository table and derives each repository's age in weeks.
//!
//! # Quick Start
//!
//! ```bash
//! repo-pulse init --write-config repo-pulse.yml
//! # edit repo-pulse.yml: list repositories under repos.fetch
//! repo-pulse fetch
//! repo-pulse process
//! repo-pulse aggregate
//! ```
//!
//! # Fetching
//!
//! **Fetch the configured repositories:**
//! ```bash
//! repo-pulse fetch
//! ```
//!
//! **Fetch specific repositories directly:**
//! ```bash
//! repo-pulse fetch --repo rust-lang/rust --repo tokio-rs/tokio
//! ```
//!
//! Fetching is resumable: a feature whose CSV file already exists is skipped,
//! so re-running after an interruption or a partial failure only fetches what
//! is missing. Delete a repository's files to force a fresh collection.
//!
//! # GitHub API Rate Limiting
//!
//! The public (unauthenticated) GitHub API allows only 60 requests per hour.
//! Provide a personal access token via the `GITHUB_TOKEN` environment
//! variable or `--github-token` to raise that to 5000 per hour.
//!
//! Authenticated runs watch the remaining quota and pause until the rate
//! window resets whenever it runs low, so large repositories can be
//! collected unattended.
//!
//! # Configuration
//!
//! Settings are read from `repo-pulse.[toml|yml|yaml|json]` in the current
//! directory, or a file named with `--config`. Built-in defaults apply when
//! no file exists; `init --write-config` writes them out as a starting
//! point. The configuration covers output directories, per-feature file
//! names, and the repository list.
//!
//! # Outputs
//!
//! - `data/raw/<repo>/*.csv`: one file per feature, one row per event.
//! - `data/processed/<repo>/*.csv`: daily counts per feature, plus
//!   `all_feature.csv` joining them on the date index.
//! - `data/processed/generic_repos_data.csv`: one metadata row per
//!   repository, including the derived `age_in_weeks` column.
//! - `data/final/all_repos_data.csv`: the published copy of the final table.

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};
use repo_pulse::Result;

mod commands;

use crate::commands::{AggregateArgs, FetchArgs, InitArgs, ProcessArgs, aggregate_data, fetch_repos, init_workspace, process_data};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "repo-pulse", version, about)]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: PipelineCommand,
}

#[derive(Subcommand, Debug)]
enum PipelineCommand {
    /// Collect raw repository activity data from the GitHub API
    Fetch(Box<FetchArgs>),
    /// Transform raw activity data into daily time series
    Process(ProcessArgs),
    /// Build the cross-repository metadata table with derived ages
    Aggregate(AggregateArgs),
    /// Create the data directories and optionally a default configuration file
    Init(InitArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        PipelineCommand::Fetch(fetch_args) => fetch_repos(fetch_args).await,
        PipelineCommand::Process(process_args) => process_data(process_args),
        PipelineCommand::Aggregate(aggregate_args) => aggregate_data(aggregate_args),
        PipelineCommand::Init(init_args) => init_workspace(init_args),
    }
}
