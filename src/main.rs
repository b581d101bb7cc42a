mod burndown;
mod dates;
mod github;
mod ingest;
mod models;
mod report;
mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::warn;
use serde_json::Value;

use crate::github::GithubClient;
use crate::models::Algorithm;
use crate::report::Report;
use crate::settings::Settings;

const DEFAULT_SNAPSHOT: &str = "project_data.json";

#[derive(Parser)]
#[command(name = "burndown", about = "Sprint burndown generator for GitHub Projects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch project items and save a raw snapshot
    Fetch {
        /// Snapshot file to write
        #[arg(long, default_value = DEFAULT_SNAPSHOT)]
        output: PathBuf,
    },
    /// List the sprints present in the project data
    Sprints {
        /// Read items from a snapshot file instead of the API
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Compute a burndown series
    Report {
        /// Read items from a snapshot file instead of the API
        #[arg(long)]
        input: Option<PathBuf>,
        /// Where to write the JSON report (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
        /// story-percentage, task-based or pipeline-based
        #[arg(long, default_value = "task-based")]
        algorithm: String,
        /// Sprint to report on (defaults to the first discovered sprint)
        #[arg(long)]
        sprint: Option<String>,
        /// Range start as YYYY-MM-DD (defaults to 30 days ago)
        #[arg(long)]
        start: Option<String>,
        /// Range end as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        end: Option<String>,
        /// Skip Saturdays and Sundays in the date range
        #[arg(long)]
        weekdays_only: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let settings = Settings::from_env();

    match cli.command {
        Commands::Fetch { output } => {
            let client = GithubClient::new(&settings)?;
            let payload = client.fetch_project_items(&settings).await?;
            github::save_snapshot(&output, &payload)?;
            println!("Snapshot saved to {}", output.display());
        }
        Commands::Sprints { input } => {
            let payload = load_payload(input.as_deref(), &settings).await?;
            let items = ingest::map_project_items(&payload, &settings);
            let groups = ingest::grouping::map_stories_to_tasks(&items);
            for sprint in burndown::sprints::available_sprints(&groups, &settings.default_sprint) {
                println!("{sprint}");
            }
        }
        Commands::Report {
            input,
            output,
            algorithm,
            sprint,
            start,
            end,
            weekdays_only,
        } => {
            let algorithm: Algorithm = algorithm.parse()?;
            let payload = load_payload(input.as_deref(), &settings).await?;
            let items = ingest::map_project_items(&payload, &settings);
            let groups = ingest::grouping::map_stories_to_tasks(&items);

            let available = burndown::sprints::available_sprints(&groups, &settings.default_sprint);
            let sprint = match sprint {
                Some(sprint) => sprint,
                None => available
                    .first()
                    .cloned()
                    .unwrap_or_else(|| settings.default_sprint.clone()),
            };

            let (start, end) = resolve_bounds(start, end);
            let points = if weekdays_only {
                let mut range = burndown::resolve_range(&start, &end);
                range.retain(|day| !dates::is_weekend(*day));
                burndown::run(&groups, algorithm, &range, &sprint, &settings)
            } else {
                burndown::calculate_burndown(&groups, algorithm, &start, &end, &sprint, &settings)
            };
            let report = Report {
                sprint,
                algorithm: algorithm.to_string(),
                start_date: start,
                end_date: end,
                available_sprints: available,
                points,
            };

            match output {
                Some(path) => {
                    report::write_report(&path, &report)?;
                    println!("Report written to {}", path.display());
                }
                None => println!("{}", report::render_report(&report)?),
            }
        }
    }

    Ok(())
}

/// Explicit bounds when both are given, otherwise the last 30 days.
fn resolve_bounds(start: Option<String>, end: Option<String>) -> (String, String) {
    match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (start, end) => {
            let (default_start, default_end) = dates::default_date_range();
            (
                start.unwrap_or_else(|| default_start.format("%Y-%m-%d").to_string()),
                end.unwrap_or_else(|| default_end.format("%Y-%m-%d").to_string()),
            )
        }
    }
}

/// Read a snapshot when one is given; otherwise fetch live, falling back to
/// the default snapshot if the fetch cannot be made.
async fn load_payload(input: Option<&Path>, settings: &Settings) -> Result<Value> {
    if let Some(path) = input {
        return github::load_snapshot(path);
    }

    let fetched = match GithubClient::new(settings) {
        Ok(client) => client.fetch_project_items(settings).await,
        Err(error) => Err(error),
    };

    match fetched {
        Ok(payload) => Ok(payload),
        Err(error) => {
            warn!("live fetch failed ({error:#}), trying {DEFAULT_SNAPSHOT}");
            github::load_snapshot(Path::new(DEFAULT_SNAPSHOT))
                .context("live fetch failed and no local snapshot is available")
        }
    }
}
