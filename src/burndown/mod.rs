pub mod pipeline;
pub mod sprints;
pub mod story_percentage;
pub mod task_based;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::warn;

use crate::dates;
use crate::ingest::grouping::StoryGroup;
use crate::models::{Algorithm, BurndownPoint};
use crate::settings::Settings;

/// Placeholder total used when no included group carries any weight.
pub(crate) const EMPTY_TOTAL_SENTINEL: f64 = 100.0;

/// Resolve a `YYYY-MM-DD` range into the daily midnight sequence, falling
/// back to the last 30 days when either bound is unparseable.
pub fn resolve_range(start: &str, end: &str) -> Vec<DateTime<Utc>> {
    match (dates::parse_iso_datetime(start), dates::parse_iso_datetime(end)) {
        (Some(from), Some(to)) => dates::date_range(from, to),
        _ => {
            warn!("unusable date range {start:?}..{end:?}, falling back to the last 30 days");
            let (from, to) = dates::default_date_range();
            dates::date_range(from, to)
        }
    }
}

/// Compute one burndown series. An empty result means "no data", never an
/// error; callers must not treat it as a crash signal.
pub fn calculate_burndown(
    groups: &BTreeMap<String, StoryGroup>,
    algorithm: Algorithm,
    start: &str,
    end: &str,
    sprint: &str,
    settings: &Settings,
) -> Vec<BurndownPoint> {
    run(groups, algorithm, &resolve_range(start, end), sprint, settings)
}

/// Run one algorithm over an already-resolved date sequence.
pub fn run(
    groups: &BTreeMap<String, StoryGroup>,
    algorithm: Algorithm,
    range: &[DateTime<Utc>],
    sprint: &str,
    settings: &Settings,
) -> Vec<BurndownPoint> {
    match algorithm {
        Algorithm::StoryPercentage => story_percentage::calculate(groups, range, sprint),
        Algorithm::TaskBased => task_based::calculate(groups, range, sprint),
        Algorithm::PipelineBased => pipeline::calculate(groups, range, sprint, settings),
    }
}

pub(crate) fn format_day(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}
