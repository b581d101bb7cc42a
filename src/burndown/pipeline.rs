use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{EMPTY_TOTAL_SENTINEL, format_day};
use crate::ingest::grouping::StoryGroup;
use crate::models::{BurndownPoint, Item, PipelineTaskDetail, PointDetails};
use crate::settings::Settings;

struct TrackedItem<'a> {
    item: &'a Item,
    estimation: f64,
    /// Normalized workflow column, treated as date-invariant.
    status: String,
}

/// Pipeline-based burndown: an item burns by its workflow column's configured
/// weight until it closes, after which it counts as fully done. Items without
/// an estimation are excluded entirely.
pub fn calculate(
    groups: &BTreeMap<String, StoryGroup>,
    range: &[DateTime<Utc>],
    sprint: &str,
    settings: &Settings,
) -> Vec<BurndownPoint> {
    let mut tracked: BTreeMap<&String, TrackedItem> = BTreeMap::new();
    let mut total_points = 0.0;

    for (story_id, group) in groups {
        if group.story.sprint.as_deref() != Some(sprint) {
            continue;
        }

        // A story without mapped tasks is tracked as a single task itself.
        let members: Vec<(&String, &Item)> = if group.tasks.is_empty() {
            vec![(story_id, &group.story)]
        } else {
            group.tasks.iter().collect()
        };

        for (id, item) in members {
            let estimation = item.estimation.unwrap_or(0.0);
            if estimation == 0.0 {
                continue;
            }
            let status = item
                .status
                .as_deref()
                .unwrap_or("")
                .trim()
                .to_lowercase();
            total_points += estimation;
            tracked.insert(id, TrackedItem { item, estimation, status });
        }
    }

    let total_points = if total_points == 0.0 {
        EMPTY_TOTAL_SENTINEL
    } else {
        total_points
    };

    let mut series = Vec::with_capacity(range.len());
    for date in range {
        let mut remaining_points = 0.0;
        let mut open_tasks = Vec::new();

        for (id, entry) in &tracked {
            let weight = if entry.item.is_closed_as_of(*date) {
                1.0
            } else {
                settings.pipeline_weight(&entry.status)
            };
            let remaining = entry.estimation - entry.estimation * weight;
            remaining_points += remaining.max(0.0);

            if remaining > 0.0 {
                open_tasks.push(PipelineTaskDetail {
                    id: (*id).clone(),
                    title: entry.item.title.clone(),
                    estimation: entry.estimation,
                    status: entry.status.clone(),
                });
            }
        }

        series.push(BurndownPoint {
            date: format_day(*date),
            remaining_points,
            total_points,
            details: PointDetails::Pipeline { open_tasks },
        });
    }

    series
}
