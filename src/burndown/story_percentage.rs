use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{EMPTY_TOTAL_SENTINEL, format_day};
use crate::ingest::grouping::StoryGroup;
use crate::models::{BurndownPoint, Item, PointDetails, StoryProgress};

/// One sprint story with its weight fixed for the whole run.
struct WeightedStory<'a> {
    story: &'a Item,
    tasks: &'a BTreeMap<String, Item>,
    /// The story's own estimation, or the sum of its tasks' estimations.
    estimation: f64,
    task_total_points: f64,
    /// Known task count: the source-reported total, else the mapped count.
    sub_task_count: i64,
}

/// Story-percentage burndown: each story burns `weight * percent complete`,
/// where completion comes from task points, then task counts, then the
/// story's own closed state.
pub fn calculate(
    groups: &BTreeMap<String, StoryGroup>,
    range: &[DateTime<Utc>],
    sprint: &str,
) -> Vec<BurndownPoint> {
    let mut stories = Vec::new();
    let mut total_points = 0.0;

    for group in groups.values() {
        if group.story.sprint.as_deref() != Some(sprint) {
            continue;
        }

        let task_total_points: f64 = group
            .tasks
            .values()
            .map(|task| task.estimation.unwrap_or(0.0))
            .sum();
        let estimation = group.story.estimation.unwrap_or(task_total_points);
        // Weightless stories cannot burn anything.
        if estimation == 0.0 {
            continue;
        }

        let sub_task_count = group
            .story
            .sub_item_summary
            .as_ref()
            .map(|summary| summary.total)
            .filter(|total| *total > 0)
            .unwrap_or(group.tasks.len() as i64);

        total_points += estimation;
        stories.push(WeightedStory {
            story: &group.story,
            tasks: &group.tasks,
            estimation,
            task_total_points,
            sub_task_count,
        });
    }

    let total_points = if total_points == 0.0 {
        EMPTY_TOTAL_SENTINEL
    } else {
        total_points
    };

    let mut series = Vec::with_capacity(range.len());
    for date in range {
        let mut remaining = total_points;
        let mut progress = Vec::with_capacity(stories.len());

        for entry in &stories {
            let mut completed_count = 0i64;
            let mut completed_points = 0.0;
            for task in entry.tasks.values() {
                if task.is_closed_as_of(*date) {
                    completed_count += 1;
                    completed_points += task.estimation.unwrap_or(0.0);
                }
            }

            let percent_complete = if entry.task_total_points > 0.0 {
                completed_points / entry.task_total_points * 100.0
            } else if entry.sub_task_count > 0 {
                completed_count as f64 / entry.sub_task_count as f64 * 100.0
            } else if entry.story.is_closed_as_of(*date) {
                100.0
            } else {
                0.0
            };

            let burned = entry.estimation * (percent_complete / 100.0);
            remaining -= burned;

            progress.push(StoryProgress {
                id: entry.story.id.clone(),
                title: entry.story.title.clone(),
                percent_complete,
                burned_points: burned,
                estimation: entry.estimation,
                completed_tasks: completed_count,
                total_tasks: entry.sub_task_count,
            });
        }

        series.push(BurndownPoint {
            date: format_day(*date),
            remaining_points: remaining.max(0.0),
            total_points,
            details: PointDetails::Stories { stories: progress },
        });
    }

    series
}
