use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{EMPTY_TOTAL_SENTINEL, format_day};
use crate::dates::normalize_to_midnight;
use crate::ingest::grouping::StoryGroup;
use crate::models::{BurndownPoint, Item, OpenTaskDetail, PointDetails};

struct TrackedTask<'a> {
    task: &'a Item,
    parent_id: &'a str,
    parent_title: &'a str,
    /// The task's own estimation, or its even share of the story estimation.
    estimation: f64,
}

/// Task-based burndown: every task contributes its estimation while it is
/// created and still open on a given day. The total is fixed up front.
pub fn calculate(
    groups: &BTreeMap<String, StoryGroup>,
    range: &[DateTime<Utc>],
    sprint: &str,
) -> Vec<BurndownPoint> {
    let mut tasks: BTreeMap<&String, TrackedTask> = BTreeMap::new();
    let mut total_points = 0.0;

    for (story_id, group) in groups {
        if group.story.sprint.as_deref() != Some(sprint) {
            continue;
        }

        let story_estimation = group.story.estimation.unwrap_or(0.0);
        let points_per_task = if group.tasks.is_empty() {
            0.0
        } else {
            // Unestimated tasks split the story estimation evenly, decided
            // once at collection time rather than per date.
            story_estimation / group.tasks.len() as f64
        };

        for (task_id, task) in &group.tasks {
            let estimation = task.estimation.unwrap_or(points_per_task);
            total_points += estimation;
            tasks.insert(
                task_id,
                TrackedTask {
                    task,
                    parent_id: story_id,
                    parent_title: &group.story.title,
                    estimation,
                },
            );
        }
    }

    let total_points = if total_points == 0.0 {
        EMPTY_TOTAL_SENTINEL
    } else {
        total_points
    };

    let mut series = Vec::with_capacity(range.len());
    for date in range {
        let mut remaining = 0.0;
        let mut open_tasks = Vec::new();

        for (task_id, entry) in &tasks {
            let created = entry
                .task
                .created_at
                .is_none_or(|at| normalize_to_midnight(at) <= *date);
            if created && !entry.task.is_closed_as_of(*date) {
                remaining += entry.estimation;
                open_tasks.push(OpenTaskDetail {
                    id: (*task_id).clone(),
                    title: entry.task.title.clone(),
                    parent_id: entry.parent_id.to_owned(),
                    parent_title: entry.parent_title.to_owned(),
                    estimation: entry.estimation,
                });
            }
        }

        series.push(BurndownPoint {
            date: format_day(*date),
            remaining_points: remaining,
            total_points,
            details: PointDetails::OpenTasks { open_tasks },
        });
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{date_range, parse_iso_datetime};
    use crate::ingest::grouping::map_stories_to_tasks;

    fn day(value: &str) -> DateTime<Utc> {
        parse_iso_datetime(value).unwrap()
    }

    fn range(start: &str, end: &str) -> Vec<DateTime<Utc>> {
        date_range(day(start), day(end))
    }

    fn story(id: &str, estimation: Option<f64>) -> Item {
        Item {
            id: id.to_owned(),
            title: format!("story {id}"),
            labels: vec!["story".to_owned()],
            sprint: Some("S1".to_owned()),
            estimation,
            created_at: parse_iso_datetime("2023-12-01T00:00:00Z"),
            ..Item::default()
        }
    }

    fn task(id: &str, parent: &str, estimation: Option<f64>, closed_at: Option<&str>) -> Item {
        Item {
            id: id.to_owned(),
            title: format!("task {id}"),
            labels: vec!["task".to_owned()],
            parent_id: Some(parent.to_owned()),
            estimation,
            created_at: parse_iso_datetime("2023-12-01T00:00:00Z"),
            closed: closed_at.is_some(),
            closed_at: closed_at.and_then(parse_iso_datetime),
            ..Item::default()
        }
    }

    fn groups_of(items: Vec<Item>) -> BTreeMap<String, StoryGroup> {
        let map: BTreeMap<String, Item> =
            items.into_iter().map(|i| (i.id.clone(), i)).collect();
        map_stories_to_tasks(&map)
    }

    #[test]
    fn test_two_task_sprint_scenario() {
        // One 10-point story, two 5-point tasks closing on day 2 and day 5.
        let groups = groups_of(vec![
            story("s1", Some(10.0)),
            task("t1", "s1", Some(5.0), Some("2024-01-02T14:00:00Z")),
            task("t2", "s1", Some(5.0), Some("2024-01-05T09:00:00Z")),
        ]);

        let series = calculate(&groups, &range("2024-01-01", "2024-01-05"), "S1");
        let remaining: Vec<f64> = series.iter().map(|p| p.remaining_points).collect();
        assert_eq!(remaining, vec![10.0, 5.0, 5.0, 5.0, 0.0]);
        assert!(series.iter().all(|p| p.total_points == 10.0));
    }

    #[test]
    fn test_total_is_date_invariant() {
        let groups = groups_of(vec![
            story("s1", Some(9.0)),
            task("t1", "s1", Some(2.0), Some("2024-01-01T00:00:00Z")),
            task("t2", "s1", Some(4.0), None),
        ]);

        let series = calculate(&groups, &range("2024-01-01", "2024-01-10"), "S1");
        assert!(series.iter().all(|p| p.total_points == 6.0));
    }

    #[test]
    fn test_unestimated_tasks_split_story_points() {
        let groups = groups_of(vec![
            story("s1", Some(9.0)),
            task("t1", "s1", None, None),
            task("t2", "s1", None, None),
            task("t3", "s1", Some(1.0), None),
        ]);

        let series = calculate(&groups, &range("2024-01-01", "2024-01-01"), "S1");
        // Two tasks inherit 3 points each, the third keeps its own 1.
        assert_eq!(series[0].total_points, 7.0);
        assert_eq!(series[0].remaining_points, 7.0);
    }

    #[test]
    fn test_task_not_yet_created_does_not_count() {
        let mut late = task("t1", "s1", Some(5.0), None);
        late.created_at = parse_iso_datetime("2024-01-03T11:00:00Z");
        let groups = groups_of(vec![story("s1", Some(5.0)), late]);

        let series = calculate(&groups, &range("2024-01-01", "2024-01-04"), "S1");
        let remaining: Vec<f64> = series.iter().map(|p| p.remaining_points).collect();
        assert_eq!(remaining, vec![0.0, 0.0, 5.0, 5.0]);
        // The total still counts it from the start.
        assert!(series.iter().all(|p| p.total_points == 5.0));
    }

    #[test]
    fn test_reopened_task_counts_as_open_again() {
        let mut t = task("t1", "s1", Some(5.0), Some("2024-01-02T10:00:00Z"));
        t.timeline = vec![
            crate::models::TimelineEvent {
                kind: crate::models::TimelineEventKind::Closed,
                created_at: parse_iso_datetime("2024-01-02T10:00:00Z"),
            },
            crate::models::TimelineEvent {
                kind: crate::models::TimelineEventKind::Reopened,
                created_at: parse_iso_datetime("2024-01-04T08:00:00Z"),
            },
        ];
        let groups = groups_of(vec![story("s1", Some(5.0)), t]);

        let series = calculate(&groups, &range("2024-01-01", "2024-01-05"), "S1");
        let remaining: Vec<f64> = series.iter().map(|p| p.remaining_points).collect();
        assert_eq!(remaining, vec![5.0, 0.0, 0.0, 5.0, 5.0]);
    }

    #[test]
    fn test_orphan_task_flows_through_as_pseudo_story() {
        let mut orphan = task("t1", "gone", Some(4.0), None);
        orphan.sprint = Some("S1".to_owned());
        let groups = groups_of(vec![orphan]);

        let series = calculate(&groups, &range("2024-01-01", "2024-01-01"), "S1");
        assert_eq!(series[0].total_points, 4.0);
        assert_eq!(series[0].remaining_points, 4.0);
        match &series[0].details {
            PointDetails::OpenTasks { open_tasks } => {
                assert_eq!(open_tasks[0].parent_id, "t1");
            }
            _ => panic!("wrong detail shape"),
        }
    }

    #[test]
    fn test_open_task_details_list_open_tasks_only() {
        let groups = groups_of(vec![
            story("s1", Some(10.0)),
            task("t1", "s1", Some(5.0), Some("2024-01-01T00:00:00Z")),
            task("t2", "s1", Some(5.0), None),
        ]);

        let series = calculate(&groups, &range("2024-01-02", "2024-01-02"), "S1");
        match &series[0].details {
            PointDetails::OpenTasks { open_tasks } => {
                assert_eq!(open_tasks.len(), 1);
                assert_eq!(open_tasks[0].id, "t2");
                assert_eq!(open_tasks[0].parent_title, "story s1");
            }
            _ => panic!("wrong detail shape"),
        }
    }

    #[test]
    fn test_zero_weight_sprint_uses_sentinel() {
        let groups = groups_of(vec![story("s1", None), task("t1", "s1", None, None)]);

        let series = calculate(&groups, &range("2024-01-01", "2024-01-01"), "S1");
        assert_eq!(series[0].total_points, 100.0);
        assert_eq!(series[0].remaining_points, 0.0);
    }
}
