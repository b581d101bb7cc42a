use std::collections::{BTreeMap, BTreeSet};

use crate::ingest::grouping::StoryGroup;

/// Distinct sprint labels across all stories and their tasks, numeric-aware
/// sorted. Returns the configured placeholder when the data carries none.
pub fn available_sprints(groups: &BTreeMap<String, StoryGroup>, default_sprint: &str) -> Vec<String> {
    let mut labels: BTreeSet<String> = BTreeSet::new();

    for group in groups.values() {
        collect_label(&mut labels, group.story.sprint.as_deref());
        for task in group.tasks.values() {
            collect_label(&mut labels, task.sprint.as_deref());
        }
    }

    if labels.is_empty() {
        return vec![default_sprint.to_owned()];
    }

    let mut sorted: Vec<String> = labels.into_iter().collect();
    sort_numeric_aware(&mut sorted);
    sorted
}

fn collect_label(labels: &mut BTreeSet<String>, sprint: Option<&str>) {
    if let Some(label) = sprint {
        if !label.is_empty() {
            labels.insert(label.to_owned());
        }
    }
}

/// "Sprint 10" belongs after "Sprint 2". The numeric order is only total when
/// every label carries an integer token; otherwise compare as plain text.
fn sort_numeric_aware(labels: &mut [String]) {
    if labels.iter().all(|label| numeric_token(label).is_some()) {
        labels.sort_by_key(|label| (numeric_token(label), label.clone()));
    } else {
        labels.sort();
    }
}

fn numeric_token(label: &str) -> Option<i64> {
    label
        .split_whitespace()
        .find_map(|token| token.parse().ok())
}
