use std::collections::{BTreeMap, BTreeSet};

use crate::models::Item;

/// A story together with the tasks mapped under it. Pseudo-stories built from
/// orphan tasks hold themselves as their only task.
#[derive(Debug, Clone)]
pub struct StoryGroup {
    pub story: Item,
    pub tasks: BTreeMap<String, Item>,
}

impl StoryGroup {
    fn new(story: &Item) -> Self {
        Self {
            story: story.clone(),
            tasks: BTreeMap::new(),
        }
    }
}

/// Group the flat item map into story -> tasks collections.
///
/// Tasks whose parent id matches no known story become their own singleton
/// group, so every task is reachable by at least one group. Items that are
/// neither story nor task stay out of the grouping. The input map is not
/// mutated; groups own clones.
pub fn map_stories_to_tasks(items: &BTreeMap<String, Item>) -> BTreeMap<String, StoryGroup> {
    let mut groups: BTreeMap<String, StoryGroup> = BTreeMap::new();

    for (id, item) in items {
        if item.is_story() {
            groups.insert(id.clone(), StoryGroup::new(item));
        }
    }

    let mut mapped: BTreeSet<&String> = BTreeSet::new();
    for (id, item) in items {
        if !item.is_task() {
            continue;
        }
        let Some(parent_id) = item.parent_id.as_ref() else {
            continue;
        };
        if let Some(group) = groups.get_mut(parent_id) {
            group.tasks.insert(id.clone(), item.clone());
            group.story.sub_item_ids.push(id.clone());
            mapped.insert(id);
        }
    }

    for (id, item) in items {
        if !item.is_task() || mapped.contains(id) {
            continue;
        }
        let group = groups
            .entry(id.clone())
            .or_insert_with(|| StoryGroup::new(item));
        group.tasks.insert(id.clone(), item.clone());
    }

    groups
}
