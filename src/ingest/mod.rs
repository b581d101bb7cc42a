pub mod grouping;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::warn;
use serde_json::Value;

use crate::dates::parse_iso_datetime;
use crate::models::{Item, OpenState, SubItemSummary, TimelineEvent, TimelineEventKind};
use crate::settings::Settings;

/// Build the flat item map from a raw project payload. Malformed nodes are
/// skipped or degraded to defaults, never an error.
pub fn map_project_items(payload: &Value, settings: &Settings) -> BTreeMap<String, Item> {
    let mut items = BTreeMap::new();

    for node in extract_item_nodes(payload, settings) {
        let Some(content) = node.get("content") else {
            continue;
        };
        // Draft and redacted entries come through as null or `{}`.
        if !content.as_object().is_some_and(|map| !map.is_empty()) {
            continue;
        }

        let mut item = build_item(content);
        let field_values = node_entries(node.get("fieldValues"));
        enrich_from_field_values(&mut item, field_values, settings);

        if item.id.is_empty() {
            warn!("skipping item without an id: {:?}", item.title);
            continue;
        }
        if !passes_label_filter(&item.labels, settings)
            || !passes_issue_type_filter(item.issue_type.as_deref(), settings)
        {
            continue;
        }
        if item.closed && item.closed_at.is_none() && item.timeline.is_empty() {
            // Flag-only closure cannot be placed on any date; per-date checks
            // will keep treating this item as open.
            warn!("item {} is flagged closed but has no close date", item.id);
        }

        items.insert(item.id.clone(), item);
    }

    items
}

/// Construct one `Item` from a raw content record. Every field extraction
/// degrades to a safe default on missing or mistyped input.
pub fn build_item(content: &Value) -> Item {
    let state = OpenState::parse(content.get("state").and_then(Value::as_str).unwrap_or(""));
    let closed_at = datetime_field(content, "closedAt");
    // The flags are OR-ed rather than trusted individually.
    let closed = content.get("closed").and_then(Value::as_bool).unwrap_or(false)
        || state == OpenState::Closed
        || closed_at.is_some();

    let issue_type = match content.get("issueType") {
        Some(Value::Object(map)) => map.get("name").and_then(Value::as_str).map(str::to_owned),
        Some(Value::String(name)) => Some(name.clone()),
        _ => None,
    };

    let timeline = node_entries(content.get("timelineItems"))
        .iter()
        .filter_map(|event| {
            let type_name = event.get("__typename").and_then(Value::as_str)?;
            Some(TimelineEvent {
                kind: TimelineEventKind::parse(type_name)?,
                created_at: datetime_field(event, "createdAt"),
            })
        })
        .collect();

    let sub_item_summary = content
        .get("subIssuesSummary")
        .filter(|summary| summary.is_object())
        .map(|summary| SubItemSummary {
            total: coerce_f64(summary.get("total")) as i64,
            completed: coerce_f64(summary.get("completed")) as i64,
            percent_completed: coerce_f64(summary.get("percentCompleted")),
        });

    Item {
        id: str_field(content, "id"),
        title: str_field(content, "title"),
        state,
        created_at: datetime_field(content, "createdAt"),
        closed_at,
        closed,
        issue_type,
        parent_id: content
            .pointer("/parent/id")
            .and_then(Value::as_str)
            .map(str::to_owned),
        labels: extract_names(content.get("labels"), "name"),
        assignees: extract_names(content.get("assignees"), "login"),
        timeline,
        sub_item_summary,
        sub_item_ids: Vec::new(),
        milestone: None,
        sprint: None,
        estimation: None,
        status: None,
    }
}

/// Backfill sprint, estimation, status and milestone from the generic custom
/// field records attached to a project item. Field names are matched against
/// the configured ones; unmatched records are ignored.
pub fn enrich_from_field_values(item: &mut Item, records: &[Value], settings: &Settings) {
    for record in records {
        let Some(map) = record.as_object() else {
            continue;
        };

        let Some(name) = record.pointer("/field/name").and_then(Value::as_str) else {
            // Iteration values sometimes arrive without field metadata; the
            // title/startDate/duration shape identifies them anyway.
            if map.contains_key("title")
                && map.contains_key("startDate")
                && map.contains_key("duration")
            {
                if let Some(title) = map.get("title").and_then(Value::as_str) {
                    item.sprint = Some(title.to_owned());
                }
            }
            continue;
        };

        if name == settings.iteration_field {
            if let Some(title) = map.get("title").and_then(Value::as_str) {
                item.sprint = Some(title.to_owned());
            }
        } else if name == settings.estimate_field {
            if let Some(number) = map.get("number") {
                item.estimation = numeric_value(number);
            }
        } else if name == settings.status_field {
            if let Some(status) = map.get("name").and_then(Value::as_str) {
                item.status = Some(status.to_owned());
            }
        }

        if let Some(milestone) = record.pointer("/milestone/title").and_then(Value::as_str) {
            item.milestone = Some(milestone.to_owned());
        }
    }
}

/// Locate the item nodes across the payload root shapes: a bare `projectV2`
/// root, the configured owner-type root, then the common fallbacks.
fn extract_item_nodes<'a>(payload: &'a Value, settings: &Settings) -> &'a [Value] {
    if let Some(nodes) = payload
        .pointer("/projectV2/items/nodes")
        .and_then(Value::as_array)
    {
        return nodes;
    }

    let configured = settings.owner_type.as_str();
    for root in [configured, "organization", "user"] {
        if let Some(nodes) = payload
            .pointer(&format!("/{root}/projectV2/items/nodes"))
            .and_then(Value::as_array)
        {
            return nodes;
        }
    }

    &[]
}

/// Entries of a connection field that is either `{nodes: [...]}` or a bare
/// list.
fn node_entries(value: Option<&Value>) -> &[Value] {
    match value {
        Some(Value::Object(map)) => map
            .get("nodes")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        Some(Value::Array(list)) => list.as_slice(),
        _ => &[],
    }
}

/// Pull names out of label/assignee shaped values: `{nodes: [{name}]}`, a
/// list of objects, or a list of bare strings.
fn extract_names(value: Option<&Value>, key: &str) -> Vec<String> {
    node_entries(value)
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(map) => map.get(key).and_then(Value::as_str).map(str::to_owned),
            Value::String(name) => Some(name.clone()),
            _ => None,
        })
        .collect()
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_owned()
}

fn datetime_field(value: &Value, key: &str) -> Option<DateTime<Utc>> {
    value
        .get(key)
        .and_then(Value::as_str)
        .and_then(parse_iso_datetime)
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

/// Numeric coercion for summary counters: numbers pass through, numeric
/// strings parse, everything else is 0.
fn coerce_f64(value: Option<&Value>) -> f64 {
    value.and_then(numeric_value).unwrap_or(0.0)
}

fn passes_label_filter(labels: &[String], settings: &Settings) -> bool {
    if settings.label_include.is_empty() {
        return true;
    }
    labels
        .iter()
        .any(|label| settings.label_include.contains(&label.to_lowercase()))
}

fn passes_issue_type_filter(issue_type: Option<&str>, settings: &Settings) -> bool {
    if settings.issue_type_include.is_empty() {
        return true;
    }
    let name = issue_type.unwrap_or("").trim().to_lowercase();
    settings.issue_type_include.contains(&name)
}
