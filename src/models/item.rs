use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::normalize_to_midnight;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpenState {
    #[default]
    Open,
    Closed,
}

impl OpenState {
    /// Parse the remote state string, defaulting to `Open` on anything else.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("closed") {
            Self::Closed
        } else {
            Self::Open
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for OpenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    Closed,
    Reopened,
}

impl TimelineEventKind {
    /// Map a timeline `__typename` to an event kind. Other event types are
    /// not part of the close/reopen history and yield `None`.
    pub fn parse(type_name: &str) -> Option<Self> {
        match type_name {
            "ClosedEvent" => Some(Self::Closed),
            "ReopenedEvent" => Some(Self::Reopened),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub kind: TimelineEventKind,
    pub created_at: Option<DateTime<Utc>>,
}

/// Aggregate sub-item progress as reported by the source, when available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubItemSummary {
    pub total: i64,
    pub completed: i64,
    pub percent_completed: f64,
}

/// Normalized representation of one fetched project item. Built once at the
/// ingest boundary; the only post-construction mutation is the field-value
/// enrichment of `sprint`, `estimation`, `status` and `milestone`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub state: OpenState,
    pub created_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed: bool,
    pub issue_type: Option<String>,
    pub parent_id: Option<String>,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub timeline: Vec<TimelineEvent>,
    pub sub_item_summary: Option<SubItemSummary>,
    /// Ids of the tasks mapped under this item, recorded by the grouping pass.
    pub sub_item_ids: Vec<String>,
    pub milestone: Option<String>,
    pub sprint: Option<String>,
    pub estimation: Option<f64>,
    pub status: Option<String>,
}

impl Item {
    fn label_set(&self) -> HashSet<String> {
        self.labels.iter().map(|label| label.to_lowercase()).collect()
    }

    /// Whether this item is a story. Label checks take precedence over the
    /// type/parent and estimation fallbacks.
    pub fn is_story(&self) -> bool {
        let labels = self.label_set();
        if labels.contains("story") || labels.contains("user story") || labels.contains("feature") {
            return true;
        }
        if self.issue_type.as_deref() == Some("Feature") && self.parent_id.is_none() {
            return true;
        }
        self.estimation.is_some() && self.parent_id.is_none() && !labels.contains("task")
    }

    /// Whether this item is a task under some story.
    pub fn is_task(&self) -> bool {
        if self.label_set().contains("task") {
            return true;
        }
        self.issue_type.as_deref() == Some("Task") && self.parent_id.is_some()
    }

    /// Whether this item was closed as of midnight on the given date.
    ///
    /// The `closed` flag only reflects the current state, so the close/reopen
    /// history is replayed: the last event on or before the day wins, and a
    /// trailing reopen means the item still counted as open that day.
    pub fn is_closed_as_of(&self, date: DateTime<Utc>) -> bool {
        if !self.closed {
            return false;
        }
        let Some(closed_at) = self.closed_at else {
            return false;
        };

        let day = normalize_to_midnight(date);
        if normalize_to_midnight(closed_at) > day {
            return false;
        }

        let mut last_kind = None;
        for event in &self.timeline {
            let Some(at) = event.created_at else {
                continue;
            };
            if normalize_to_midnight(at) <= day {
                last_kind = Some(event.kind);
            }
        }

        last_kind != Some(TimelineEventKind::Reopened)
    }
}
