use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Which accounting policy a burndown run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    StoryPercentage,
    TaskBased,
    PipelineBased,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StoryPercentage => "story-percentage",
            Self::TaskBased => "task-based",
            Self::PipelineBased => "pipeline-based",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "story-percentage" => Ok(Self::StoryPercentage),
            "task-based" => Ok(Self::TaskBased),
            "pipeline-based" => Ok(Self::PipelineBased),
            other => anyhow::bail!("invalid algorithm: {other}"),
        }
    }
}

/// One day of a burndown series.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurndownPoint {
    /// Calendar date as `YYYY-MM-DD`.
    pub date: String,
    pub remaining_points: f64,
    /// Fixed across the series; forced to 100 when no included group carries
    /// any weight, so a chart always has a scale.
    pub total_points: f64,
    #[serde(flatten)]
    pub details: PointDetails,
}

/// Algorithm-specific per-day breakdown for drill-down.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PointDetails {
    Stories {
        #[serde(rename = "completedStoriesInfo")]
        stories: Vec<StoryProgress>,
    },
    OpenTasks {
        #[serde(rename = "openTasksInfo")]
        open_tasks: Vec<OpenTaskDetail>,
    },
    Pipeline {
        #[serde(rename = "openTasksInfo")]
        open_tasks: Vec<PipelineTaskDetail>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryProgress {
    pub id: String,
    pub title: String,
    pub percent_complete: f64,
    pub burned_points: f64,
    pub estimation: f64,
    pub completed_tasks: i64,
    pub total_tasks: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTaskDetail {
    pub id: String,
    pub title: String,
    pub parent_id: String,
    pub parent_title: String,
    pub estimation: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTaskDetail {
    pub id: String,
    pub title: String,
    pub estimation: f64,
    pub status: String,
}
