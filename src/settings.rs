use std::env;
use std::fmt;

use log::warn;

pub const GRAPHQL_API_URL: &str = "https://api.github.com/graphql";

/// Board columns used when no custom pipeline is configured.
const DEFAULT_PIPELINE: [(&str, f64); 4] = [
    ("Backlog", 0.0),
    ("In Progress", 0.33),
    ("To be reviewed", 0.67),
    ("Done", 1.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerType {
    User,
    Organization,
}

impl OwnerType {
    /// Defaults to `User` on anything that is not "organization".
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("organization") {
            Self::Organization
        } else {
            Self::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Organization => "organization",
        }
    }
}

impl fmt::Display for OwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration value object built once at startup and passed by parameter.
/// Nothing below the CLI reads the environment directly.
#[derive(Debug, Clone)]
pub struct Settings {
    pub token: String,
    pub owner: String,
    pub owner_type: OwnerType,
    pub project_number: u32,
    pub graphql_url: String,
    /// Custom field carrying the sprint/iteration of an item.
    pub iteration_field: String,
    /// Custom field carrying the point estimation of an item.
    pub estimate_field: String,
    /// Custom field carrying the workflow column of an item.
    pub status_field: String,
    /// Placeholder sprint label when the data carries none.
    pub default_sprint: String,
    /// Ordered (status name, completion weight) table for the pipeline
    /// algorithm.
    pub pipeline: Vec<(String, f64)>,
    /// Lowercased label include-list; empty disables label filtering.
    pub label_include: Vec<String>,
    /// Lowercased issue-type include-list; empty disables type filtering.
    pub issue_type_include: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: String::new(),
            owner: String::new(),
            owner_type: OwnerType::User,
            project_number: 1,
            graphql_url: GRAPHQL_API_URL.to_owned(),
            iteration_field: "Sprint #".to_owned(),
            estimate_field: "Story Points".to_owned(),
            status_field: "Status".to_owned(),
            default_sprint: "N/A".to_owned(),
            pipeline: default_pipeline(),
            label_include: Vec::new(),
            issue_type_include: Vec::new(),
        }
    }
}

impl Settings {
    /// Build settings from `GITHUB_*` environment variables, falling back to
    /// defaults for anything missing or malformed.
    pub fn from_env() -> Self {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    fn from_lookup(get: &dyn Fn(&str) -> Option<String>) -> Self {
        let defaults = Settings::default();

        let project_number = match get("GITHUB_PROJECT_NUMBER") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("GITHUB_PROJECT_NUMBER is not a number, using {}", defaults.project_number);
                defaults.project_number
            }),
            None => defaults.project_number,
        };

        let pipeline = match get("GITHUB_STATUS_PIPELINE") {
            Some(raw) => parse_pipeline(&raw).unwrap_or_else(|| {
                warn!("could not parse GITHUB_STATUS_PIPELINE, using the default pipeline");
                defaults.pipeline.clone()
            }),
            None => defaults.pipeline.clone(),
        };

        Self {
            token: get("GITHUB_API_TOKEN").unwrap_or(defaults.token),
            owner: get("GITHUB_PROJECT_OWNER").unwrap_or(defaults.owner),
            owner_type: get("GITHUB_OWNER_TYPE")
                .map(|raw| OwnerType::parse(&raw))
                .unwrap_or(defaults.owner_type),
            project_number,
            graphql_url: get("GITHUB_GRAPHQL_URL").unwrap_or(defaults.graphql_url),
            iteration_field: get("GITHUB_FIELD_ITERATION").unwrap_or(defaults.iteration_field),
            estimate_field: get("GITHUB_FIELD_ESTIMATE").unwrap_or(defaults.estimate_field),
            status_field: get("GITHUB_FIELD_STATUS").unwrap_or(defaults.status_field),
            default_sprint: get("GITHUB_DEFAULT_SPRINT").unwrap_or(defaults.default_sprint),
            pipeline,
            label_include: get("GITHUB_LABEL_INCLUDE")
                .map(|raw| parse_include_list(&raw))
                .unwrap_or(defaults.label_include),
            issue_type_include: get("GITHUB_ISSUE_TYPE_INCLUDE")
                .map(|raw| parse_include_list(&raw))
                .unwrap_or(defaults.issue_type_include),
        }
    }

    /// Completion weight for a workflow status, matched case-insensitively
    /// against the configured pipeline. Unknown statuses weigh 0.0.
    pub fn pipeline_weight(&self, status: &str) -> f64 {
        let target = status.trim().to_lowercase();
        if target.is_empty() {
            return 0.0;
        }
        self.pipeline
            .iter()
            .find(|(name, _)| name.to_lowercase() == target)
            .map(|(_, weight)| *weight)
            .unwrap_or(0.0)
    }
}

fn default_pipeline() -> Vec<(String, f64)> {
    DEFAULT_PIPELINE
        .iter()
        .map(|(name, weight)| ((*name).to_owned(), *weight))
        .collect()
}

/// Parse a pipeline table from JSON like `[["Backlog",0.0],["Done",1.0]]`.
fn parse_pipeline(raw: &str) -> Option<Vec<(String, f64)>> {
    serde_json::from_str(raw).ok()
}

fn parse_include_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}
