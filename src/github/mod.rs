use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use serde_json::{Map, Value, json};

use crate::settings::Settings;

const USER_AGENT: &str = concat!("burndown/", env!("CARGO_PKG_VERSION"));
const PAGE_SIZE: u32 = 100;

/// Client for the GitHub GraphQL API.
pub struct GithubClient {
    http: reqwest::Client,
    token: String,
    endpoint: String,
}

impl GithubClient {
    /// Build a client from settings. Fails when no API token is configured.
    pub fn new(settings: &Settings) -> Result<Self> {
        if settings.token.is_empty() {
            anyhow::bail!("GITHUB_API_TOKEN is not set");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            token: settings.token.clone(),
            endpoint: settings.graphql_url.clone(),
        })
    }

    async fn execute(&self, query: &str) -> Result<Value> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header("User-Agent", USER_AGENT)
            .json(&json!({ "query": query }))
            .send()
            .await
            .context("GraphQL request failed")?
            .error_for_status()
            .context("GraphQL request rejected")?;

        let body: Value = response
            .json()
            .await
            .context("GraphQL response is not valid JSON")?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                anyhow::bail!("GraphQL errors: {}", Value::Array(errors.clone()));
            }
        }

        body.get("data")
            .cloned()
            .context("GraphQL response has no data")
    }

    /// Fetch every project item across pages and wrap them back into the
    /// owner-rooted payload shape the ingest step understands.
    pub async fn fetch_project_items(&self, settings: &Settings) -> Result<Value> {
        let mut nodes: Vec<Value> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0u32;

        loop {
            pages += 1;
            info!("fetching project items, page {pages}");
            let data = self.execute(&items_query(settings, cursor.as_deref())).await?;
            let page = extract_page(&data, settings);
            nodes.extend(page.nodes.into_iter().cloned());

            cursor = page.end_cursor;
            if !page.has_next_page || cursor.is_none() {
                break;
            }
        }

        info!("fetched {} project items across {pages} pages", nodes.len());
        Ok(wrap_nodes(nodes, settings))
    }
}

struct Page<'a> {
    nodes: Vec<&'a Value>,
    has_next_page: bool,
    end_cursor: Option<String>,
}

fn extract_page<'a>(data: &'a Value, settings: &Settings) -> Page<'a> {
    let items = data
        .pointer(&format!("/{}/projectV2/items", settings.owner_type.as_str()))
        .unwrap_or(&Value::Null);

    Page {
        nodes: items
            .pointer("/nodes")
            .and_then(Value::as_array)
            .map(|nodes| nodes.iter().collect())
            .unwrap_or_default(),
        has_next_page: items
            .pointer("/pageInfo/hasNextPage")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        end_cursor: items
            .pointer("/pageInfo/endCursor")
            .and_then(Value::as_str)
            .map(str::to_owned),
    }
}

/// Re-root a flat node list under the configured owner type so snapshots and
/// live payloads share one shape.
fn wrap_nodes(nodes: Vec<Value>, settings: &Settings) -> Value {
    let mut root = Map::new();
    root.insert(
        settings.owner_type.as_str().to_owned(),
        json!({ "projectV2": { "items": { "nodes": nodes } } }),
    );
    Value::Object(root)
}

/// The paginated project items query. Timeline items are restricted to the
/// close/reopen events the burndown history needs.
fn items_query(settings: &Settings, cursor: Option<&str>) -> String {
    let after = match cursor {
        Some(cursor) => format!("after: \"{cursor}\""),
        None => "after: null".to_owned(),
    };

    format!(
        r#"{{
  {owner_type}(login: "{owner}") {{
    projectV2(number: {number}) {{
      items(first: {page_size}, {after}) {{
        nodes {{
          type
          content {{
            ... on Issue {{
              id
              title
              state
              createdAt
              closed
              closedAt
              issueType {{ name }}
              parent {{ id title }}
              labels(first: 20) {{ nodes {{ name }} }}
              assignees(first: 10) {{ nodes {{ login }} }}
              timelineItems(first: 100, itemTypes: [CLOSED_EVENT, REOPENED_EVENT]) {{
                nodes {{
                  __typename
                  ... on ClosedEvent {{ createdAt }}
                  ... on ReopenedEvent {{ createdAt }}
                }}
              }}
              subIssuesSummary {{ completed percentCompleted total }}
            }}
          }}
          fieldValues(first: 100) {{
            nodes {{
              ... on ProjectV2ItemFieldIterationValue {{
                title
                startDate
                duration
                field {{ ... on ProjectV2IterationField {{ name }} }}
              }}
              ... on ProjectV2ItemFieldSingleSelectValue {{
                name
                field {{ ... on ProjectV2SingleSelectField {{ name }} }}
              }}
              ... on ProjectV2ItemFieldNumberValue {{
                number
                field {{ ... on ProjectV2Field {{ name }} }}
              }}
              ... on ProjectV2ItemFieldMilestoneValue {{
                milestone {{ title }}
              }}
            }}
          }}
        }}
        pageInfo {{ hasNextPage endCursor }}
      }}
    }}
  }}
}}"#,
        owner_type = settings.owner_type.as_str(),
        owner = settings.owner,
        number = settings.project_number,
        page_size = PAGE_SIZE,
    )
}

/// Save a raw payload snapshot as pretty JSON.
pub fn save_snapshot(path: &Path, payload: &Value) -> Result<()> {
    let data = serde_json::to_string_pretty(payload).context("failed to serialize snapshot")?;
    std::fs::write(path, data)
        .with_context(|| format!("failed to write snapshot {}", path.display()))
}

/// Load a previously saved payload snapshot.
pub fn load_snapshot(path: &Path) -> Result<Value> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("snapshot {} is not valid JSON", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::settings::OwnerType;

    fn org_settings() -> Settings {
        Settings {
            owner: "acme".to_owned(),
            owner_type: OwnerType::Organization,
            project_number: 7,
            ..Settings::default()
        }
    }

    #[test]
    fn test_items_query_parameters() {
        let query = items_query(&org_settings(), None);
        assert!(query.contains(r#"organization(login: "acme")"#));
        assert!(query.contains("projectV2(number: 7)"));
        assert!(query.contains("after: null"));

        let paged = items_query(&org_settings(), Some("abc"));
        assert!(paged.contains(r#"after: "abc""#));
    }

    #[test]
    fn test_extract_page() {
        let data = serde_json::json!({
            "organization": { "projectV2": { "items": {
                "nodes": [{ "content": { "id": "I_1" } }],
                "pageInfo": { "hasNextPage": true, "endCursor": "xyz" }
            }}}
        });

        let page = extract_page(&data, &org_settings());
        assert_eq!(page.nodes.len(), 1);
        assert!(page.has_next_page);
        assert_eq!(page.end_cursor.as_deref(), Some("xyz"));
    }

    #[test]
    fn test_extract_page_tolerates_missing_shape() {
        let data = serde_json::json!({});
        let page = extract_page(&data, &org_settings());
        assert!(page.nodes.is_empty());
        assert!(!page.has_next_page);
        assert!(page.end_cursor.is_none());
    }

    #[test]
    fn test_wrap_nodes_matches_ingest_shape() {
        let payload = wrap_nodes(vec![serde_json::json!({ "content": { "id": "I_1" } })], &org_settings());
        let nodes = payload
            .pointer("/organization/projectV2/items/nodes")
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project_data.json");
        let payload = serde_json::json!({ "user": { "projectV2": { "items": { "nodes": [] } } } });

        save_snapshot(&path, &payload).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), payload);
    }

    #[test]
    fn test_load_snapshot_errors() {
        let dir = TempDir::new().unwrap();
        assert!(load_snapshot(&dir.path().join("missing.json")).is_err());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "not json").unwrap();
        assert!(load_snapshot(&bad).is_err());
    }

    #[test]
    fn test_client_requires_token() {
        assert!(GithubClient::new(&Settings::default()).is_err());

        let mut settings = Settings::default();
        settings.token = "ghp_test".to_owned();
        assert!(GithubClient::new(&settings).is_ok());
    }
}
