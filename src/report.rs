use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::BurndownPoint;

/// Burndown series document handed to the rendering side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub sprint: String,
    pub algorithm: String,
    pub start_date: String,
    pub end_date: String,
    pub available_sprints: Vec<String>,
    pub points: Vec<BurndownPoint>,
}

pub fn render_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize report")
}

pub fn write_report(path: &Path, report: &Report) -> Result<()> {
    let data = render_report(report)?;
    std::fs::write(path, data)
        .with_context(|| format!("failed to write report {}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::models::PointDetails;

    fn sample_report() -> Report {
        Report {
            sprint: "Sprint 1".to_owned(),
            algorithm: "task-based".to_owned(),
            start_date: "2024-01-01".to_owned(),
            end_date: "2024-01-02".to_owned(),
            available_sprints: vec!["Sprint 1".to_owned(), "Sprint 2".to_owned()],
            points: vec![BurndownPoint {
                date: "2024-01-01".to_owned(),
                remaining_points: 5.0,
                total_points: 10.0,
                details: PointDetails::OpenTasks { open_tasks: vec![] },
            }],
        }
    }

    #[test]
    fn test_render_report_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&render_report(&sample_report()).unwrap()).unwrap();
        assert_eq!(json["sprint"], "Sprint 1");
        assert_eq!(json["startDate"], "2024-01-01");
        assert_eq!(json["availableSprints"][1], "Sprint 2");
        assert_eq!(json["points"][0]["remainingPoints"], 5.0);
    }

    #[test]
    fn test_write_report_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("burndown.json");

        write_report(&path, &sample_report()).unwrap();
        let data = std::fs::read_to_string(&path).unwrap();
        assert!(data.contains("totalPoints"));
    }
}
