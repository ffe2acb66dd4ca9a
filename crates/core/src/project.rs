use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

/// Per-stage completion percentages keyed `stage{N}`.
pub type ProgressMap = BTreeMap<String, u8>;

/// Lifecycle status of a migration project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    InProgress,
    Completed,
    Error,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Error => "error",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Project fields as they appear in the metadata fixture and in the
/// `projects` table, minus the store-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    /// Index of the stage currently being worked on. Assumed never to decrease.
    pub current_stage: i64,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressMap>,
}

impl ProjectMetadata {
    /// Rounded mean of every entry in the progress map; 0 when there is none.
    pub fn overall_progress(&self) -> u8 {
        let values: Vec<u32> = match &self.progress {
            Some(map) if !map.is_empty() => map.values().map(|&v| u32::from(v)).collect(),
            _ => return 0,
        };
        let sum: u32 = values.iter().sum();
        let mean = f64::from(sum) / values.len() as f64;
        mean.round() as u8
    }
}

/// A project row read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(flatten)]
    pub metadata: ProjectMetadata,
}

/// Format an RFC 3339 timestamp as a short date, e.g. `Jan 6, 2025`.
///
/// Returns `None` when the input does not parse.
pub fn format_date(timestamp: &str) -> Option<String> {
    let parsed = OffsetDateTime::parse(timestamp, &Rfc3339).ok()?;
    parsed
        .format(format_description!("[month repr:short] [day padding:none], [year]"))
        .ok()
}

/// Format an RFC 3339 timestamp with time of day, e.g. `Jan 6, 2025, 09:00 AM`.
pub fn format_date_time(timestamp: &str) -> Option<String> {
    let parsed = OffsetDateTime::parse(timestamp, &Rfc3339).ok()?;
    parsed
        .format(format_description!(
            "[month repr:short] [day padding:none], [year], [hour repr:12]:[minute] [period]"
        ))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(progress: Option<ProgressMap>) -> ProjectMetadata {
        ProjectMetadata {
            name: "Hotel".to_string(),
            description: "d".to_string(),
            status: ProjectStatus::InProgress,
            current_stage: 3,
            created_at: "2025-01-06T09:00:00Z".to_string(),
            updated_at: "2025-02-14T16:30:00Z".to_string(),
            progress,
        }
    }

    #[test]
    fn overall_progress_is_rounded_mean() {
        let progress: ProgressMap = [
            ("stage0", 100),
            ("stage1", 100),
            ("stage2", 100),
            ("stage3", 75),
            ("stage4", 30),
            ("stage5", 0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        // 405 / 6 = 67.5
        assert_eq!(metadata(Some(progress)).overall_progress(), 68);
    }

    #[test]
    fn overall_progress_without_map_is_zero() {
        assert_eq!(metadata(None).overall_progress(), 0);
        assert_eq!(metadata(Some(ProgressMap::new())).overall_progress(), 0);
    }

    #[test]
    fn project_flattens_metadata() {
        let project = Project {
            id: "p1".to_string(),
            metadata: metadata(None),
        };
        let value = serde_json::to_value(&project).unwrap();
        assert_eq!(value["id"], "p1");
        assert_eq!(value["status"], "in_progress");
        assert_eq!(value["current_stage"], 3);
        assert!(value.get("progress").is_none());
        let back: Project = serde_json::from_value(value).unwrap();
        assert_eq!(back, project);
    }

    #[test]
    fn dates_format_like_the_dashboard() {
        assert_eq!(
            format_date("2025-01-06T09:00:00Z").as_deref(),
            Some("Jan 6, 2025")
        );
        assert_eq!(
            format_date_time("2025-02-14T16:30:00Z").as_deref(),
            Some("Feb 14, 2025, 04:30 PM")
        );
        assert_eq!(format_date("yesterday"), None);
    }
}
