//! The fixed six-stage migration pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Highest stage index in the pipeline.
pub const LAST_STAGE: u8 = 5;

/// Static description of one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageDefinition {
    pub id: u8,
    pub title: &'static str,
    pub description: &'static str,
    /// Icon name for the front end (lucide icon set).
    pub icon: &'static str,
    /// Route fragment appended to `/projects/{id}/`.
    pub path: &'static str,
}

/// The six stages, indexed by stage id.
pub const STAGES: [StageDefinition; 6] = [
    StageDefinition {
        id: 0,
        title: "Repository Analysis",
        description: "Analyze Git repositories and discover Mule flows",
        icon: "git-branch",
        path: "repositories",
    },
    StageDefinition {
        id: 1,
        title: "Inventory",
        description: "Comprehensive inventory of all Mule assets",
        icon: "file-text",
        path: "stage1",
    },
    StageDefinition {
        id: 2,
        title: "Target Architecture",
        description: "webMethods services and consolidation strategy",
        icon: "network",
        path: "stage2",
    },
    StageDefinition {
        id: 3,
        title: "Asset Manifest",
        description: "webMethods implementation artifacts",
        icon: "package",
        path: "stage3",
    },
    StageDefinition {
        id: 4,
        title: "Runtime Configuration",
        description: "Environment settings and deployment configs",
        icon: "settings",
        path: "stage4",
    },
    StageDefinition {
        id: 5,
        title: "Cut-Over & Validation",
        description: "Testing, deployment, and go-live procedures",
        icon: "rocket",
        path: "stage5",
    },
];

/// Look up a stage definition. Any index outside 0..=5 is `None`.
pub fn stage_definition(stage: i64) -> Option<&'static StageDefinition> {
    usize::try_from(stage).ok().and_then(|i| STAGES.get(i))
}

/// Where a stage sits relative to the project's current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    InProgress,
    Pending,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Completed => "completed",
            StageStatus::InProgress => "in_progress",
            StageStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `project_files.file_type` tag under which a stage's document is stored.
pub fn stage_file_type(stage: i64) -> Option<&'static str> {
    match stage {
        0 => Some("repositories"),
        1 => Some("stage1"),
        2 => Some("stage2"),
        3 => Some("stage3"),
        4 => Some("stage4"),
        5 => Some("stage5"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_table_is_indexed_by_id() {
        for (i, stage) in STAGES.iter().enumerate() {
            assert_eq!(stage.id as usize, i);
        }
        assert_eq!(STAGES.len(), LAST_STAGE as usize + 1);
    }

    #[test]
    fn definitions_outside_range_are_absent() {
        assert!(stage_definition(-1).is_none());
        assert!(stage_definition(6).is_none());
        assert_eq!(stage_definition(3).map(|s| s.path), Some("stage3"));
    }

    #[test]
    fn file_types_follow_route_fragments_except_stage0() {
        assert_eq!(stage_file_type(0), Some("repositories"));
        for stage in 1..=5 {
            assert_eq!(stage_file_type(stage), Some(STAGES[stage as usize].path));
        }
        assert_eq!(stage_file_type(6), None);
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(StageStatus::InProgress).unwrap(),
            serde_json::json!("in_progress")
        );
    }
}
