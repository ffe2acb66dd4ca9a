//! Pipeline execution history: the fixture shape and the stored record.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

/// `pipeline-history.json` top level.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PipelineHistory {
    #[serde(default)]
    pub(crate) executions: Vec<PipelineHistoryEntry>,
}

/// One stage run as written by the upstream pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineHistoryEntry {
    pub stage: i64,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<u64>,
    #[serde(default)]
    pub logs: Vec<LogLine>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl PipelineHistoryEntry {
    /// The `pipeline_executions` row for this run. Fields are renamed, not
    /// recomputed.
    pub fn to_execution(&self, project_id: &str) -> PipelineExecution {
        PipelineExecution {
            id: None,
            project_id: project_id.to_string(),
            stage_number: self.stage,
            status: self.status,
            started_at: self.started_at.clone(),
            completed_at: self.completed_at.clone(),
            duration_seconds: self.duration_seconds,
            logs: self.logs.clone(),
            error_message: self.error_message.clone(),
        }
    }
}

/// A row of the `pipeline_executions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineExecution {
    /// Store-assigned; absent until the row is inserted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub project_id: String,
    pub stage_number: i64,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(default)]
    pub logs: Vec<LogLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
