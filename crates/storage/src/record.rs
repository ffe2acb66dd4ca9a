use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StorageError;

/// JSON object holding a row's column values.
pub type Fields = serde_json::Map<String, Value>;

/// The logical tables the dashboard writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Projects,
    ProjectFiles,
    PipelineExecutions,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Projects => "projects",
            Table::ProjectFiles => "project_files",
            Table::PipelineExecutions => "pipeline_executions",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored row: store-assigned identity plus the inserted column values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
    pub fields: Fields,
}

impl Row {
    /// Look up a column. `id` and `created_at` resolve to the row identity.
    pub fn get(&self, column: &str) -> Option<Value> {
        match column {
            "id" => Some(Value::String(self.id.clone())),
            "created_at" => self
                .fields
                .get("created_at")
                .cloned()
                .or_else(|| Some(Value::String(self.created_at.clone()))),
            _ => self.fields.get(column).cloned(),
        }
    }

    /// Decode the row into a typed record.
    ///
    /// The row's `id` and `created_at` are merged into the field object
    /// before deserializing, unless the fields already carry them.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StorageError> {
        let mut object = self.fields.clone();
        object.insert("id".to_string(), Value::String(self.id.clone()));
        object
            .entry("created_at")
            .or_insert_with(|| Value::String(self.created_at.clone()));
        Ok(serde_json::from_value(Value::Object(object))?)
    }
}

/// Convert a serializable record into the field object accepted by `insert`.
pub fn to_fields<T: Serialize>(table: Table, record: &T) -> Result<Fields, StorageError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StorageError::InvalidRecord {
            table,
            message: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Equality filter over row columns. An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// A filter that matches all rows.
    pub fn all() -> Self {
        Self::default()
    }

    /// Rows whose `column` equals `value`.
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::all().and_eq(column, value)
    }

    /// Add another equality condition (conjunction).
    pub fn and_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((column.to_string(), value.into()));
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(column, expected)| row.get(column).as_ref() == Some(expected))
    }
}

/// Result of [`BackingStore::insert_if_empty`](crate::BackingStore::insert_if_empty).
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The table was empty and the record was inserted.
    Inserted(Row),
    /// The table already held rows; this is the first of them. Nothing was written.
    Existing(Row),
    /// The backend accepted the insert but returned no row.
    NotReturned,
}

impl InsertOutcome {
    pub fn was_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}
