//! In-memory backend. Rows live for the lifetime of the process.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::{Fields, Filter, InsertOutcome, Row, Table};
use crate::traits::BackingStore;

/// Row storage shared by the in-memory and file backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    #[serde(default)]
    rows: BTreeMap<Table, Vec<Row>>,
}

impl Tables {
    pub(crate) fn insert(&mut self, table: Table, mut record: Fields) -> Row {
        let id = match record.remove("id") {
            Some(Value::String(id)) if !id.is_empty() => id,
            _ => uuid::Uuid::new_v4().to_string(),
        };
        let created_at = match record.get("created_at") {
            Some(Value::String(ts)) => ts.clone(),
            _ => now_rfc3339(),
        };
        let row = Row {
            id,
            created_at,
            fields: record,
        };
        self.rows.entry(table).or_default().push(row.clone());
        row
    }

    pub(crate) fn first(&self, table: Table) -> Option<&Row> {
        self.rows.get(&table).and_then(|rows| rows.first())
    }

    pub(crate) fn select(&self, table: Table, filter: &Filter, limit: usize) -> Vec<Row> {
        let rows = match self.rows.get(&table) {
            Some(rows) => rows,
            None => return Vec::new(),
        };
        let matching = rows.iter().filter(|row| filter.matches(row)).cloned();
        if limit == 0 {
            matching.collect()
        } else {
            matching.take(limit).collect()
        }
    }
}

pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

/// A [`BackingStore`] that keeps every table in process memory.
///
/// `insert_if_empty` holds the write lock across the check and the insert,
/// so concurrent first-boot seeds cannot both insert.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn insert(&self, table: Table, record: Fields) -> Result<Option<Row>, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(Some(tables.insert(table, record)))
    }

    async fn insert_if_empty(
        &self,
        table: Table,
        record: Fields,
    ) -> Result<InsertOutcome, StorageError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.first(table) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        Ok(InsertOutcome::Inserted(tables.insert(table, record)))
    }

    async fn select(
        &self,
        table: Table,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Row>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.select(table, filter, limit))
    }
}
