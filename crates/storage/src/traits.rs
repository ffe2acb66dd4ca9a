use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{Fields, Filter, InsertOutcome, Row, Table};

/// The persistence boundary for the dashboard.
///
/// A `BackingStore` holds the seeded project state in three logical tables
/// (`projects`, `project_files`, `pipeline_executions`). Rows are schemaless
/// JSON objects; the store assigns each row an `id` and a `created_at`
/// timestamp on insert.
///
/// ## Inserts
///
/// `insert` returns `Ok(None)` when the backend accepted the write but did
/// not hand back the stored row. Callers that need the new id must treat that
/// as a failure.
///
/// ## Conditional insert
///
/// `insert_if_empty` is the check-then-insert used by seeding. The default
/// implementation is a plain `select` followed by `insert` and is therefore
/// racy across concurrent callers. Backends that can perform both steps
/// under one lock or transaction must override it.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait BackingStore: Send + Sync + 'static {
    /// Insert one record and return the stored row.
    async fn insert(&self, table: Table, record: Fields) -> Result<Option<Row>, StorageError>;

    /// Insert several records in order, returning the rows that came back.
    async fn insert_many(
        &self,
        table: Table,
        records: Vec<Fields>,
    ) -> Result<Vec<Row>, StorageError> {
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            if let Some(row) = self.insert(table, record).await? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Insert `record` only when `table` holds no rows at all.
    async fn insert_if_empty(
        &self,
        table: Table,
        record: Fields,
    ) -> Result<InsertOutcome, StorageError> {
        if let Some(existing) = self.select(table, &Filter::all(), 1).await?.into_iter().next() {
            return Ok(InsertOutcome::Existing(existing));
        }
        Ok(match self.insert(table, record).await? {
            Some(row) => InsertOutcome::Inserted(row),
            None => InsertOutcome::NotReturned,
        })
    }

    /// Select rows matching `filter` in insertion order.
    ///
    /// - `limit`: maximum number of results (0 = no limit)
    async fn select(
        &self,
        table: Table,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Row>, StorageError>;

    /// Read a single row by id.
    ///
    /// Returns `Err(StorageError::RowNotFound)` if no row has that id.
    async fn get(&self, table: Table, id: &str) -> Result<Row, StorageError> {
        self.select(table, &Filter::eq("id", id), 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::RowNotFound {
                table,
                id: id.to_string(),
            })
    }

    /// Count rows matching `filter`.
    async fn count(&self, table: Table, filter: &Filter) -> Result<usize, StorageError> {
        Ok(self.select(table, filter, 0).await?.len())
    }
}
