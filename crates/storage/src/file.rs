//! JSON-file backend. The whole store is one pretty-printed JSON document,
//! rewritten after every mutation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::memory::Tables;
use crate::record::{Fields, Filter, InsertOutcome, Row, Table};
use crate::traits::BackingStore;

/// A [`BackingStore`] persisted to a single JSON file.
///
/// Suitable for the single-instance deployment the dashboard targets: the
/// file is read once on [`JsonFileStore::open`] and written back through a
/// temporary sibling file plus rename on every insert. Inserts are applied to
/// a copy of the tables, which replaces the live tables only once the file
/// write succeeds. Two processes sharing one file are not coordinated.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    tables: RwLock<Tables>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let tables = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(|b| b.is_ascii_whitespace()) => Tables::default(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::Backend(format!("corrupt store file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Tables::default(),
            Err(e) => return Err(io_error(&path, e)),
        };
        tracing::debug!(path = %path.display(), "opened JSON file store");
        Ok(Self {
            path,
            tables: RwLock::new(tables),
        })
    }

    async fn persist(&self, tables: &Tables) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_error(parent, e))?;
            }
        }
        let bytes = serde_json::to_vec_pretty(tables)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl BackingStore for JsonFileStore {
    async fn insert(&self, table: Table, record: Fields) -> Result<Option<Row>, StorageError> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let row = staged.insert(table, record);
        self.persist(&staged).await?;
        *tables = staged;
        Ok(Some(row))
    }

    async fn insert_many(
        &self,
        table: Table,
        records: Vec<Fields>,
    ) -> Result<Vec<Row>, StorageError> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let rows: Vec<Row> = records
            .into_iter()
            .map(|record| staged.insert(table, record))
            .collect();
        self.persist(&staged).await?;
        *tables = staged;
        Ok(rows)
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
        let mut staged = tables.clone();
        let row = staged.insert(table, record);
        self.persist(&staged).await?;
        *tables = staged;
        Ok(InsertOutcome::Inserted(row))
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
