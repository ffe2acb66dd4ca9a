//! Stage index → stage document lookup.

use std::sync::Arc;

use cutover_storage::{BackingStore, Filter, StorageError, Table};
use serde_json::Value;

use crate::fixtures::{FixtureName, FixtureSet};
use crate::stage::stage_file_type;

/// The fixture document behind each stage, or `None` outside 0..=5.
pub fn stage_fixture(stage: i64) -> Option<FixtureName> {
    match stage {
        0 => Some(FixtureName::Repositories),
        1 => Some(FixtureName::Inventory),
        2 => Some(FixtureName::TargetArchitecture),
        3 => Some(FixtureName::AssetManifest),
        4 => Some(FixtureName::RuntimeConfigs),
        5 => Some(FixtureName::Cutover),
        _ => None,
    }
}

/// Pure lookup over an injected fixture set. No I/O, no error path.
#[derive(Debug, Clone)]
pub struct StageDataAccessor {
    fixtures: Arc<FixtureSet>,
}

impl StageDataAccessor {
    pub fn new(fixtures: Arc<FixtureSet>) -> Self {
        Self { fixtures }
    }

    pub fn fixtures(&self) -> &FixtureSet {
        &self.fixtures
    }

    /// The document for `stage`, or `None` for an unrecognized index.
    pub fn stage_document(&self, stage: i64) -> Option<&Value> {
        stage_fixture(stage).map(|name| self.fixtures.document(name))
    }
}

/// The same lookup against the `project_files` rows written by seeding.
pub struct StoreStageAccessor<'a> {
    store: &'a dyn BackingStore,
    project_id: &'a str,
}

impl<'a> StoreStageAccessor<'a> {
    pub fn new(store: &'a dyn BackingStore, project_id: &'a str) -> Self {
        Self { store, project_id }
    }

    /// The stored document for `stage`. Unknown indices and missing rows are
    /// `Ok(None)`; only store failures are errors.
    pub async fn stage_document(&self, stage: i64) -> Result<Option<Value>, StorageError> {
        match stage_file_type(stage) {
            Some(file_type) => self.file(file_type).await,
            None => Ok(None),
        }
    }

    pub async fn environments(&self) -> Result<Option<Value>, StorageError> {
        self.file("environments").await
    }

    async fn file(&self, file_type: &str) -> Result<Option<Value>, StorageError> {
        let filter = Filter::eq("project_id", self.project_id).and_eq("file_type", file_type);
        let rows = self.store.select(Table::ProjectFiles, &filter, 1).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.fields.get("content").cloned()))
    }
}
