//! First-boot seeding of the backing store.
//!
//! Steps run strictly in order, each awaited before the next:
//!
//! 1. insert the project row, unless the `projects` table already has one
//! 2. insert one `project_files` row per stage document
//! 3. insert the pipeline-execution history
//!
//! Step 1 uses `insert_if_empty`, so repeat calls (and, for the bundled
//! backends, concurrent calls) write at most one project. There is no
//! rollback: if step 2 or 3 fails the project row stays behind.

use cutover_storage::{to_fields, BackingStore, Fields, InsertOutcome, Table};
use serde_json::Value;

use crate::error::SeedError;
use crate::fixtures::{FixtureName, FixtureSet};

/// `project_files.file_type` tag and source fixture for each seeded document.
pub const SEEDED_FILES: [(&str, FixtureName); 7] = [
    ("repositories", FixtureName::Repositories),
    ("environments", FixtureName::Environments),
    ("stage1", FixtureName::Inventory),
    ("stage2", FixtureName::TargetArchitecture),
    ("stage3", FixtureName::AssetManifest),
    ("stage4", FixtureName::RuntimeConfigs),
    ("stage5", FixtureName::Cutover),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOutcome {
    pub project_id: String,
    /// False when an existing project was found and nothing was written.
    pub seeded: bool,
}

/// Seed `store` from `fixtures` if it holds no project yet.
pub async fn seed_project(
    store: &dyn BackingStore,
    fixtures: &FixtureSet,
) -> Result<SeedOutcome, SeedError> {
    let project = to_fields(Table::Projects, fixtures.project())?;

    let project_id = match store.insert_if_empty(Table::Projects, project).await? {
        InsertOutcome::Existing(row) => {
            tracing::info!(project_id = %row.id, "project already seeded");
            return Ok(SeedOutcome {
                project_id: row.id,
                seeded: false,
            });
        }
        InsertOutcome::Inserted(row) => row.id,
        InsertOutcome::NotReturned => return Err(SeedError::ProjectNotCreated),
    };

    if let Err(e) = seed_children(store, fixtures, &project_id).await {
        tracing::error!(
            project_id = %project_id,
            error = %e,
            "seeding stopped after the project row was written; store is partially seeded"
        );
        return Err(e);
    }

    tracing::info!(project_id = %project_id, "seeded project");
    Ok(SeedOutcome {
        project_id,
        seeded: true,
    })
}

async fn seed_children(
    store: &dyn BackingStore,
    fixtures: &FixtureSet,
    project_id: &str,
) -> Result<(), SeedError> {
    let files: Vec<Fields> = SEEDED_FILES
        .iter()
        .map(|(file_type, name)| file_record(project_id, file_type, fixtures.document(*name)))
        .collect();
    let written = store.insert_many(Table::ProjectFiles, files).await?;
    tracing::debug!(count = written.len(), "inserted project files");

    let executions = fixtures
        .history()
        .iter()
        .map(|entry| to_fields(Table::PipelineExecutions, &entry.to_execution(project_id)))
        .collect::<Result<Vec<_>, _>>()?;
    let written = store
        .insert_many(Table::PipelineExecutions, executions)
        .await?;
    tracing::debug!(count = written.len(), "inserted pipeline executions");
    Ok(())
}

fn file_record(project_id: &str, file_type: &str, content: &Value) -> Fields {
    let mut fields = Fields::new();
    fields.insert("project_id".to_string(), Value::String(project_id.to_string()));
    fields.insert("file_type".to_string(), Value::String(file_type.to_string()));
    fields.insert("content".to_string(), content.clone());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::{StageDataAccessor, StoreStageAccessor};
    use crate::project::Project;
    use async_trait::async_trait;
    use cutover_storage::{Filter, MemoryStore, Row, StorageError};
    use std::sync::Arc;

    fn fixtures() -> FixtureSet {
        FixtureSet::embedded().unwrap()
    }

    #[tokio::test]
    async fn seeding_twice_leaves_one_project() {
        let store = MemoryStore::new();
        let fixtures = fixtures();

        let first = seed_project(&store, &fixtures).await.unwrap();
        assert!(first.seeded);
        for _ in 0..3 {
            let again = seed_project(&store, &fixtures).await.unwrap();
            assert!(!again.seeded);
            assert_eq!(again.project_id, first.project_id);
        }

        assert_eq!(store.count(Table::Projects, &Filter::all()).await.unwrap(), 1);
        assert_eq!(
            store.count(Table::ProjectFiles, &Filter::all()).await.unwrap(),
            SEEDED_FILES.len()
        );
        assert_eq!(
            store
                .count(Table::PipelineExecutions, &Filter::all())
                .await
                .unwrap(),
            fixtures.history().len()
        );
    }

    #[tokio::test]
    async fn seeded_project_reads_back_typed() {
        let store = MemoryStore::new();
        let fixtures = fixtures();
        let outcome = seed_project(&store, &fixtures).await.unwrap();

        let row = store.get(Table::Projects, &outcome.project_id).await.unwrap();
        let project: Project = row.decode().unwrap();
        assert_eq!(project.id, outcome.project_id);
        assert_eq!(&project.metadata, fixtures.project());
    }

    #[tokio::test]
    async fn stored_documents_match_the_fixture_accessor() {
        let store = MemoryStore::new();
        let fixtures = Arc::new(fixtures());
        let outcome = seed_project(&store, &fixtures).await.unwrap();

        let from_fixtures = StageDataAccessor::new(fixtures.clone());
        let from_store = StoreStageAccessor::new(&store, &outcome.project_id);
        for stage in 0..=5 {
            let stored = from_store.stage_document(stage).await.unwrap();
            assert_eq!(stored.as_ref(), from_fixtures.stage_document(stage), "stage {stage}");
        }
        assert!(from_store.stage_document(6).await.unwrap().is_none());
        assert_eq!(
            from_store.environments().await.unwrap().as_ref(),
            Some(fixtures.document(FixtureName::Environments))
        );
    }

    #[tokio::test]
    async fn executions_are_attached_to_the_project() {
        let store = MemoryStore::new();
        let outcome = seed_project(&store, &fixtures()).await.unwrap();
        let rows = store
            .select(
                Table::PipelineExecutions,
                &Filter::eq("project_id", outcome.project_id.as_str()),
                0,
            )
            .await
            .unwrap();
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.fields.contains_key("stage_number")));
        assert!(rows.iter().all(|r| !r.fields.contains_key("startedAt")));
    }

    /// Accepts inserts but never returns the stored row.
    struct SilentStore;

    #[async_trait]
    impl BackingStore for SilentStore {
        async fn insert(
            &self,
            _table: Table,
            _record: Fields,
        ) -> Result<Option<Row>, StorageError> {
            Ok(None)
        }

        async fn select(
            &self,
            _table: Table,
            _filter: &Filter,
            _limit: usize,
        ) -> Result<Vec<Row>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn missing_project_row_is_fatal() {
        let err = seed_project(&SilentStore, &fixtures()).await.unwrap_err();
        assert!(matches!(err, SeedError::ProjectNotCreated));
    }

    /// Stores projects, fails every other write.
    struct FailingChildren(MemoryStore);

    #[async_trait]
    impl BackingStore for FailingChildren {
        async fn insert(&self, table: Table, record: Fields) -> Result<Option<Row>, StorageError> {
            if table == Table::Projects {
                self.0.insert(table, record).await
            } else {
                Err(StorageError::Backend("write refused".to_string()))
            }
        }

        async fn select(
            &self,
            table: Table,
            filter: &Filter,
            limit: usize,
        ) -> Result<Vec<Row>, StorageError> {
            self.0.select(table, filter, limit).await
        }
    }

    #[tokio::test]
    async fn failure_after_project_insert_leaves_partial_seed() {
        let store = FailingChildren(MemoryStore::new());
        let err = seed_project(&store, &fixtures()).await.unwrap_err();
        assert!(matches!(err, SeedError::Storage(StorageError::Backend(_))));
        assert_eq!(store.count(Table::Projects, &Filter::all()).await.unwrap(), 1);
        assert_eq!(store.count(Table::ProjectFiles, &Filter::all()).await.unwrap(), 0);

        // The next boot sees the project and does not retry the children.
        let again = seed_project(&store, &fixtures()).await.unwrap();
        assert!(!again.seeded);
    }
}
